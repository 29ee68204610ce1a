#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

pub const TRAIN_CPP: &str = r#"#include "Train.h"

RH_ScopedClass(CTrain);

void CTrain::InjectHooks() {
    RH_ScopedInstall(ProcessControl, 0x6F86A0);
    RH_ScopedInstall(Stop, 0x6F5900);
}

void CTrain::ProcessControl() {
    if (m_nStatus == 5) {
        DoStuff();
    }
    MoreLogic();
    EvenMore();
}

void CTrain::Stop() {
    NOTSA_UNREACHABLE();
}
"#;

pub const HOOKS_CSV: &str = "class,fn_name,address,reversed,locked,is_virtual
Entity/Vehicle/CTrain,ProcessControl,0x6F86A0,1,0,1
Entity/Vehicle/CTrain,Stop,0x6F5900,1,0,0
Entity/Vehicle/CTrain,Unfinished,0x6F0000,0,0,0
";

pub const CONFIG_YAML: &str = "project_profile:
  source_root: source
  hooks_csv: hooks.csv
backend:
  type: stub
";

/// Temp project with a config, one source file and a hook registry.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("source").join("Entity");
        fs::create_dir_all(&source).expect("create source dir");
        fs::write(source.join("Train.cpp"), TRAIN_CPP).expect("write source");
        fs::write(dir.path().join("hooks.csv"), HOOKS_CSV).expect("write hooks");
        fs::write(dir.path().join("re-parity.yaml"), CONFIG_YAML).expect("write config");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("re-parity.yaml")
    }

    /// `re-parity --config <project config>` ready for further args.
    pub fn cmd(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("re-parity");
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}
