use std::env;
use std::fs;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use crate::services::decompiler::{
    AsmListing, BackendCapabilities, BackendError, DecompileResult, DecompilerBackend,
};

/// Stderr fragments meaning the sub-command itself is unknown to the CLI.
const UNKNOWN_COMMAND_PATTERNS: &[&str] = &[
    "unknown command",
    "unrecognized command",
    "invalid choice",
    "no such sub-command",
    "not a command",
];

const PROBE_TIMEOUT_S: u64 = 10;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Output of one finished CLI invocation.
#[derive(Debug)]
struct CliOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Backend that shells out to a Ghidra CLI exposing `decompile <target>` and
/// `asm <target>` sub-commands.
///
/// Tests can bypass the tool by pointing `RE_PARITY_GHIDRA_FAKE_DECOMPILE` and
/// `RE_PARITY_GHIDRA_FAKE_ASM` at files whose contents stand in for the output.
pub struct GhidraCliBackend {
    cli_path: String,
    timeout_s: u64,
    caps: OnceCell<BackendCapabilities>,
}

impl GhidraCliBackend {
    pub fn new(cli_path: impl Into<String>, timeout_s: u64) -> Self {
        Self { cli_path: cli_path.into(), timeout_s, caps: OnceCell::new() }
    }

    fn run(&self, args: &[&str]) -> Result<String, BackendError> {
        let out = run_with_timeout(&self.cli_path, args, self.timeout_s)?;
        if !out.success {
            return Err(BackendError::Failed {
                tool: self.cli_path.clone(),
                args: args.join(" "),
                output: format!("{}{}", out.stdout, out.stderr),
            });
        }
        Ok(out.stdout)
    }

    /// A sub-command exists when it exits 0, or fails without an "unknown command" complaint.
    fn subcommand_exists(&self, sub: &str) -> bool {
        let timeout_s = self.timeout_s.min(PROBE_TIMEOUT_S);
        for probe_arg in ["--help", "__probe__"] {
            match run_with_timeout(&self.cli_path, &[sub, probe_arg], timeout_s) {
                Ok(out) if out.success => return true,
                Ok(out) if is_unknown_command(&out.stderr) => return false,
                Ok(_) => {}
                Err(err) => {
                    log::debug!("capability probe '{sub} {probe_arg}' failed: {err}");
                    return false;
                }
            }
        }
        true
    }

    fn probe_capabilities(&self) -> BackendCapabilities {
        if env::var_os("RE_PARITY_GHIDRA_FAKE_DECOMPILE").is_some() {
            let has_asm = env::var_os("RE_PARITY_GHIDRA_FAKE_ASM").is_some();
            return BackendCapabilities { has_decompile: true, has_asm };
        }
        let has_asm = self.subcommand_exists("asm");
        let caps = BackendCapabilities { has_decompile: true, has_asm };
        log::debug!("{} capabilities: {caps:?}", self.cli_path);
        caps
    }
}

impl DecompilerBackend for GhidraCliBackend {
    fn name(&self) -> &'static str {
        "ghidra-bridge"
    }

    fn capabilities(&self) -> BackendCapabilities {
        *self.caps.get_or_init(|| self.probe_capabilities())
    }

    fn decompile(&self, target: &str) -> Result<DecompileResult, BackendError> {
        let raw = match env::var_os("RE_PARITY_GHIDRA_FAKE_DECOMPILE") {
            Some(fake) => fs::read_to_string(fake).map_err(|e| {
                BackendError::Other(format!("failed to read RE_PARITY_GHIDRA_FAKE_DECOMPILE: {e}"))
            })?,
            None => self.run(&["decompile", target])?,
        };
        Ok(DecompileResult::from_output(target, raw))
    }

    fn asm(&self, target: &str) -> Result<Option<AsmListing>, BackendError> {
        if env::var_os("RE_PARITY_GHIDRA_FAKE_DECOMPILE").is_some() {
            let Some(fake) = env::var_os("RE_PARITY_GHIDRA_FAKE_ASM") else {
                return Ok(None);
            };
            let raw = fs::read_to_string(fake).map_err(|e| {
                BackendError::Other(format!("failed to read RE_PARITY_GHIDRA_FAKE_ASM: {e}"))
            })?;
            return Ok(Some(AsmListing::from_output(target, raw)));
        }
        // A failing `asm` call means no listing, not a hard error.
        match self.run(&["asm", target]) {
            Ok(raw) => Ok(Some(AsmListing::from_output(target, raw))),
            Err(err) => {
                log::debug!("asm unavailable for {target}: {err}");
                Ok(None)
            }
        }
    }
}

fn is_unknown_command(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    UNKNOWN_COMMAND_PATTERNS.iter().any(|pat| lower.contains(pat))
}

fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(err) = pipe.read_to_end(&mut buf) {
                log::debug!("failed to read tool output: {err}");
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run `tool args...`, killing it once `timeout_s` elapses.
fn run_with_timeout(tool: &str, args: &[&str], timeout_s: u64) -> Result<CliOutput, BackendError> {
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BackendError::Spawn { tool: tool.to_string(), source })?;

    // Drain both pipes concurrently so a chatty tool cannot block on a full pipe.
    let stdout = read_pipe(child.stdout.take());
    let stderr = read_pipe(child.stderr.take());

    let deadline = Instant::now() + Duration::from_secs(timeout_s);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                if let Err(err) = child.kill() {
                    log::debug!("failed to kill {tool}: {err}");
                }
                if let Err(err) = child.wait() {
                    log::debug!("failed to reap {tool}: {err}");
                }
                // Grandchildren may still hold the pipes open, so the readers are not joined.
                log::debug!("{tool} timed out; leaving output readers detached");
                drop((stdout, stderr));
                return Err(BackendError::Timeout {
                    tool: tool.to_string(),
                    args: args.join(" "),
                    timeout_s,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(BackendError::Other(format!("failed to wait on {tool}: {err}"))),
        }
    };

    Ok(CliOutput {
        success: status.success(),
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}
