use crate::services::decompiler::{
    AsmListing, BackendCapabilities, BackendError, DecompileResult, DecompilerBackend,
};

/// Text returned for every decompile request.
pub const STUB_DECOMPILE: &str = "// Decompiled by stub backend
void __fastcall CStub::StubFunction(CStub *this) {
    // stub body
    return;
}
// Callers: 2 | Callees: 0
";

/// In-memory backend returning canned data. Useful for exercising the pipeline
/// without a Ghidra install.
pub struct StubBackend;

impl DecompilerBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities { has_decompile: true, has_asm: true }
    }

    fn decompile(&self, target: &str) -> Result<DecompileResult, BackendError> {
        Ok(DecompileResult::from_output(target, STUB_DECOMPILE))
    }

    fn asm(&self, _target: &str) -> Result<Option<AsmListing>, BackendError> {
        Ok(None)
    }
}
