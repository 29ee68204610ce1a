pub mod backends;
pub mod decompiler;

pub use decompiler::{
    create_backend, default_backend_registry, fetch_ghidra_data, AsmListing, BackendCapabilities,
    BackendError, BackendRegistry, DecompileResult, DecompilerBackend,
};
