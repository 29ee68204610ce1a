#[cfg(feature = "ghidra-backend")]
pub mod ghidra;
pub mod stub;

#[cfg(feature = "ghidra-backend")]
pub use ghidra::GhidraCliBackend;
pub use stub::StubBackend;
