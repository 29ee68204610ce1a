pub mod backends;
pub mod cache;
pub mod check;
pub mod find;
pub mod init;
pub mod runs;
pub mod util;

pub use backends::*;
pub use cache::*;
pub use check::*;
pub use find::*;
pub use init::*;
pub use runs::*;
pub use util::*;
