pub mod context;
pub mod crypto;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use context::*;
pub use crypto::*;
pub use error::*;
pub use memory::*;
pub use traits::*;
pub use types::*;
