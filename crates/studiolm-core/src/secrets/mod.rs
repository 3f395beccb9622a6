//! Secret storage for backend API keys
//!
//! Backend adapters never read the process environment directly; they are
//! handed a key resolved through a `SecretStore`, so the host application
//! can supply keys from wherever it keeps them.

mod chain_store;
mod env_store;
mod memory_store;
mod traits;

pub use chain_store::ChainSecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
