//! The vault: agent address → claimed value, persisted in redb.

pub mod error;
pub mod handle;
pub mod vault;

pub use error::VaultError;
pub use handle::VaultHandle;
pub use vault::Vault;
