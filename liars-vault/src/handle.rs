use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::{error::VaultError, vault::Vault};

/// Lazily opened vault owned by the orchestrator for one run.
///
/// The first `get` opens the database; concurrent callers block on the same
/// initialization and all receive the same `Arc<Vault>`. A failed open leaves
/// the handle empty so the error reaches every caller.
#[derive(Debug)]
pub struct VaultHandle {
    dir: PathBuf,
    cell: OnceCell<Arc<Vault>>,
}

impl VaultHandle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Vault>, VaultError> {
        self.cell
            .get_or_try_init(|| Vault::open(&self.dir).map(Arc::new))
            .cloned()
    }

    /// Closes the vault once no task holds it anymore.
    pub fn close(self) -> Result<(), VaultError> {
        match self.cell.into_inner() {
            Some(vault) => Arc::try_unwrap(vault)
                .map_err(|_| VaultError::InUse)?
                .close(),
            None => Ok(()),
        }
    }
}
