//! vault.rs
//!
//! Durable mapping from agent address to its currently claimed value.
//!
//! Records are plain text: the key is the agent's multiaddr and the value is
//! either a decimal integer or the absent marker (see [`Claim`]). redb keeps
//! everything in a single `vault.redb` file inside the vault directory and
//! serializes write transactions, so one `Vault` can be shared by every agent
//! task behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use liars_common::Claim;

use crate::error::VaultError;

const CLAIMS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("claims");

pub const VAULT_FILE: &str = "vault.redb";

pub struct Vault {
    db: Database,
    path: PathBuf,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("db", &"Redb")
            .field("path", &self.path)
            .finish()
    }
}

impl Vault {
    /// Opens (or creates) the vault stored under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, VaultError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(VAULT_FILE);

        let db = Database::create(&path)?;

        // make sure the table exists so readers never hit TableDoesNotExist
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(CLAIMS_TABLE)?;
        }
        write_txn.commit()?;

        debug!("vault opened at {}", path.display());
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up the claim stored under `key`. A miss is `Ok(None)`.
    pub fn get(&self, key: &str) -> Result<Option<Claim>, VaultError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLAIMS_TABLE)?;

        let raw = match table.get(key)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };

        raw.parse::<Claim>()
            .map(Some)
            .map_err(|_| VaultError::Corrupt { key: key.to_string(), raw })
    }

    /// Stores `claim` under `key`, replacing any previous claim.
    pub fn put(&self, key: &str, claim: Claim) -> Result<(), VaultError> {
        let encoded = claim.encode();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLAIMS_TABLE)?;
            table.insert(key, encoded.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Removes `key`. Returns whether an entry was there.
    pub fn delete(&self, key: &str) -> Result<bool, VaultError> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CLAIMS_TABLE)?;
            let removed = table.remove(key)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    pub fn len(&self) -> Result<u64, VaultError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLAIMS_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, VaultError> {
        Ok(self.len()? == 0)
    }

    /// Copies every record out of the vault, ordered by key.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Claim>, VaultError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLAIMS_TABLE)?;

        let mut out = BTreeMap::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value().to_string();
            let raw = value.value().to_string();
            let claim = raw
                .parse::<Claim>()
                .map_err(|_| VaultError::Corrupt { key: key.clone(), raw })?;
            out.insert(key, claim);
        }
        Ok(out)
    }

    /// Drops every record.
    pub fn clear(&self) -> Result<(), VaultError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLAIMS_TABLE)?;
            let keys: Vec<String> = table
                .iter()?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<Result<_, _>>()?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Closes the database. Pending writes are already committed.
    pub fn close(self) -> Result<(), VaultError> {
        debug!("vault closed at {}", self.path.display());
        drop(self.db);
        Ok(())
    }
}
