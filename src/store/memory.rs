//! In-memory store with copy-on-commit transactions.

use std::sync::{Mutex, MutexGuard};

use log::debug;

use super::tables::Tables;
use super::Store;
use crate::error::EngineError;

/// Reference store backing the engine in tests and the CLI.
///
/// Mutations run against a staged copy of the tables; the copy replaces the
/// live tables only when the closure succeeds, so a failed mutation can never
/// leave a half-updated hierarchy behind. The mutex serializes writers, which
/// satisfies the locking discipline the hierarchy counters and the overlap
/// scan require.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.inner.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means a past panic mid-read; the staged
            // copy discipline keeps the committed tables consistent.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Store for MemoryStore {
    fn transact<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Tables) -> Result<T, EngineError>,
    {
        let mut guard = self.lock();
        let mut staged = guard.clone();
        match f(&mut staged) {
            Ok(value) => {
                *guard = staged;
                Ok(value)
            }
            Err(err) => {
                debug!("transaction rolled back: {}", err);
                Err(err)
            }
        }
    }

    fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Tables) -> T,
    {
        f(&self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockStatus;
    use crate::prefix::Prefix;

    #[test]
    fn test_commit_on_ok() {
        let store = MemoryStore::new();
        let id = store
            .transact(|t| {
                Ok(t.insert_block(
                    Prefix::parse("10.0.0.0/8").unwrap(),
                    None,
                    BlockStatus::Active,
                ))
            })
            .unwrap();
        assert!(store.read(|t| t.block(id).is_some()));
    }

    #[test]
    fn test_rollback_on_err() {
        let store = MemoryStore::new();
        let result: Result<(), _> = store.transact(|t| {
            t.insert_block(
                Prefix::parse("10.0.0.0/8").unwrap(),
                None,
                BlockStatus::Active,
            );
            Err(EngineError::InvalidValue("forced failure".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.read(|t| t.blocks().count()), 0);
    }
}
