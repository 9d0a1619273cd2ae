use std::ops::Bound;

use liab_types::{Flake, KeyCodec};

use crate::error::StoreResult;
use crate::hash::Hash;
use crate::schema::Schema;
use crate::tables::SubStore;

/// Read access to the three sub-stores within one transaction.
///
/// All reads observe the snapshot taken when the transaction began (plus,
/// for a write transaction, its own uncommitted writes).
pub trait Txn {
    /// The schema the store was opened with.
    fn schema(&self) -> &Schema;

    /// Codec for the store's identifier width.
    fn codec(&self) -> &KeyCodec;

    /// Read the value stored at `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, table: SubStore, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// All keys starting with `prefix`, in forward key order.
    fn scan_prefix(&self, table: SubStore, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>>;

    /// The greatest key that starts with `prefix` and lies below `upper`.
    ///
    /// Returns `Ok(None)` once no key with the prefix remains, which is how
    /// backward iteration terminates.
    fn seek_last(&self, table: SubStore, prefix: &[u8], upper: Bound<&[u8]>) -> StoreResult<Option<Vec<u8>>>;

    /// Resolve a schema-declared type to its hash handle.
    fn hash(&self, name: &str) -> StoreResult<Hash<'_, Self>>
    where
        Self: Sized,
    {
        Hash::resolve(self, name)
    }
}

/// Write access within one exclusive transaction.
///
/// Writes become visible to other transactions together, at commit, and
/// are discarded together on abort.
pub trait WriteTxn: Txn {
    fn put(&self, table: SubStore, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Delete a key. Returns `true` if it existed.
    fn delete(&self, table: SubStore, key: &[u8]) -> StoreResult<bool>;

    /// Issue a new identifier, persisting generator state in this transaction.
    fn next_id(&self) -> StoreResult<Flake>;
}
