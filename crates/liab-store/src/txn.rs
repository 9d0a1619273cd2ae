//! redb-backed transaction handles.

use std::ops::Bound;
use std::sync::Arc;

use redb::{ReadOnlyTable, ReadableTable, Table};
use tracing::debug;

use liab_flake::{FlakeGenerator, FlakeState};
use liab_types::{Flake, KeyCodec};

use crate::error::StoreResult;
use crate::schema::Schema;
use crate::tables::{SubStore, FLAKE_STATE_KEY};
use crate::traits::{Txn, WriteTxn};

type Bytes = &'static [u8];

/// Snapshot read transaction.
///
/// Dropping the handle releases the snapshot. A read transaction has no
/// visible effects, so committing and aborting are the same thing.
pub struct ReadTx {
    txn: redb::ReadTransaction,
    schema: Arc<Schema>,
    codec: KeyCodec,
}

impl ReadTx {
    pub(crate) fn new(txn: redb::ReadTransaction, schema: Arc<Schema>, codec: KeyCodec) -> Self {
        Self { txn, schema, codec }
    }

    /// Release the snapshot.
    pub fn close(self) {
        debug!("read transaction closed");
    }

    fn table(&self, table: SubStore) -> StoreResult<ReadOnlyTable<Bytes, Bytes>> {
        Ok(self.txn.open_table(table.definition())?)
    }
}

impl Txn for ReadTx {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    fn get(&self, table: SubStore, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        get_in(&self.table(table)?, key)
    }

    fn scan_prefix(&self, table: SubStore, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        scan_in(&self.table(table)?, prefix)
    }

    fn seek_last(&self, table: SubStore, prefix: &[u8], upper: Bound<&[u8]>) -> StoreResult<Option<Vec<u8>>> {
        seek_last_in(&self.table(table)?, prefix, upper)
    }
}

/// Exclusive write transaction.
///
/// Call [`commit`](WriteTx::commit) to publish every write atomically. A
/// handle that is aborted or dropped without committing discards them all.
pub struct WriteTx {
    txn: redb::WriteTransaction,
    schema: Arc<Schema>,
    codec: KeyCodec,
    generator: FlakeGenerator,
    worker_id: u32,
}

impl WriteTx {
    pub(crate) fn new(
        txn: redb::WriteTransaction,
        schema: Arc<Schema>,
        codec: KeyCodec,
        generator: FlakeGenerator,
        worker_id: u32,
    ) -> Self {
        Self {
            txn,
            schema,
            codec,
            generator,
            worker_id,
        }
    }

    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()?;
        debug!("write transaction committed");
        Ok(())
    }

    pub fn abort(self) -> StoreResult<()> {
        self.txn.abort()?;
        debug!("write transaction aborted");
        Ok(())
    }

    /// The persisted generator state, if any identifier was ever issued.
    pub fn flake_state(&self) -> StoreResult<Option<FlakeState>> {
        match self.get(SubStore::Meta, FLAKE_STATE_KEY)? {
            Some(bytes) => Ok(Some(FlakeState::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the persisted generator state.
    pub fn set_flake_state(&self, state: &FlakeState) -> StoreResult<()> {
        self.put(SubStore::Meta, FLAKE_STATE_KEY, &state.encode()?)
    }

    fn table(&self, table: SubStore) -> StoreResult<Table<'_, Bytes, Bytes>> {
        Ok(self.txn.open_table(table.definition())?)
    }
}

impl Txn for WriteTx {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    fn get(&self, table: SubStore, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        get_in(&self.table(table)?, key)
    }

    fn scan_prefix(&self, table: SubStore, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        scan_in(&self.table(table)?, prefix)
    }

    fn seek_last(&self, table: SubStore, prefix: &[u8], upper: Bound<&[u8]>) -> StoreResult<Option<Vec<u8>>> {
        seek_last_in(&self.table(table)?, prefix, upper)
    }
}

impl WriteTxn for WriteTx {
    fn put(&self, table: SubStore, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.table(table)?.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, table: SubStore, key: &[u8]) -> StoreResult<bool> {
        let existed = self.table(table)?.remove(key)?.is_some();
        Ok(existed)
    }

    fn next_id(&self) -> StoreResult<Flake> {
        self.generator.next(
            self.worker_id,
            || self.flake_state(),
            |state| self.set_flake_state(state),
        )
    }
}

fn get_in<T: ReadableTable<Bytes, Bytes>>(table: &T, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
    Ok(table.get(key)?.map(|value| value.value().to_vec()))
}

fn scan_in<T: ReadableTable<Bytes, Bytes>>(table: &T, prefix: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
    let mut keys = Vec::new();
    for entry in table.range(prefix..)? {
        let (key, _) = entry?;
        let key = key.value();
        // Keys are sorted, so the first miss ends the prefix.
        if !key.starts_with(prefix) {
            break;
        }
        keys.push(key.to_vec());
    }
    Ok(keys)
}

fn seek_last_in<T: ReadableTable<Bytes, Bytes>>(
    table: &T,
    prefix: &[u8],
    upper: Bound<&[u8]>,
) -> StoreResult<Option<Vec<u8>>> {
    let empty = match upper {
        Bound::Included(end) => end < prefix,
        Bound::Excluded(end) => end <= prefix,
        Bound::Unbounded => false,
    };
    if empty {
        return Ok(None);
    }

    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(prefix), upper);
    // Everything at or above `prefix` that does not share it sorts after the
    // prefixed block, so skipping those from the top lands on its last key.
    for entry in table.range::<&[u8]>(bounds)?.rev() {
        let (key, _) = entry?;
        let key = key.value();
        if key.starts_with(prefix) {
            return Ok(Some(key.to_vec()));
        }
    }
    Ok(None)
}
