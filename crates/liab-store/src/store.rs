use std::fmt;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::Database;
use tracing::{debug, info, warn};

use liab_flake::{Clock, FlakeGenerator, SystemClock};
use liab_types::KeyCodec;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use crate::tables::SubStore;
use crate::txn::{ReadTx, WriteTx};

/// Handle to an open database and the schema it is used with.
///
/// The handle is the shared context for every transaction: cloning it is
/// cheap and all clones refer to the same database. Separate `Store` values
/// opened on different files are fully isolated from each other.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Database,
    schema: Arc<Schema>,
    codec: KeyCodec,
    generator: FlakeGenerator,
    config: StoreConfig,
    in_memory: bool,
}

impl Store {
    /// Open (or create) the database file named by `config`.
    pub fn open(config: StoreConfig, schema: Schema) -> StoreResult<Self> {
        Self::open_with_clock(config, schema, Arc::new(SystemClock))
    }

    /// Open (or create) a database file, issuing identifiers from `clock`.
    pub fn open_with_clock(config: StoreConfig, schema: Schema, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(&config.path)?;
        Self::init(db, config, schema, clock, false)
    }

    /// Open an empty in-memory database with default settings.
    pub fn in_memory(schema: Schema) -> StoreResult<Self> {
        Self::in_memory_with_clock(StoreConfig::default(), schema, Arc::new(SystemClock))
    }

    /// Open an empty in-memory database. `config.path` is ignored.
    pub fn in_memory_with_clock(config: StoreConfig, schema: Schema, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db, config, schema, clock, true)
    }

    fn init(
        db: Database,
        config: StoreConfig,
        schema: Schema,
        clock: Arc<dyn Clock>,
        in_memory: bool,
    ) -> StoreResult<Self> {
        config.validate()?;
        schema.validate()?;
        let codec = KeyCodec::for_config(&config.flake)?;
        let generator = FlakeGenerator::new(config.flake, config.retry, clock)?;

        // Read transactions can only open tables that already exist.
        let txn = db.begin_write()?;
        for table in SubStore::ALL {
            txn.open_table(table.definition())?;
        }
        txn.commit()?;

        if in_memory {
            info!(worker_id = config.worker_id, types = schema.types.len(), "in-memory store opened");
        } else {
            info!(
                path = %config.path.display(),
                worker_id = config.worker_id,
                types = schema.types.len(),
                "store opened"
            );
        }

        Ok(Self {
            inner: Arc::new(StoreInner {
                db,
                schema: Arc::new(schema),
                codec,
                generator,
                config,
                in_memory,
            }),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Begin a snapshot read transaction.
    pub fn rx(&self) -> StoreResult<ReadTx> {
        let txn = self.inner.db.begin_read()?;
        debug!("read transaction opened");
        Ok(ReadTx::new(txn, Arc::clone(&self.inner.schema), self.inner.codec))
    }

    /// Begin an exclusive write transaction.
    ///
    /// Blocks while another write transaction is open.
    pub fn wx(&self) -> StoreResult<WriteTx> {
        let txn = self.inner.db.begin_write()?;
        debug!("write transaction opened");
        Ok(WriteTx::new(
            txn,
            Arc::clone(&self.inner.schema),
            self.inner.codec,
            self.inner.generator.clone(),
            self.inner.config.worker_id,
        ))
    }

    /// Run `f` against a read snapshot.
    pub fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&ReadTx) -> Result<R, E>,
        E: From<StoreError>,
    {
        let rx = self.rx()?;
        let result = f(&rx);
        rx.close();
        result
    }

    /// Run `f` in a write transaction: commit if it returns `Ok`, abort if
    /// it returns `Err`. No write made by a failing closure is ever visible.
    pub fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&WriteTx) -> Result<R, E>,
        E: From<StoreError>,
    {
        let wx = self.wx()?;
        match f(&wx) {
            Ok(value) => {
                wx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = wx.abort() {
                    warn!(error = %abort, "abort after failed write transaction also failed");
                }
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Store");
        if self.inner.in_memory {
            s.field("path", &":memory:");
        } else {
            s.field("path", &self.inner.config.path);
        }
        s.field("worker_id", &self.inner.config.worker_id)
            .field("types", &self.inner.schema.types.len())
            .finish()
    }
}
