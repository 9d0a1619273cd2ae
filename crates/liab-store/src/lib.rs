//! Transactional object layer for liab.
//!
//! This crate maps typed entities and their relationships onto the flat,
//! ordered key space of a [`redb`] database. A declarative [`Schema`] names
//! entity types (hashes) and, per type, fields that are either unordered
//! relations (buckets) or ordered append logs (streams).
//!
//! # Sub-stores
//!
//! Three tables partition the key space:
//!
//! - `o` (objects) -- entity payloads and bucket membership markers
//! - `i` (indices) -- stream entries, ordered by flake
//! - `m` (metadata) -- the flake generator state
//!
//! # Transactions
//!
//! [`Store::read`] and [`Store::write`] run a closure inside a snapshot read
//! or an exclusive write transaction. Returning `Ok` commits; returning `Err`
//! aborts and discards every write made in the closure. Handles obtained
//! from a transaction ([`Hash`], [`Item`], [`Bucket`], [`Stream`]) are cheap
//! views bound to it and are never persisted.
//!
//! ```no_run
//! use liab_store::{Schema, Store, StoreResult, Txn, TypeDecl};
//!
//! let schema = Schema::new()
//!     .with_type("user", TypeDecl::new().bucket("rooms", "room"))
//!     .with_type("room", TypeDecl::new().stream_of("messages", "message"))
//!     .with_type("message", TypeDecl::new());
//! let store = Store::in_memory(schema)?;
//!
//! store.write(|wx| -> StoreResult<()> {
//!     let user = wx.hash("user")?.insert(&serde_json::json!({"name": "ann"}))?;
//!     let room = wx.hash("room")?.insert(&serde_json::json!({"topic": "rust"}))?;
//!     user.bucket("rooms")?.set(&room)?;
//!     room.stream("messages")?.append(&"hello")?;
//!     Ok(())
//! })?;
//! # Ok::<(), liab_store::StoreError>(())
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod hash;
pub mod item;
pub mod payload;
pub mod schema;
pub mod store;
pub mod stream;
pub mod tables;
pub mod traits;
pub mod txn;

// Re-export primary types at crate root for ergonomic imports.
pub use bucket::Bucket;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use hash::Hash;
pub use item::{Field, Item};
pub use schema::{DeclKind, FieldDecl, FieldKind, Schema, TypeDecl};
pub use store::Store;
pub use stream::{Stream, Tail};
pub use tables::SubStore;
pub use traits::{Txn, WriteTxn};
pub use txn::{ReadTx, WriteTx};

pub use liab_flake::{Clock, ManualClock, RetryPolicy, SystemClock};
pub use liab_types::{Flake, FlakeConfig, KeyPart};
