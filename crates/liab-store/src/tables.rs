//! Table definitions for redb storage.
//!
//! All tables use byte arrays as keys and values. Key encoding is handled
//! by [`liab_types::KeyCodec`].

use redb::TableDefinition;

/// Raw byte table shared by all three sub-stores.
pub type ByteTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

/// Key of the generator state record in the metadata sub-store.
pub const FLAKE_STATE_KEY: &[u8] = b"flake";

/// Table definitions for liab storage.
pub struct Tables;

impl Tables {
    /// Entity payloads and bucket markers.
    /// Key format: {type}{id:7}[{field}{member_id:7}]
    pub const OBJECTS: ByteTable = TableDefinition::new("o");

    /// Stream entries.
    /// Key format: {owner path}{field}{entry_id:7}
    pub const INDICES: ByteTable = TableDefinition::new("i");

    /// Generator state under [`FLAKE_STATE_KEY`].
    pub const META: ByteTable = TableDefinition::new("m");
}

/// One of the three logical partitions of the key space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubStore {
    Objects,
    Indices,
    Meta,
}

impl SubStore {
    pub const ALL: [SubStore; 3] = [SubStore::Objects, SubStore::Indices, SubStore::Meta];

    pub fn definition(self) -> ByteTable {
        match self {
            SubStore::Objects => Tables::OBJECTS,
            SubStore::Indices => Tables::INDICES,
            SubStore::Meta => Tables::META,
        }
    }
}
