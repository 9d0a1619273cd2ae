use std::fmt;

use serde::Serialize;
use tracing::debug;

use liab_types::{Flake, KeyPart};

use crate::error::StoreResult;
use crate::item::Item;
use crate::schema::TypeDecl;
use crate::stream::Tail;
use crate::tables::SubStore;
use crate::traits::{Txn, WriteTxn};

/// All entities of one declared type.
///
/// Items live in the objects sub-store under the type name followed by
/// their identifier.
pub struct Hash<'t, T: Txn> {
    tx: &'t T,
    name: &'t str,
    decl: &'t TypeDecl,
}

impl<'t, T: Txn> Hash<'t, T> {
    /// Look up `name` in the transaction's schema.
    pub fn resolve(tx: &'t T, name: &str) -> StoreResult<Self> {
        let (name, decl) = tx.schema().resolve(name)?;
        Ok(Self { tx, name, decl })
    }

    pub fn name(&self) -> &'t str {
        self.name
    }

    pub fn decl(&self) -> &'t TypeDecl {
        self.decl
    }

    /// Handle for the item with `id`. Does not check that it exists.
    pub fn get(&self, id: Flake) -> Item<'t, T> {
        Item::new(
            self.tx,
            Some((self.name, self.decl)),
            SubStore::Objects,
            &[KeyPart::from(self.name)],
            id,
        )
    }

    /// Items from newest to oldest.
    pub fn tail(&self) -> Tail<'t, T> {
        Tail::new(
            self.tx,
            Some((self.name, self.decl)),
            SubStore::Objects,
            vec![KeyPart::from(self.name)],
        )
    }
}

impl<'t, T: WriteTxn> Hash<'t, T> {
    /// Store `value` as a new item under a fresh identifier.
    pub fn insert<V: Serialize + ?Sized>(&self, value: &V) -> StoreResult<Item<'t, T>> {
        let id = self.tx.next_id()?;
        let item = self.get(id);
        item.set(value)?;
        debug!(ty = self.name, %id, "item inserted");
        Ok(item)
    }
}

impl<T: Txn> Clone for Hash<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx,
            name: self.name,
            decl: self.decl,
        }
    }
}

impl<T: Txn> fmt::Debug for Hash<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hash")
            .field("name", &self.name)
            .field("fields", &self.decl.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
