use std::fmt;
use std::ops::Bound;

use serde::Serialize;
use tracing::debug;

use liab_types::KeyPart;

use crate::error::StoreResult;
use crate::item::Item;
use crate::schema::TypeDecl;
use crate::tables::SubStore;
use crate::traits::{Txn, WriteTxn};

/// Append-only log attached to an item.
///
/// Entries live in the indices sub-store under the stream's path followed
/// by a fresh identifier, so key order is append order.
pub struct Stream<'t, T: Txn> {
    tx: &'t T,
    entry: Option<(&'t str, &'t TypeDecl)>,
    path: Vec<KeyPart>,
}

impl<'t, T: Txn> Stream<'t, T> {
    pub(crate) fn new(tx: &'t T, entry: Option<(&'t str, &'t TypeDecl)>, path: Vec<KeyPart>) -> Self {
        Self { tx, entry, path }
    }

    /// Declared entry type, if the stream is typed.
    pub fn entry_type(&self) -> Option<&'t str> {
        self.entry.map(|(name, _)| name)
    }

    /// Entries from newest to oldest.
    pub fn tail(&self) -> Tail<'t, T> {
        Tail::new(self.tx, self.entry, SubStore::Indices, self.path.clone())
    }
}

impl<'t, T: WriteTxn> Stream<'t, T> {
    /// Append `value` as a new entry.
    pub fn append<V: Serialize + ?Sized>(&self, value: &V) -> StoreResult<Item<'t, T>> {
        let id = self.tx.next_id()?;
        let entry = Item::new(self.tx, self.entry, SubStore::Indices, &self.path, id);
        entry.set(value)?;
        debug!(%id, ty = self.entry_type().unwrap_or("-"), "stream entry appended");
        Ok(entry)
    }
}

impl<T: Txn> Clone for Stream<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx,
            entry: self.entry,
            path: self.path.clone(),
        }
    }
}

impl<T: Txn> fmt::Debug for Stream<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("path", &self.path)
            .field("entry_type", &self.entry_type())
            .finish()
    }
}

/// Lazy newest-first iteration over the items directly under a key prefix.
///
/// Each step asks the transaction for the greatest key below the previous
/// one, so iteration is finite and never yields the same item twice. Keys
/// that continue past one identifier (nested fields) are skipped.
pub struct Tail<'t, T: Txn> {
    tx: &'t T,
    ty: Option<(&'t str, &'t TypeDecl)>,
    home: SubStore,
    base: Vec<KeyPart>,
    prefix: Vec<u8>,
    upper: Vec<u8>,
    cursor: Option<Vec<u8>>,
    done: bool,
}

impl<'t, T: Txn> Tail<'t, T> {
    pub(crate) fn new(
        tx: &'t T,
        ty: Option<(&'t str, &'t TypeDecl)>,
        home: SubStore,
        base: Vec<KeyPart>,
    ) -> Self {
        let codec = tx.codec();
        let prefix = codec.encode(&base);
        let mut upper = prefix.clone();
        upper.extend_from_slice(&codec.id_upper_bound());
        Self {
            tx,
            ty,
            home,
            base,
            prefix,
            upper,
            cursor: None,
            done: false,
        }
    }

    fn step(&mut self) -> StoreResult<Option<Item<'t, T>>> {
        loop {
            let bound = match &self.cursor {
                Some(cursor) => Bound::Excluded(cursor.as_slice()),
                None => Bound::Included(self.upper.as_slice()),
            };
            let Some(key) = self.tx.seek_last(self.home, &self.prefix, bound)? else {
                return Ok(None);
            };
            let id = self.tx.codec().member_id(&self.prefix, &key);
            self.cursor = Some(key);
            if let Some(id) = id {
                return Ok(Some(Item::new(self.tx, self.ty, self.home, &self.base, id)));
            }
        }
    }
}

impl<'t, T: Txn> Iterator for Tail<'t, T> {
    type Item = StoreResult<Item<'t, T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<T: Txn> fmt::Debug for Tail<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tail")
            .field("home", &self.home)
            .field("base", &self.base)
            .field("done", &self.done)
            .finish()
    }
}
