use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use liab_types::{Flake, KeyPart};

use crate::bucket::Bucket;
use crate::error::{StoreError, StoreResult};
use crate::payload;
use crate::schema::{DeclKind, FieldKind, TypeDecl};
use crate::stream::Stream;
use crate::tables::SubStore;
use crate::traits::{Txn, WriteTxn};

/// A single entity bound to a transaction.
///
/// An item is its key path (type and field names alternating with
/// identifiers, ending in its own flake) plus the declaration of its type.
/// Creating one does no I/O. Two items are equal when they have the same
/// type and the same identifier.
pub struct Item<'t, T: Txn> {
    tx: &'t T,
    ty: Option<(&'t str, &'t TypeDecl)>,
    home: SubStore,
    path: Vec<KeyPart>,
    id: Flake,
}

/// A resolved field of an item.
pub enum Field<'t, T: Txn> {
    Bucket(Bucket<'t, T>),
    Stream(Stream<'t, T>),
}

impl<T: Txn> Field<'_, T> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Bucket(_) => FieldKind::Bucket,
            Field::Stream(_) => FieldKind::Stream,
        }
    }
}

impl<'t, T: Txn> Item<'t, T> {
    pub(crate) fn new(
        tx: &'t T,
        ty: Option<(&'t str, &'t TypeDecl)>,
        home: SubStore,
        parent: &[KeyPart],
        id: Flake,
    ) -> Self {
        let mut path = parent.to_vec();
        path.push(KeyPart::Id(id));
        Self {
            tx,
            ty,
            home,
            path,
            id,
        }
    }

    pub fn id(&self) -> Flake {
        self.id
    }

    /// Declared type, or `None` for entries of an untyped stream.
    pub fn type_name(&self) -> Option<&'t str> {
        self.ty.map(|(name, _)| name)
    }

    /// Sub-store holding this item's payload.
    pub fn home(&self) -> SubStore {
        self.home
    }

    pub fn path(&self) -> &[KeyPart] {
        &self.path
    }

    /// Encoded key of the payload.
    pub fn key(&self) -> Vec<u8> {
        self.tx.codec().encode(&self.path)
    }

    /// Read and decode the payload. `Ok(None)` if nothing is stored.
    pub fn get<V: DeserializeOwned>(&self) -> StoreResult<Option<V>> {
        match self.tx.get(self.home, &self.key())? {
            Some(bytes) => Ok(Some(payload::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self) -> StoreResult<bool> {
        Ok(self.tx.get(self.home, &self.key())?.is_some())
    }

    /// Resolve a declared field to its bucket or stream handle.
    pub fn field(&self, name: &str) -> StoreResult<Field<'t, T>> {
        let decl = self
            .ty
            .and_then(|(_, decl)| decl.field(name))
            .ok_or_else(|| StoreError::UnknownField {
                owner: self.owner(),
                name: name.to_string(),
            })?;

        let mut path = self.path.clone();
        path.push(KeyPart::from(name));
        let schema = self.tx.schema();
        let target = match &decl.item {
            Some(item) => Some(schema.resolve(item)?),
            None => None,
        };

        match decl.kind {
            FieldKind::Bucket => {
                let member = target.ok_or_else(|| {
                    StoreError::InvalidSchema(format!("bucket `{}.{name}` has no item type", self.owner()))
                })?;
                Ok(Field::Bucket(Bucket::new(
                    self.tx,
                    format!("{}.{name}", self.owner()),
                    member,
                    path,
                )))
            }
            FieldKind::Stream => Ok(Field::Stream(Stream::new(self.tx, target, path))),
        }
    }

    /// Resolve a field that must be a bucket.
    pub fn bucket(&self, name: &str) -> StoreResult<Bucket<'t, T>> {
        match self.field(name)? {
            Field::Bucket(bucket) => Ok(bucket),
            other => Err(self.mismatch(name, DeclKind::Bucket, other.kind())),
        }
    }

    /// Resolve a field that must be a stream.
    pub fn stream(&self, name: &str) -> StoreResult<Stream<'t, T>> {
        match self.field(name)? {
            Field::Stream(stream) => Ok(stream),
            other => Err(self.mismatch(name, DeclKind::Stream, other.kind())),
        }
    }

    fn owner(&self) -> String {
        self.type_name().unwrap_or("item").to_string()
    }

    fn mismatch(&self, name: &str, expected: DeclKind, found: FieldKind) -> StoreError {
        StoreError::KindMismatch {
            owner: self.owner(),
            name: name.to_string(),
            expected,
            found: found.into(),
        }
    }
}

impl<T: WriteTxn> Item<'_, T> {
    /// Overwrite the payload at this item's own key.
    pub fn set<V: Serialize + ?Sized>(&self, value: &V) -> StoreResult<()> {
        let bytes = payload::encode(value)?;
        self.tx.put(self.home, &self.key(), &bytes)?;
        debug!(id = %self.id, ty = self.type_name().unwrap_or("-"), len = bytes.len(), "item set");
        Ok(())
    }
}

impl<T: Txn> Clone for Item<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx,
            ty: self.ty,
            home: self.home,
            path: self.path.clone(),
            id: self.id,
        }
    }
}

impl<T: Txn> PartialEq for Item<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.id == other.id
    }
}

impl<T: Txn> Eq for Item<'_, T> {}

impl<T: Txn> fmt::Debug for Item<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("type", &self.type_name())
            .field("id", &self.id)
            .field("home", &self.home)
            .finish()
    }
}
