use std::fmt;

use tracing::debug;

use liab_types::KeyPart;

use crate::error::{StoreError, StoreResult};
use crate::item::Item;
use crate::payload::MARKER;
use crate::schema::TypeDecl;
use crate::tables::SubStore;
use crate::traits::{Txn, WriteTxn};

/// Unordered set of references from one item to items of a fixed type.
///
/// Membership is one empty marker value per member in the objects sub-store,
/// keyed by the owner's path, the field name and the member's identifier.
pub struct Bucket<'t, T: Txn> {
    tx: &'t T,
    label: String,
    member: (&'t str, &'t TypeDecl),
    prefix: Vec<u8>,
}

impl<'t, T: Txn> Bucket<'t, T> {
    pub(crate) fn new(tx: &'t T, label: String, member: (&'t str, &'t TypeDecl), path: Vec<KeyPart>) -> Self {
        let prefix = tx.codec().encode(&path);
        Self {
            tx,
            label,
            member,
            prefix,
        }
    }

    /// Type every member must have.
    pub fn member_type(&self) -> &'t str {
        self.member.0
    }

    /// Current members, in identifier order.
    pub fn get(&self) -> StoreResult<Vec<Item<'t, T>>> {
        let codec = self.tx.codec();
        let base = [KeyPart::from(self.member.0)];
        let members = self
            .tx
            .scan_prefix(SubStore::Objects, &self.prefix)?
            .iter()
            .filter_map(|key| codec.member_id(&self.prefix, key))
            .map(|id| Item::new(self.tx, Some(self.member), SubStore::Objects, &base, id))
            .collect();
        Ok(members)
    }

    pub fn contains<U: Txn>(&self, item: &Item<'_, U>) -> StoreResult<bool> {
        if item.type_name() != Some(self.member.0) {
            return Ok(false);
        }
        Ok(self.tx.get(SubStore::Objects, &self.marker_key(item))?.is_some())
    }

    fn marker_key<U: Txn>(&self, item: &Item<'_, U>) -> Vec<u8> {
        let mut key = self.prefix.clone();
        self.tx.codec().encode_into(&KeyPart::Id(item.id()), &mut key);
        key
    }

    fn check_member<U: Txn>(&self, item: &Item<'_, U>) -> StoreResult<()> {
        match item.type_name() {
            Some(found) if found == self.member.0 => Ok(()),
            found => Err(StoreError::WrongMemberType {
                bucket: self.label.clone(),
                expected: self.member.0.to_string(),
                found: found.unwrap_or("untyped").to_string(),
            }),
        }
    }
}

impl<T: WriteTxn> Bucket<'_, T> {
    /// Add `item` to the bucket. Adding a present member is a no-op.
    pub fn set<U: Txn>(&self, item: &Item<'_, U>) -> StoreResult<()> {
        self.check_member(item)?;
        self.tx.put(SubStore::Objects, &self.marker_key(item), MARKER)?;
        debug!(bucket = %self.label, member = %item.id(), "bucket member set");
        Ok(())
    }

    /// Remove `item` from the bucket. Returns `true` if it was a member.
    pub fn remove<U: Txn>(&self, item: &Item<'_, U>) -> StoreResult<bool> {
        self.check_member(item)?;
        let removed = self.tx.delete(SubStore::Objects, &self.marker_key(item))?;
        debug!(bucket = %self.label, member = %item.id(), removed, "bucket member removed");
        Ok(removed)
    }
}

impl<T: Txn> Clone for Bucket<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx,
            label: self.label.clone(),
            member: self.member,
            prefix: self.prefix.clone(),
        }
    }
}

impl<T: Txn> fmt::Debug for Bucket<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("label", &self.label)
            .field("member_type", &self.member.0)
            .finish()
    }
}
