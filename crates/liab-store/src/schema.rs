//! Declarative schema.
//!
//! Every top-level type is a hash: a collection of entities with generated
//! identity. A type declares named fields, each either a bucket (unordered
//! relation to items of another type) or a stream (ordered log of entries,
//! optionally typed).
//!
//! ```toml
//! [types.user.fields.rooms]
//! kind = "bucket"
//! item = "room"
//!
//! [types.room.fields.messages]
//! kind = "stream"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Kind of a field declared inside a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bucket,
    Stream,
}

/// Kind of any schema declaration, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Hash,
    Bucket,
    Stream,
}

impl From<FieldKind> for DeclKind {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bucket => DeclKind::Bucket,
            FieldKind::Stream => DeclKind::Stream,
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclKind::Hash => "hash",
            DeclKind::Bucket => "bucket",
            DeclKind::Stream => "stream",
        })
    }
}

/// A field declared inside a type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub kind: FieldKind,
    /// Target type of bucket members or stream entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

/// Declaration of a hash type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDecl>,
}

impl TypeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a bucket of `item` entities.
    pub fn bucket(mut self, name: impl Into<String>, item: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldDecl {
                kind: FieldKind::Bucket,
                item: Some(item.into()),
            },
        );
        self
    }

    /// Declare an untyped stream.
    pub fn stream(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldDecl {
                kind: FieldKind::Stream,
                item: None,
            },
        );
        self
    }

    /// Declare a stream whose entries are `item` entities.
    pub fn stream_of(mut self, name: impl Into<String>, item: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldDecl {
                kind: FieldKind::Stream,
                item: Some(item.into()),
            },
        );
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.get(name)
    }
}

/// The full set of type declarations for a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDecl>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>, decl: TypeDecl) -> Self {
        self.types.insert(name.into(), decl);
        self
    }

    /// Look up a type by name, returning the schema-owned name with it.
    pub fn resolve(&self, name: &str) -> StoreResult<(&str, &TypeDecl)> {
        self.types
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| StoreError::UnknownField {
                owner: "schema".into(),
                name: name.to_string(),
            })
    }

    /// Check names and cross-references. Run once when a store opens.
    pub fn validate(&self) -> StoreResult<()> {
        for (type_name, decl) in &self.types {
            if type_name.is_empty() {
                return Err(StoreError::InvalidSchema("empty type name".into()));
            }
            for (field_name, field) in &decl.fields {
                if field_name.is_empty() {
                    return Err(StoreError::InvalidSchema(format!(
                        "empty field name on `{type_name}`"
                    )));
                }
                match (&field.kind, &field.item) {
                    (FieldKind::Bucket, None) => {
                        return Err(StoreError::InvalidSchema(format!(
                            "bucket `{type_name}.{field_name}` does not name an item type"
                        )));
                    }
                    (_, Some(item)) if !self.types.contains_key(item) => {
                        return Err(StoreError::InvalidSchema(format!(
                            "`{type_name}.{field_name}` refers to undeclared type `{item}`"
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::InvalidSchema(e.to_string()))
    }

    /// Read a TOML schema file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::InvalidSchema(e.to_string()))
    }
}
