//! Typed target descriptors.
//!
//! Catalog-discovered names are validated once, when the catalog resolves
//! them, and every later operation takes a [`TargetDescriptor`]. Identifiers
//! are never string-formatted into commands without passing through [`Ident`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Longest identifier the store accepts, in bytes.
pub const MAX_IDENT_LEN: usize = 63;

/// A validated SQL identifier: `[A-Za-z_][A-Za-z0-9_$]*`, at most 63 bytes.
///
/// The character set excludes quotes, so [`Ident::quoted`] needs no escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ident(String);

impl Ident {
    pub fn new(value: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidIdentifier {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("empty"));
        }
        if value.len() > MAX_IDENT_LEN {
            return Err(invalid("longer than 63 bytes"));
        }
        let mut chars = value.chars();
        let first = chars.next().unwrap_or_default();
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(invalid("must start with a letter or underscore"));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid("only letters, digits, '_' and '$' are allowed"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form, safe to embed in DDL.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl TryFrom<String> for Ident {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ident::new(&value)
    }
}

impl From<Ident> for String {
    fn from(ident: Ident) -> Self {
        ident.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of relation a descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Table,
    PartitionedTable,
    Partition,
    Index,
    MaterializedView,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::PartitionedTable => "partitioned_table",
            Self::Partition => "partition",
            Self::Index => "index",
            Self::MaterializedView => "materialized_view",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema + name + kind of one catalog object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDescriptor {
    schema: Ident,
    name: Ident,
    kind: RelationKind,
}

impl TargetDescriptor {
    pub fn new(schema: Ident, name: Ident, kind: RelationKind) -> Self {
        Self { schema, name, kind }
    }

    /// Validate raw catalog strings into a descriptor.
    pub fn resolve(schema: &str, name: &str, kind: RelationKind) -> Result<Self, CatalogError> {
        Ok(Self::new(Ident::new(schema)?, Ident::new(name)?, kind))
    }

    pub fn schema(&self) -> &Ident {
        &self.schema
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// A descriptor in the same schema.
    pub fn sibling(&self, name: Ident, kind: RelationKind) -> Self {
        Self::new(self.schema.clone(), name, kind)
    }

    /// `schema.name`, unquoted, for logs and state records.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// `"schema"."name"`, for DDL.
    pub fn quoted(&self) -> String {
        format!("{}.{}", self.schema.quoted(), self.name.quoted())
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
