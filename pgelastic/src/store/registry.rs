//! Registry mapping logical `(index, type)` keys to physical relations

use crate::store::{StorageBackend, TypeRecord};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// PostgreSQL truncates identifiers beyond 63 bytes
const MAX_IDENTIFIER_LEN: usize = 63;
const SEQUENCE_SUFFIX: &str = "_id_seq";

/// Storage handle of one `(index, type)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub index: String,
    pub type_name: String,
    table: String,
    sequence: String,
}

impl Relation {
    pub fn new(index: &str, type_name: &str) -> Result<Self> {
        validate_index_name(index)?;
        validate_name("type", type_name)?;

        let table = format!("{}_{}", index, type_name);
        if table.len() + SEQUENCE_SUFFIX.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::MalformedInput(format!(
                "Relation name '{}' is too long",
                table
            )));
        }
        let sequence = format!("{}{}", table, SEQUENCE_SUFFIX);

        Ok(Self {
            index: index.to_string(),
            type_name: type_name.to_string(),
            table,
            sequence,
        })
    }

    /// Unquoted relation name, `{index}_{type}`
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Unquoted name of the id generator
    pub fn sequence(&self) -> &str {
        &self.sequence
    }
}

/// Validate an index or type name: ASCII alphanumerics, `_` and `-` only
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedInput(format!("{} name cannot be empty", kind)));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::MalformedInput(format!(
            "{} name '{}' contains invalid characters (use alphanumeric, hyphens, underscores)",
            kind, name
        )));
    }
    Ok(())
}

/// Validate an index name; besides [`validate_name`], `_` may not lead
pub fn validate_index_name(name: &str) -> Result<()> {
    validate_name("index", name)?;
    if name.starts_with('_') {
        return Err(Error::MalformedInput(format!(
            "Index name '{}' must not start with '_'",
            name
        )));
    }
    Ok(())
}

/// Outcome of a create-if-absent request
#[derive(Debug, Clone, PartialEq)]
pub enum Provisioned {
    /// This call created the type and its relation
    Created(TypeRecord),
    /// The type already existed, possibly created concurrently
    Existing(TypeRecord),
}

impl Provisioned {
    pub fn record(&self) -> &TypeRecord {
        match self {
            Provisioned::Created(r) | Provisioned::Existing(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Provisioned::Created(_))
    }
}

/// Caches provisioned relations and serialises create-if-absent through the
/// backend's uniqueness constraints. Relations are never dropped, so cached
/// handles stay valid for the life of the process.
#[derive(Default)]
pub struct SchemaRegistry {
    relations: RwLock<HashMap<(String, String), Arc<Relation>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, index: &str, type_name: &str) -> Option<Arc<Relation>> {
        self.relations
            .read()
            .get(&(index.to_string(), type_name.to_string()))
            .cloned()
    }

    fn remember(&self, relation: Relation) -> Arc<Relation> {
        let key = (relation.index.clone(), relation.type_name.clone());
        self.relations
            .write()
            .entry(key)
            .or_insert_with(|| Arc::new(relation))
            .clone()
    }

    /// Look up the relation of an existing type; `None` if never provisioned
    pub async fn resolve(
        &self,
        backend: &dyn StorageBackend,
        index: &str,
        type_name: &str,
    ) -> Result<Option<Arc<Relation>>> {
        if let Some(relation) = self.cached(index, type_name) {
            return Ok(Some(relation));
        }
        let relation = Relation::new(index, type_name)?;
        match backend.fetch_type(index, type_name).await? {
            Some(_) => Ok(Some(self.remember(relation))),
            None => Ok(None),
        }
    }

    /// Create the type (and its index) unless present. Concurrent callers
    /// racing on the same pair see exactly one `Created`.
    pub async fn provision(
        &self,
        backend: &dyn StorageBackend,
        index: &str,
        type_name: &str,
        options: &str,
    ) -> Result<(Arc<Relation>, Provisioned)> {
        let relation = Relation::new(index, type_name)?;

        if backend.insert_index(index, "").await?.is_some() {
            tracing::info!("Created index '{}'", index);
        }

        let outcome = match backend.insert_type(&relation, options).await? {
            Some(record) => {
                tracing::info!(
                    "Provisioned relation '{}' for {}/{} on {}",
                    relation.table(),
                    index,
                    type_name,
                    backend.name()
                );
                crate::metrics::record_relation_provisioned(index, type_name);
                Provisioned::Created(record)
            }
            None => {
                let record = backend.fetch_type(index, type_name).await?.ok_or_else(|| {
                    Error::Internal(format!(
                        "Type {}/{} reported existing but could not be read",
                        index, type_name
                    ))
                })?;
                Provisioned::Existing(record)
            }
        };

        Ok((self.remember(relation), outcome))
    }

    /// Return the relation for `(index, type)`, provisioning both with empty
    /// options on first use.
    pub async fn ensure(
        &self,
        backend: &dyn StorageBackend,
        index: &str,
        type_name: &str,
    ) -> Result<Arc<Relation>> {
        if let Some(relation) = self.resolve(backend, index, type_name).await? {
            return Ok(relation);
        }
        let (relation, _) = self.provision(backend, index, type_name, "").await?;
        Ok(relation)
    }
}
