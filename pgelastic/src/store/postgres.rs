//! PostgreSQL storage backend
//!
//! Each `(index, type)` pair owns one relation `"{index}_{type}"` holding
//! `(id, document JSONB, version)`. Full-text leaves render to `tsvector`
//! matches with every value bound as a parameter.

use crate::config::PostgresConfig;
use crate::query::{Condition, MatchMode, Predicate, TextMatch};
use crate::store::{
    Document, IndexRecord, LikePattern, Relation, StorageBackend, TypeRecord,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};

const INDICES_TABLE: &str = "pgelastic_indices";
const TYPES_TABLE: &str = "pgelastic_types";

/// Attempts at drawing a generated id that a caller has not already used
const MAX_GENERATED_ID_ATTEMPTS: usize = 16;

#[derive(FromRow)]
struct IndexRow {
    name: String,
    options: String,
}

impl From<IndexRow> for IndexRecord {
    fn from(row: IndexRow) -> Self {
        IndexRecord {
            name: row.name,
            options: row.options,
        }
    }
}

#[derive(FromRow)]
struct TypeRow {
    name: String,
    index_name: String,
    options: String,
}

impl From<TypeRow> for TypeRecord {
    fn from(row: TypeRow) -> Self {
        TypeRecord {
            name: row.name,
            index_name: row.index_name,
            options: row.options,
        }
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    document: Json<Value>,
    version: i32,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            source: row.document.0,
            version: i64::from(row.version),
        }
    }
}

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool for the configured server
    pub async fn connect(config: &PostgresConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options()?)
            .await?;
        tracing::info!(
            "Connected to PostgreSQL at {} (database '{}')",
            config.address,
            config.database
        );
        Ok(Self::new(pool))
    }
}

/// Double-quote an identifier. Names are validated before they get here.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn returning_columns() -> &'static str {
    " RETURNING id, document, version"
}

/// Append the SQL form of `predicate` to `builder`, binding every value
pub fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Leaf(Condition::MatchAll) => {
            builder.push("TRUE");
        }
        Predicate::Leaf(Condition::Text(m)) => push_text_match(builder, m),
        Predicate::And(children) => push_group(builder, children, " AND ", "TRUE"),
        Predicate::Or(children) => push_group(builder, children, " OR ", "FALSE"),
    }
}

fn push_group(
    builder: &mut QueryBuilder<'_, Postgres>,
    children: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if children.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        push_predicate(builder, child);
    }
    builder.push(")");
}

fn push_text_match(builder: &mut QueryBuilder<'_, Postgres>, m: &TextMatch) {
    let tsquery = match m.mode {
        MatchMode::Terms => "plainto_tsquery",
        MatchMode::Phrase => "phraseto_tsquery",
    };

    builder.push("to_tsvector(");
    if let Some(analyzer) = &m.analyzer {
        builder.push_bind(analyzer.clone()).push("::regconfig, ");
    }
    builder.push("document -> ");
    builder.push_bind(m.field.clone());
    builder.push(") @@ ").push(tsquery).push("(");
    if let Some(analyzer) = &m.analyzer {
        builder.push_bind(analyzer.clone()).push("::regconfig, ");
    }
    builder.push_bind(m.query.clone());
    builder.push(")");
}

/// Build the filtered read for one relation
pub fn select_query<'a>(relation: &Relation, predicate: &Predicate) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT id, document, version FROM {} WHERE ",
        quote_ident(relation.table())
    ));
    push_predicate(&mut builder, predicate);
    builder
}

#[async_trait]
impl StorageBackend for PostgresBackend {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                name VARCHAR(255) PRIMARY KEY, \
                options TEXT NOT NULL DEFAULT ''\
            )",
            INDICES_TABLE
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                name VARCHAR(255) NOT NULL, \
                index_name VARCHAR(255) NOT NULL REFERENCES {}(name), \
                options TEXT NOT NULL DEFAULT '', \
                PRIMARY KEY (name, index_name)\
            )",
            TYPES_TABLE, INDICES_TABLE
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_index(&self, name: &str, options: &str) -> Result<Option<IndexRecord>> {
        let row = sqlx::query_as::<_, IndexRow>(&format!(
            "INSERT INTO {} (name, options) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING RETURNING name, options",
            INDICES_TABLE
        ))
        .bind(name)
        .bind(options)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn fetch_index(&self, name: &str) -> Result<Option<IndexRecord>> {
        let row = sqlx::query_as::<_, IndexRow>(&format!(
            "SELECT name, options FROM {} WHERE name = $1",
            INDICES_TABLE
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_indices(&self, pattern: &LikePattern) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(&format!(
            "SELECT name FROM {} WHERE name LIKE $1 ESCAPE '\\' ORDER BY name",
            INDICES_TABLE
        ))
        .bind(pattern.as_sql())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn insert_type(&self, relation: &Relation, options: &str) -> Result<Option<TypeRecord>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TypeRow>(&format!(
            "INSERT INTO {} (name, index_name, options) VALUES ($1, $2, $3) \
             ON CONFLICT (name, index_name) DO NOTHING \
             RETURNING name, index_name, options",
            TYPES_TABLE
        ))
        .bind(&relation.type_name)
        .bind(&relation.index)
        .bind(options)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let sequence = quote_ident(relation.sequence());
        sqlx::query(&format!("CREATE SEQUENCE IF NOT EXISTS {}", sequence))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id VARCHAR(128) PRIMARY KEY DEFAULT nextval('{}')::text, \
                document JSONB NOT NULL, \
                version INTEGER NOT NULL DEFAULT 1\
            )",
            quote_ident(relation.table()),
            sequence
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn fetch_type(&self, index: &str, name: &str) -> Result<Option<TypeRecord>> {
        let row = sqlx::query_as::<_, TypeRow>(&format!(
            "SELECT name, index_name, options FROM {} WHERE index_name = $1 AND name = $2",
            TYPES_TABLE
        ))
        .bind(index)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn store_type_options(
        &self,
        index: &str,
        name: &str,
        options: &str,
    ) -> Result<Option<TypeRecord>> {
        let row = sqlx::query_as::<_, TypeRow>(&format!(
            "UPDATE {} SET options = $3 WHERE index_name = $1 AND name = $2 \
             RETURNING name, index_name, options",
            TYPES_TABLE
        ))
        .bind(index)
        .bind(name)
        .bind(options)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_types(&self, index: &str, pattern: &LikePattern) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(&format!(
            "SELECT name FROM {} WHERE index_name = $1 AND name LIKE $2 ESCAPE '\\' ORDER BY name",
            TYPES_TABLE
        ))
        .bind(index)
        .bind(pattern.as_sql())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn insert_document(
        &self,
        relation: &Relation,
        id: Option<&str>,
        source: &Value,
    ) -> Result<Option<Document>> {
        let table = quote_ident(relation.table());

        if let Some(id) = id {
            let row = sqlx::query_as::<_, DocumentRow>(&format!(
                "INSERT INTO {} (id, document) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING{}",
                table,
                returning_columns()
            ))
            .bind(id)
            .bind(Json(source))
            .fetch_optional(&self.pool)
            .await?;
            return Ok(row.map(Into::into));
        }

        // Generated ids can collide with caller-supplied numeric ids; draw again
        let sql = format!(
            "INSERT INTO {} (document) VALUES ($1) ON CONFLICT (id) DO NOTHING{}",
            table,
            returning_columns()
        );
        for _ in 0..MAX_GENERATED_ID_ATTEMPTS {
            let row = sqlx::query_as::<_, DocumentRow>(&sql)
                .bind(Json(source))
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                return Ok(Some(row.into()));
            }
        }
        Err(Error::QueryFailure(format!(
            "Could not generate a free document id in {}",
            relation.table()
        )))
    }

    async fn fetch_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT id, document, version FROM {} WHERE id = $1",
            quote_ident(relation.table())
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn replace_document(
        &self,
        relation: &Relation,
        id: &str,
        source: &Value,
    ) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "UPDATE {} SET document = $2, version = version + 1 WHERE id = $1{}",
            quote_ident(relation.table()),
            returning_columns()
        ))
        .bind(id)
        .bind(Json(source))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn remove_document(&self, relation: &Relation, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "DELETE FROM {} WHERE id = $1{}",
            quote_ident(relation.table()),
            returning_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn select_documents(
        &self,
        relation: &Relation,
        predicate: &Predicate,
    ) -> Result<Vec<Document>> {
        let mut builder = select_query(relation, predicate);
        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
