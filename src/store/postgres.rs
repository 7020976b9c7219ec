//! PostgreSQL backend: one JSONB table per collection inside a configurable schema.

use super::{sql, CollectionSpec, DocumentStore, Filter, PushOutcome};
use crate::config::AppConfig;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDocumentStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Create the database if needed, open a pool and ensure every collection table exists.
    pub async fn connect(config: &AppConfig, specs: &[CollectionSpec]) -> Result<Self, AppError> {
        ensure_database_exists(&config.database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        let store = PgDocumentStore::new(pool, config.schema.clone());
        store.ensure_collections(specs).await?;
        Ok(store)
    }

    /// Idempotent DDL: schema, one table per collection, unique indexes.
    pub async fn ensure_collections(&self, specs: &[CollectionSpec]) -> Result<(), AppError> {
        sqlx::query(&sql::create_schema(&self.schema))
            .execute(&self.pool)
            .await?;
        for spec in specs {
            sqlx::query(&sql::create_collection_table(&self.schema, spec.name))
                .execute(&self.pool)
                .await?;
            for keys in spec.unique_keys {
                if let Some(ddl) = sql::create_unique_index(&self.schema, spec.name, keys) {
                    sqlx::query(&ddl).execute(&self.pool).await?;
                }
            }
            tracing::debug!(collection = spec.name, "collection ready");
        }
        tracing::info!(schema = %self.schema, collections = specs.len(), "collections ensured");
        Ok(())
    }
}

fn filter_object(filter: &Filter) -> Value {
    let map: Map<String, Value> = filter.iter().cloned().collect();
    Value::Object(map)
}

/// Unique-index violations become `Conflict`; anything else stays a database error.
fn map_write_err(collection: &str, e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict(format!("{} with the same unique key already exists", collection));
        }
    }
    AppError::Db(e)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(&self.schema, collection);
        tracing::debug!(sql = %q, %id, "query");
        let row = sqlx::query_scalar::<_, Value>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let q = sql::select_by_ids(&self.schema, collection);
        tracing::debug!(sql = %q, ids = ids.len(), "query");
        let rows = sqlx::query_scalar::<_, Value>(&q)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, AppError> {
        let q = sql::select_filtered(&self.schema, collection, None);
        let params = filter_object(filter);
        tracing::debug!(sql = %q, params = %params, "query");
        let rows = sqlx::query_scalar::<_, Value>(&q)
            .bind(params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, AppError> {
        let q = sql::select_filtered(&self.schema, collection, Some(1));
        let params = filter_object(filter);
        tracing::debug!(sql = %q, params = %params, "query");
        let row = sqlx::query_scalar::<_, Value>(&q)
            .bind(params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn count(&self, collection: &str) -> Result<u64, AppError> {
        let q = sql::count(&self.schema, collection);
        let n: i64 = sqlx::query_scalar(&q).fetch_one(&self.pool).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> Result<Value, AppError> {
        let q = sql::insert(&self.schema, collection);
        tracing::debug!(sql = %q, %id, "insert");
        sqlx::query_scalar::<_, Value>(&q)
            .bind(id)
            .bind(&doc)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(collection, e))
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update_merge(&self.schema, collection);
        tracing::debug!(sql = %q, %id, fields = changes.len(), "update");
        sqlx::query_scalar::<_, Value>(&q)
            .bind(id)
            .bind(Value::Object(changes))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(collection, e))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, AppError> {
        let q = sql::delete(&self.schema, collection);
        tracing::debug!(sql = %q, %id, "delete");
        let row = sqlx::query_scalar::<_, Uuid>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn push_reference(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        target: Uuid,
    ) -> Result<PushOutcome, AppError> {
        let q = sql::push_reference(&self.schema, collection);
        tracing::debug!(sql = %q, %id, field, %target, "push reference");
        let row = sqlx::query_scalar::<_, Value>(&q)
            .bind(id)
            .bind(field)
            .bind(target.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(doc) = row {
            return Ok(PushOutcome::Pushed(doc));
        }
        let exists: bool = sqlx::query_scalar(&sql::exists(&self.schema, collection))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(if exists {
            PushOutcome::AlreadyPresent
        } else {
            PushOutcome::Missing
        })
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split `postgres://host/db?opts` into (`postgres://host/postgres`, `db`).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}
