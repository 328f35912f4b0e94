use std::future::Future;
use std::time::Duration;

use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::{Query as PgQuery, QueryScalar},
};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    adapters::{Adapter, Query, Record, RecordStream},
    error::Error,
    options::ExecOptions,
    query::{Direction, FilterOp, Value},
};

const COLUMNS: &str = "id, source, data, created_at, updated_at";

/// PostgreSQL adapter using a unified JSON storage model.
///
/// Schema:
/// ```sql
/// CREATE TABLE records (
///     id UUID PRIMARY KEY,
///     source TEXT NOT NULL,
///     data JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
///
/// CREATE INDEX idx_records_source ON records(source);
///
/// -- GIN index for flexible JSONB predicates
/// CREATE INDEX idx_records_data ON records USING GIN (data);
/// ```
///
/// Predicates and ordering address payload fields through `data->>'field'`,
/// cast to the bound value's type. Field names are trusted schema
/// identifiers; an unknown field fails at execution time.
pub struct PostgresAdapter {
    pub(crate) pool: PgPool,
}

impl PostgresAdapter {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<(), Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id UUID PRIMARY KEY,
                source TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_records_source ON records(source)
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_records_data ON records USING GIN (data)
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;

        Ok(())
    }

    /// The `source` column stores the prefix-scoped name; restore the
    /// logical source before a record leaves the adapter.
    fn unscope(mut record: Record, source: &str) -> Record {
        record.source = source.to_string();
        record
    }

    fn map_row(row: PgRow) -> Result<Record, Error> {
        Ok(Record {
            id: row
                .try_get("id")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
            source: row
                .try_get("source")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
            data: row
                .try_get("data")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
        })
    }

    fn map_err(err: sqlx::Error) -> Error {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict,
            other => Error::Backend(other.to_string()),
        }
    }

    fn value_cast(value: &Value) -> &'static str {
        match value {
            Value::Int(_) => "::bigint",
            Value::Float(_) => "::double precision",
            Value::Bool(_) => "::boolean",
            Value::Timestamp(_) => "::timestamptz",
            Value::Uuid(_) | Value::String(_) => "",
        }
    }

    fn build_where(query: &Query) -> String {
        let mut conditions = vec!["source = $1".to_string()];
        let mut param_idx = 2;

        for predicate in &query.predicates {
            match &predicate.op {
                FilterOp::Eq(value) => {
                    conditions.push(format!(
                        "(data->>'{}'){} = ${}",
                        predicate.field,
                        Self::value_cast(value),
                        param_idx
                    ));
                    param_idx += 1;
                }
                FilterOp::IsNull => {
                    conditions.push(format!("data->>'{}' IS NULL", predicate.field));
                }
                FilterOp::IsNotNull => {
                    conditions.push(format!("data->>'{}' IS NOT NULL", predicate.field));
                }
            }
        }

        format!("WHERE {}", conditions.join(" AND "))
    }

    fn build_order(query: &Query) -> String {
        if query.order.is_empty() {
            return String::new();
        }

        let terms: Vec<String> = query
            .order
            .iter()
            .map(|order| {
                let direction = match order.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("data->>'{}' {}", order.field, direction)
            })
            .collect();

        format!("ORDER BY {}", terms.join(", "))
    }

    fn build_select(query: &Query) -> String {
        let where_clause = Self::build_where(query);
        let order_clause = Self::build_order(query);

        let mut sql = format!(
            "SELECT {} FROM records {} {}",
            COLUMNS, where_clause, order_clause
        );

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    fn bind_predicates<'q>(
        mut pg_query: PgQuery<'q, Postgres, PgArguments>,
        query: &Query,
    ) -> PgQuery<'q, Postgres, PgArguments> {
        for predicate in &query.predicates {
            if let FilterOp::Eq(value) = &predicate.op {
                pg_query = match value {
                    Value::String(s) => pg_query.bind(s.clone()),
                    Value::Int(i) => pg_query.bind(*i),
                    Value::Float(f) => pg_query.bind(*f),
                    Value::Bool(b) => pg_query.bind(*b),
                    Value::Timestamp(t) => pg_query.bind(*t),
                    Value::Uuid(u) => pg_query.bind(u.to_string()),
                };
            }
        }
        pg_query
    }

    fn bind_scalar_predicates<'q, O>(
        mut pg_query: QueryScalar<'q, Postgres, O, PgArguments>,
        query: &Query,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for predicate in &query.predicates {
            if let FilterOp::Eq(value) = &predicate.op {
                pg_query = match value {
                    Value::String(s) => pg_query.bind(s.clone()),
                    Value::Int(i) => pg_query.bind(*i),
                    Value::Float(f) => pg_query.bind(*f),
                    Value::Bool(b) => pg_query.bind(*b),
                    Value::Timestamp(t) => pg_query.bind(*t),
                    Value::Uuid(u) => pg_query.bind(u.to_string()),
                };
            }
        }
        pg_query
    }

    async fn with_timeout<T>(
        limit: Option<Duration>,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, Error> {
        let result = match limit {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| Error::Backend("statement timed out".to_string()))?,
            None => fut.await,
        };

        result.map_err(Self::map_err)
    }
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    async fn execute(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<Vec<Record>, Error> {
        let sql = Self::build_select(&query);

        let mut pg_query = sqlx::query(&sql).bind(opts.scoped_source(source));
        pg_query = Self::bind_predicates(pg_query, &query);

        let rows = Self::with_timeout(opts.timeout, pg_query.fetch_all(&self.pool)).await?;

        let records = rows
            .into_iter()
            .map(|row| Self::map_row(row).map(|r| Self::unscope(r, source)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match &query.select {
            Some(fields) => records.into_iter().map(|r| r.project(fields)).collect(),
            None => records,
        })
    }

    async fn count(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<u64, Error> {
        let sql = format!("SELECT COUNT(*) FROM records {}", Self::build_where(&query));

        let mut pg_query = sqlx::query_scalar::<_, i64>(&sql).bind(opts.scoped_source(source));
        pg_query = Self::bind_scalar_predicates(pg_query, &query);

        let count = Self::with_timeout(opts.timeout, pg_query.fetch_one(&self.pool)).await?;
        Ok(count as u64)
    }

    async fn get_by_id(
        &self,
        source: &str,
        id: Uuid,
        opts: &ExecOptions,
    ) -> Result<Option<Record>, Error> {
        let sql = format!("SELECT {} FROM records WHERE id = $1 AND source = $2", COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(opts.scoped_source(source))
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?;

        row.map(|row| Self::map_row(row).map(|r| Self::unscope(r, source)))
            .transpose()
    }

    async fn insert(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error> {
        let sql = format!(
            "INSERT INTO records (id, source, data, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            COLUMNS
        );
        let source = record.source;
        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(opts.scoped_source(&source))
            .bind(record.data)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;

        Self::map_row(row).map(|r| Self::unscope(r, &source))
    }

    async fn update(&self, record: Record, opts: &ExecOptions) -> Result<Record, Error> {
        let sql = format!(
            "UPDATE records SET data = $3, updated_at = $4 \
             WHERE id = $1 AND source = $2 RETURNING {}",
            COLUMNS
        );
        let source = record.source;
        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(opts.scoped_source(&source))
            .bind(record.data)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;

        Self::map_row(row).map(|r| Self::unscope(r, &source))
    }

    async fn delete(&self, source: &str, id: Uuid, opts: &ExecOptions) -> Result<Record, Error> {
        let sql = format!(
            "DELETE FROM records WHERE id = $1 AND source = $2 RETURNING {}",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(opts.scoped_source(source))
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;

        Self::map_row(row).map(|r| Self::unscope(r, source))
    }

    async fn stream(
        &self,
        source: &str,
        query: Query,
        opts: &ExecOptions,
    ) -> Result<RecordStream, Error> {
        let sql = Self::build_select(&query);
        let scoped = opts.scoped_source(source);
        let source = source.to_string();
        let pool = self.pool.clone();
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Record, Error>>(64);

        tokio::spawn(async move {
            let mut pg_query = sqlx::query(&sql).bind(scoped);
            pg_query = Self::bind_predicates(pg_query, &query);

            let mut rows = pg_query.fetch(&pool);
            while let Some(row) = rows.next().await {
                let item = row
                    .map_err(Self::map_err)
                    .and_then(Self::map_row)
                    .map(|record| Self::unscope(record, &source))
                    .map(|record| match &query.select {
                        Some(fields) => record.project(fields),
                        None => record,
                    });
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
