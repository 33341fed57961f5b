// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! [`ExecutionHandler`] backed by a Postgres connection pool.

use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{Config, NoTls, types::ToSql};
use tracing::{debug, error, instrument};

use crate::{
    SqlValue,
    config::PoolConfig,
    database_error::DatabaseError,
    handler::ExecutionHandler,
    row::Row,
    sql::{ExpressionBuilder, Statement},
};

pub struct PostgresHandler {
    pool: Pool,
}

impl PostgresHandler {
    /// Build a pool from `config`, checking that a connection can be made if the config asks for
    /// it.
    pub async fn connect(config: &PoolConfig) -> Result<Self, DatabaseError> {
        let url = normalize_url(&config.url)?;

        let mut pg_config = Config::from_str(&url).map_err(|e| {
            DatabaseError::Delegate(e)
                .with_context("Failed to parse PostgreSQL connection string".into())
        })?;
        if let Some(user) = &config.user {
            pg_config.user(user);
        }
        if let Some(password) = &config.password {
            pg_config.password(password);
        }

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(pg_config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| DatabaseError::Config(format!("Failed to create DB pool: {e}")))?;

        let handler = Self::from_pool(pool);
        if config.check_connection_on_startup {
            // Returned to the pool on drop
            let _client = handler
                .client()
                .await
                .map_err(|e| e.with_context("Failed to connect to the database".into()))?;
        }
        Ok(handler)
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }

    async fn query_rows(
        &self,
        statement: &Statement,
    ) -> Result<Vec<tokio_postgres::Row>, DatabaseError> {
        let (sql, params) = statement.to_sql();
        let client = self.client().await?;

        debug!("Executing SQL operation: {}", sql);

        let bindings = pg_params(&params);
        client
            .query(&sql, &bindings[..])
            .await
            .map_err(|e| {
                error!("Failed to execute query: {e:?}");
                DatabaseError::Delegate(e).with_context("Database operation failed".into())
            })
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let (sql, params) = statement.to_sql();
        let client = self.client().await?;

        debug!("Executing SQL operation: {}", sql);

        let bindings = pg_params(&params);
        client
            .execute(&sql, &bindings[..])
            .await
            .map_err(|e| {
                error!("Failed to execute statement: {e:?}");
                DatabaseError::Delegate(e).with_context("Database operation failed".into())
            })
    }
}

#[async_trait]
impl ExecutionHandler for PostgresHandler {
    #[instrument(name = "PostgresHandler::exec", skip_all)]
    async fn exec(&self, statement: &Statement) -> Result<(), DatabaseError> {
        self.execute(statement).await.map(|_| ())
    }

    #[instrument(name = "PostgresHandler::exec_with_rows_affected", skip_all)]
    async fn exec_with_rows_affected(&self, statement: &Statement) -> Result<i64, DatabaseError> {
        let affected = self.execute(statement).await?;
        Ok(i64::try_from(affected).unwrap_or(i64::MAX))
    }

    #[instrument(name = "PostgresHandler::insert_with_last_id", skip_all)]
    async fn insert_with_last_id(
        &self,
        statement: &Statement,
    ) -> Result<(u64, i64), DatabaseError> {
        let returns_id =
            matches!(statement, Statement::Insert(insert) if insert.returning.is_some());
        if !returns_id {
            return Ok((self.execute(statement).await?, 0));
        }

        let rows = self.query_rows(statement).await?;
        let last_id = match rows.last() {
            Some(row) => match row.try_get::<_, SqlValue>(0)? {
                SqlValue::Int(id) => id,
                SqlValue::Null => 0,
                other => {
                    return Err(DatabaseError::Decode(format!(
                        "expected an integer id, found {other}"
                    )));
                }
            },
            None => 0,
        };
        Ok((rows.len() as u64, last_id))
    }

    #[instrument(name = "PostgresHandler::first", skip_all)]
    async fn first(&self, statement: &Statement) -> Result<Option<Row>, DatabaseError> {
        self.query_rows(statement)
            .await?
            .first()
            .map(Row::try_from)
            .transpose()
    }

    #[instrument(name = "PostgresHandler::query", skip_all)]
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        self.query_rows(statement)
            .await?
            .iter()
            .map(Row::try_from)
            .collect()
    }

    #[instrument(name = "PostgresHandler::count", skip_all)]
    async fn count(&self, statement: &Statement) -> Result<i64, DatabaseError> {
        let rows = self.query_rows(statement).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<_, i64>(0)?),
            None => Err(DatabaseError::Decode("count returned no rows".into())),
        }
    }

    #[instrument(name = "PostgresHandler::exists", skip_all)]
    async fn exists(&self, statement: &Statement) -> Result<bool, DatabaseError> {
        Ok(!self.query_rows(statement).await?.is_empty())
    }
}

fn pg_params(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| param as &(dyn ToSql + Sync))
        .collect()
}

/// Strip URL parameters the driver does not understand and reject modes that need TLS, which this
/// handler does not set up.
fn normalize_url(url: &str) -> Result<String, DatabaseError> {
    let url =
        url::Url::parse(url).map_err(|_| DatabaseError::Config("Invalid database URL".into()))?;

    let mut kept = vec![];
    for (name, value) in url.query_pairs() {
        match (name.as_ref(), value.as_ref()) {
            ("ssl", "true") | ("sslmode", "require" | "verify-ca" | "verify-full") => {
                return Err(DatabaseError::Config(format!(
                    "TLS connections are not supported ({name}={value})"
                )));
            }
            ("ssl" | "sslmode" | "sslrootcert", _) => {}
            _ => kept.push((name.into_owned(), value.into_owned())),
        }
    }

    let mut cleaned_url = url.clone();
    if kept.is_empty() {
        cleaned_url.set_query(None);
    } else {
        cleaned_url.query_pairs_mut().clear().extend_pairs(kept);
    }

    // The driver does not decode '+' as a space
    Ok(cleaned_url.as_str().replace('+', "%20"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_normalization() {
        assert_eq!(
            normalize_url(
                "postgres://app@localhost:5432/orders?sslmode=disable&application_name=exo+sql"
            )
            .unwrap(),
            "postgres://app@localhost:5432/orders?application_name=exo%20sql"
        );
        assert_eq!(
            normalize_url("postgres://localhost/orders?ssl=false").unwrap(),
            "postgres://localhost/orders"
        );
    }

    #[test]
    fn url_rejections() {
        assert!(matches!(
            normalize_url("not a url"),
            Err(DatabaseError::Config(_))
        ));
        assert!(matches!(
            normalize_url("postgres://localhost/orders?sslmode=require"),
            Err(DatabaseError::Config(_))
        ));
    }

    #[tokio::test]
    async fn connect_without_check_is_lazy() {
        let mut config = PoolConfig::new("postgres://localhost:1/orders");
        config.check_connection_on_startup = false;

        let handler = PostgresHandler::connect(&config).await.unwrap();
        assert_eq!(handler.pool.status().max_size, 10);
    }

    #[tokio::test]
    async fn connect_with_check_reports_unreachable_database() {
        let config = PoolConfig::new("postgres://localhost:1/orders");

        let Err(err) = PostgresHandler::connect(&config).await else {
            panic!("Connection check should fail without a server");
        };
        let DatabaseError::WithContext(context, _) = &err else {
            panic!("Expected a contextual error, got {err}");
        };
        assert_eq!(context.as_str(), "Failed to connect to the database");
    }
}
