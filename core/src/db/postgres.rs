// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! PostgreSQL backend, used in production.
//!
//! Connection failures are reported to the caller as they happen: the pool is lazy and this
//! module never retries operations on its own.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use log::warn;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgDatabaseError, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.downcast_ref::<PgDatabaseError>().code() {
            "23503" /* foreign_key_violation */ => DbError::NotFound,
            "23505" /* unique_violation */ => DbError::AlreadyExists,
            "53300" /* too_many_connections */ => DbError::Unavailable,
            number => DbError::BackendError(format!("pgsql error {}: {}", number, e)),
        },
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Name or address of the server.
    pub host: String,

    /// TCP port of the server.
    pub port: u16,

    /// Name of the catalog database.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password of the role.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Number of connections the pool keeps open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on the number of connections the pool opens.
    pub max_connections: Option<u32>,
}

impl PostgresOptions {
    /// Reads the settings from the `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`,
    /// `<prefix>_USERNAME` and `<prefix>_PASSWORD` variables, all required, and from the optional
    /// `<prefix>_MIN_CONNECTIONS` and `<prefix>_MAX_CONNECTIONS` variables.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
            min_connections: get_optional_var::<u32>(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?,
        })
    }

    /// Builds the pool configuration described by these options.
    fn pool_options(&self) -> PgPoolOptions {
        let mut pool_options = PgPoolOptions::new();
        if let Some(min_connections) = self.min_connections {
            pool_options = pool_options.min_connections(min_connections);
        }
        if let Some(max_connections) = self.max_connections {
            pool_options = pool_options.max_connections(max_connections);
        }
        pool_options
    }

    /// Builds the per-connection configuration described by these options.
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Executor for PostgreSQL queries.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// Connection checked out of the pool.
    PoolExec(PoolConnection<Postgres>),

    /// Open transaction.
    TxExec(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Returns the raw connection to issue `sqlx` queries against.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::PoolExec(conn) => &mut **conn,
            PostgresExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.  Panics for pool connections.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::PoolExec(_) => unreachable!("Do not call commit on direct executors"),
            PostgresExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// Database backed by a pool of PostgreSQL connections.
pub struct PostgresDb {
    /// Pool shared by all requests.
    pool: PgPool,
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

impl PostgresDb {
    /// Creates a pool against the server described by `opts`.
    ///
    /// No connection is opened until the first query, so a server that is down is only detected
    /// then.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let pool = opts.pool_options().connect_lazy_with(opts.connect_options());
        Ok(Self { pool })
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Postgres(PostgresExecutor::PoolExec(conn)))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs the statements in `schema`, which may be more than one.
pub async fn run_schema(e: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(e.conn()).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Test utilities for the PostgreSQL connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the test server configured via the `PGSQL_TEST_*` variables.
    ///
    /// Tables land in the `pg_temp` schema so that they vanish on disconnection, which only works
    /// because the pool holds exactly one connection for its whole life.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let mut opts = PostgresOptions::from_env("PGSQL_TEST").unwrap();
        opts.min_connections = Some(1);
        opts.max_connections = Some(1);
        let db = PostgresDb::connect(opts).unwrap();

        match db.ex().await.unwrap() {
            Executor::Postgres(mut ex) => {
                sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
            }

            #[allow(unreachable_patterns)]
            _ => unreachable!(),
        }
        db
    }
}
