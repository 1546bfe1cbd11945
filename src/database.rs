use std::fmt::Display;

use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{engine::any::Any, opt::auth, Surreal};
use url::Url;

pub use query::*;

/// Helper for executing arbitrary SurrealQL queries.
pub mod query;

/// Macros for defining query functions.
pub mod macros;

use crate::Located;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

const SCHEMA: &str = include_str!("../schema.surrealql");

const MEMORY_URL: &str = "mem://";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("cannot sign in to the database as `{username}` at {location}: {source}"))]
    SignIn {
        username: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to apply the database schema at {location}: {source}"))]
    Schema {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("statement {statement} failed at {location}: {message}"))]
    Statement {
        statement: usize,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for DatabaseError {
    fn location(&self) -> Location {
        match self {
            DatabaseError::DatabaseConnection { location, .. }
            | DatabaseError::SignIn { location, .. }
            | DatabaseError::Schema { location, .. }
            | DatabaseError::DatabaseQuery { location, .. }
            | DatabaseError::DatabaseDeserialize { location, .. }
            | DatabaseError::Statement { location, .. } => *location,
        }
    }
}

#[derive(Debug, serde::Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_namespace", default = "default_name")]
    pub namespace: String,
    #[serde(rename = "surreal_database", default = "default_name")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

fn default_name() -> String {
    "learnpath".to_owned()
}

#[derive(Debug, serde::Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_username")]
    pub username: String,
    #[serde(rename = "surreal_password")]
    pub password: String,
}

/// Represents a database wrapper.
///
/// Every connection has the schema in `schema.surrealql` applied before it is handed out.
#[derive(Debug, Clone)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    #[tracing::instrument(skip(config), fields(url = %config.url))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .context(DatabaseConnectionSnafu {
                url: config.url.to_string(),
            })?;

        if let Some(credentials) = &config.credentials {
            let auth = auth::Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &credentials.username,
                password: &credentials.password,
            };

            database.signin(auth).await.context(SignInSnafu {
                username: credentials.username.clone(),
            })?;
        }

        Self::prepare(database, &config.namespace, &config.database).await
    }

    /// An empty in-process database, used when no server is configured and in tests.
    pub async fn memory() -> Result<Self> {
        let database = surrealdb::engine::any::connect(MEMORY_URL)
            .await
            .context(DatabaseConnectionSnafu { url: MEMORY_URL })?;

        Self::prepare(database, "learnpath", "learnpath").await
    }

    async fn prepare(database: Surreal<Any>, namespace: &str, name: &str) -> Result<Self> {
        database
            .use_ns(namespace)
            .use_db(name)
            .await
            .context(DatabaseQuerySnafu)?;

        database
            .query(SCHEMA)
            .await
            .context(SchemaSnafu)?
            .check()
            .context(SchemaSnafu)?;

        tracing::info!(namespace, database = name, "database schema applied");
        Ok(Self { database })
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let enrollments: Vec<Enrollment> = db
    ///     .sql("SELECT * FROM enrollments WHERE learner_id = $learner_id")
    ///     .bind(("learner_id", "u1"))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    pub fn sql(&self, query: &str) -> Bindings<'_> {
        Bindings::new(self.database.query(query))
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}

/// Builds the [DatabaseError] for a statement that came back with an error.
pub fn statement_error(statement: usize, message: impl Display) -> DatabaseError {
    StatementSnafu {
        statement,
        message: message.to_string(),
    }
    .build()
}
