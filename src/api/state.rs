use std::sync::Arc;

use snafu::ResultExt as _;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::database::Database;
use crate::error::{
    ApplicationError, ConnectDatabaseSnafu, ImportCatalogSnafu, ParseCatalogSnafu, ReadCatalogSnafu,
};
use crate::model::Course;
use crate::service::{CompletionService, EnrollmentService, SessionManager};
use crate::store::{Catalog, MemoryStore, Store, SurrealStore};

#[derive(Clone)]
pub struct App {
    pub enrollments: EnrollmentService,
    pub completions: CompletionService,
    pub sessions: SessionManager,
    pub authenticator: Authenticator,
}

impl App {
    pub fn new<S>(store: Arc<S>, authenticator: Authenticator) -> Self
    where
        S: Store + Catalog,
    {
        let catalog: Arc<dyn Catalog> = store.clone();
        let store: Arc<dyn Store> = store;

        App {
            enrollments: EnrollmentService::new(catalog.clone(), store.clone()),
            completions: CompletionService::new(store.clone()),
            sessions: SessionManager::new(catalog, store),
            authenticator,
        }
    }

    pub fn with_certificate_attempts(mut self, attempts: usize) -> Self {
        self.completions = self.completions.with_attempts(attempts);
        self
    }

    /// Builds the application described by `config`: SurrealDB when `SURREAL_URL` is set, memory otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, ApplicationError> {
        let courses = match &config.catalog_path {
            Some(path) => read_catalog(path).await?,
            None => Vec::new(),
        };

        let authenticator = Authenticator::new(config.auth_secret.clone());

        let app = match &config.database {
            Some(database) => {
                let db = Database::connect(database)
                    .await
                    .context(ConnectDatabaseSnafu)?;
                let store = Arc::new(SurrealStore::new(db));

                for course in courses {
                    store.put_course(course).await.context(ImportCatalogSnafu)?;
                }

                App::new(store, authenticator)
            }
            None => {
                tracing::warn!("no database configured, enrollments live in memory only");
                let store = Arc::new(MemoryStore::default());

                for course in courses {
                    store.put_course(course);
                }

                App::new(store, authenticator)
            }
        };

        Ok(app.with_certificate_attempts(config.certificate_attempts))
    }
}

async fn read_catalog(path: &std::path::Path) -> Result<Vec<Course>, ApplicationError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context(ReadCatalogSnafu { path })?;

    let courses: Vec<Course> = serde_json::from_str(&content).context(ParseCatalogSnafu { path })?;
    tracing::info!(courses = courses.len(), path = %path.display(), "catalog loaded");

    Ok(courses)
}
