use derive_new::new;
use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use surrealdb::opt::QueryResult;

use super::*;

/// A pending query. Parameters can be bound using [Bindings::bind] which takes any serializable data structure.
///
/// # Example
/// ```ignore
/// let certificates: Vec<Certificate> = database.sql("SELECT * FROM certificates WHERE learner_id = $learner_id")
///     .bind(("learner_id", "u1"))
///     .fetch_first()
///     .await?;
/// ```
#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response] which is SurrealDB's way to represent a list of statements returned from the database.
    ///
    /// Errors of individual statements stay inside the response, see [Outcome::of].
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self.query.await.context(DatabaseQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }

    /// Execute every statement, keeping the per-statement errors for the caller to classify.
    pub async fn outcome(self) -> Result<Outcome> {
        let response = self.execute().await?;
        Ok(Outcome::of(response))
    }
}

/// The statement errors of an executed query, in statement order.
#[derive(Debug, Default)]
pub struct Outcome {
    errors: Vec<(usize, String)>,
}

impl Outcome {
    pub fn of(mut response: surrealdb::Response) -> Self {
        let mut errors: Vec<(usize, String)> = response
            .take_errors()
            .into_iter()
            .map(|(statement, error)| (statement, error.to_string()))
            .collect();
        errors.sort_by_key(|(statement, _)| *statement);

        Self { errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any statement failed with a message containing `needle`.
    ///
    /// A failed transaction reports its cause on more than one statement, so the whole list is searched.
    pub fn mentions(&self, needle: &str) -> bool {
        self.errors.iter().any(|(_, message)| message.contains(needle))
    }

    /// Whether a unique index or record id rejected a write.
    pub fn is_duplicate(&self) -> bool {
        self.mentions("already exists") || self.mentions("already contains")
    }

    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some((statement, message)) => Err(statement_error(statement, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(errors: &[(usize, &str)]) -> Outcome {
        Outcome {
            errors: errors
                .iter()
                .map(|(statement, message)| (*statement, message.to_string()))
                .collect(),
        }
    }

    #[test]
    fn empty_outcome_is_ok() {
        let outcome = Outcome::default();
        assert!(outcome.is_ok());
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn duplicate_detection() {
        let index = outcome(&[(
            2,
            "Database index `enrollment_pair` already contains ['u1', 'c1'], with record `enrollments:x`",
        )]);
        assert!(index.is_duplicate());

        let record = outcome(&[(0, "Database record `certificates:abc` already exists")]);
        assert!(record.is_duplicate());

        let other = outcome(&[(0, "There was a problem with the database")]);
        assert!(!other.is_duplicate());
    }

    #[test]
    fn first_error_is_reported() {
        let outcome = outcome(&[(1, "first"), (3, "second")]);
        let error = outcome.into_result().unwrap_err();
        assert!(error.to_string().contains("statement 1"));
        assert!(error.to_string().contains("first"));
    }
}
