/// Defines an async function that runs a single SurrealQL statement.
///
/// # Syntax
/// ```text
/// name(...arguments) -> [Output Type] where "sql query"
/// ```
/// Every argument is bound under its own name, so the query refers to it as `$argument`.
///
/// # Example
///
/// ```ignore
/// define_query! {
///     certificates_of(learner_id: &LearnerId) -> Vec<Certificate>
///         where "SELECT * FROM certificates WHERE learner_id = $learner_id"
/// }
///
/// let certificates = certificates_of(&db, &learner_id).await?;
/// ```
#[macro_export]
macro_rules! define_query {
    ($vis:vis $name:ident ($($binding:ident : $binding_type:ty),*) -> $export:ty where $query:literal) => {
        #[tracing::instrument(skip(db))]
        $vis async fn $name(db: &$crate::database::Database, $($binding : $binding_type),*) -> ::std::result::Result<$export, $crate::database::DatabaseError> {
            db.sql($query)
                $(.bind((stringify!($binding), $binding)))*
                .fetch_first()
                .await
        }
    };
}
