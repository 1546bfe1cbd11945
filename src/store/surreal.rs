use async_trait::async_trait;

use super::*;
use crate::define_query;

// markers thrown by COMPLETE_ENROLLMENT
const NOT_ENROLLED: &str = "learnpath:enrollment-not-found";
const ALREADY_COMPLETED: &str = "learnpath:enrollment-already-completed";

const COMPLETE_ENROLLMENT: &str = r#"
BEGIN TRANSACTION;
LET $found = (SELECT * FROM enrollments WHERE learner_id = $learner_id AND course_id = $course_id);
IF array::len($found) = 0 { THROW "learnpath:enrollment-not-found" };
IF $found[0].completed_at { THROW "learnpath:enrollment-already-completed" };
UPDATE enrollments SET progress = 100, completed_at = $issued_at
    WHERE learner_id = $learner_id AND course_id = $course_id AND !completed_at;
CREATE certificates CONTENT $certificate;
COMMIT TRANSACTION;
"#;

/// Catalog courses carry their id in `course_id`, `id` being the record id.
#[derive(Debug, Serialize, Deserialize)]
struct CourseDocument {
    course_id: CourseId,
    title: String,
    status: PublicationStatus,
    category: Category,
    #[serde(default)]
    sections: Vec<Section>,
}

impl From<CourseDocument> for Course {
    fn from(document: CourseDocument) -> Self {
        Course {
            id: document.course_id,
            title: document.title,
            status: document.status,
            category: document.category,
            sections: document.sections,
        }
    }
}

impl From<Course> for CourseDocument {
    fn from(course: Course) -> Self {
        CourseDocument {
            course_id: course.id,
            title: course.title,
            status: course.status,
            category: course.category,
            sections: course.sections,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Count {
    count: u64,
}

define_query! {
    course_by_id(course_id: &CourseId) -> Option<CourseDocument>
        where "SELECT * FROM courses WHERE course_id = $course_id LIMIT 1"
}

define_query! {
    enrollment_of(learner_id: &LearnerId, course_id: &CourseId) -> Option<Enrollment>
        where "SELECT * FROM enrollments WHERE learner_id = $learner_id AND course_id = $course_id LIMIT 1"
}

define_query! {
    enrollments_of(learner_id: &LearnerId) -> Vec<Enrollment>
        where "SELECT * FROM enrollments WHERE learner_id = $learner_id"
}

define_query! {
    enrollments_in(course_id: &CourseId) -> Option<Count>
        where "SELECT count() FROM enrollments WHERE course_id = $course_id GROUP ALL"
}

define_query! {
    certificate_by_number(number: &CertificateNumber) -> Option<Certificate>
        where "SELECT * FROM certificates WHERE number = $number LIMIT 1"
}

define_query! {
    certificates_of(learner_id: &LearnerId) -> Vec<Certificate>
        where "SELECT * FROM certificates WHERE learner_id = $learner_id"
}

/// Store backed by SurrealDB.
///
/// The unique indexes of `schema.surrealql` are the authoritative guards; completion runs as a single
/// transaction that either marks the enrollment and creates the certificate, or changes nothing.
#[derive(Debug, Clone, new)]
pub struct SurrealStore {
    db: Database,
}

impl SurrealStore {
    pub async fn put_course(&self, course: Course) -> Result<(), StoreError> {
        let document = CourseDocument::from(course);

        self.db
            .sql("DELETE courses WHERE course_id = $course_id; CREATE courses CONTENT $course;")
            .bind(("course_id", &document.course_id))
            .bind(("course", &document))
            .outcome()
            .await
            .context(DatabaseSnafu)?
            .into_result()
            .context(DatabaseSnafu)
    }
}

#[async_trait]
impl Catalog for SurrealStore {
    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        let document = course_by_id(&self.db, id).await.context(DatabaseSnafu)?;
        Ok(document.map(Course::from))
    }
}

#[async_trait]
impl Store for SurrealStore {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let outcome = self
            .db
            .sql("CREATE enrollments CONTENT $enrollment")
            .bind(("enrollment", enrollment))
            .outcome()
            .await
            .context(DatabaseSnafu)?;

        if outcome.is_duplicate() {
            return DuplicateSnafu {
                what: format!(
                    "enrollment of `{}` in `{}`",
                    enrollment.learner_id, enrollment.course_id
                ),
            }
            .fail();
        }

        outcome.into_result().context(DatabaseSnafu)
    }

    async fn enrollment(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StoreError> {
        enrollment_of(&self.db, learner_id, course_id)
            .await
            .context(DatabaseSnafu)
    }

    async fn enrollments(&self, learner_id: &LearnerId) -> Result<Vec<Enrollment>, StoreError> {
        let mut enrollments = enrollments_of(&self.db, learner_id)
            .await
            .context(DatabaseSnafu)?;

        // timestamps are stored as strings, which do not sort chronologically
        newest_enrollments_first(&mut enrollments);
        Ok(enrollments)
    }

    async fn enrollment_count(&self, course_id: &CourseId) -> Result<u64, StoreError> {
        let count = enrollments_in(&self.db, course_id)
            .await
            .context(DatabaseSnafu)?;

        Ok(count.map_or(0, |Count { count }| count))
    }

    #[tracing::instrument(skip(self), fields(number = %certificate.number))]
    async fn complete_enrollment(&self, certificate: &Certificate) -> Result<Completion, StoreError> {
        let outcome = self
            .db
            .sql(COMPLETE_ENROLLMENT)
            .bind(("learner_id", &certificate.learner_id))
            .bind(("course_id", &certificate.course_id))
            .bind(("issued_at", certificate.issued_at))
            .bind(("certificate", certificate))
            .outcome()
            .await
            .context(DatabaseSnafu)?;

        if outcome.mentions(NOT_ENROLLED) {
            return Ok(Completion::NotEnrolled);
        }

        if outcome.mentions(ALREADY_COMPLETED) {
            return Ok(Completion::AlreadyCompleted);
        }

        if outcome.is_duplicate() {
            // a certificate already exists for this pair only if another completion won the race
            if self.certificate_for(certificate).await?.is_some() {
                return Ok(Completion::AlreadyCompleted);
            }

            return Ok(Completion::NumberTaken);
        }

        outcome.into_result().context(DatabaseSnafu)?;

        let enrollment = enrollment_of(&self.db, &certificate.learner_id, &certificate.course_id)
            .await
            .context(DatabaseSnafu)?
            .ok_or_else(|| {
                crate::database::statement_error(0, "completed enrollment disappeared")
            })
            .context(DatabaseSnafu)?;

        Ok(Completion::Completed(enrollment, certificate.clone()))
    }

    async fn certificate(
        &self, number: &CertificateNumber,
    ) -> Result<Option<Certificate>, StoreError> {
        certificate_by_number(&self.db, number)
            .await
            .context(DatabaseSnafu)
    }

    async fn certificates(&self, learner_id: &LearnerId) -> Result<Vec<Certificate>, StoreError> {
        let mut certificates = certificates_of(&self.db, learner_id)
            .await
            .context(DatabaseSnafu)?;

        newest_certificates_first(&mut certificates);
        Ok(certificates)
    }
}

impl SurrealStore {
    async fn certificate_for(&self, certificate: &Certificate) -> Result<Option<Certificate>, StoreError> {
        self.db
            .sql("SELECT * FROM certificates WHERE learner_id = $learner_id AND course_id = $course_id LIMIT 1")
            .bind(("learner_id", &certificate.learner_id))
            .bind(("course_id", &certificate.course_id))
            .fetch_first()
            .await
            .context(DatabaseSnafu)
    }
}
