//! Persistence for enrollments and certificates, plus read access to the course catalog.
//!
//! Both implementations enforce the same constraints: one enrollment per `(learner, course)`, one certificate
//! per completed enrollment, and globally unique certificate numbers. Completing an enrollment and inserting
//! its certificate happen as one unit.

use async_trait::async_trait;

use crate::prelude::*;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

mod memory;
mod surreal;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("database failure: {source}"))]
    Database {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{what} already exists"))]
    Duplicate {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for StoreError {
    fn location(&self) -> Location {
        match self {
            StoreError::Database { source, .. } => source.location(),
            StoreError::Duplicate { location, .. } => *location,
        }
    }
}

/// Result of trying to complete an enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The enrollment was finished and the certificate stored.
    Completed(Enrollment, Certificate),
    NotEnrolled,
    AlreadyCompleted,
    /// The certificate number belongs to another certificate; nothing was written.
    NumberTaken,
}

/// Read access to the course catalog.
#[async_trait]
pub trait Catalog: Send + Sync + 'static {
    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Inserts a new enrollment, failing with [StoreError::Duplicate] when the pair is already enrolled.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError>;

    async fn enrollment(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// All enrollments of a learner, most recent first.
    async fn enrollments(&self, learner_id: &LearnerId) -> Result<Vec<Enrollment>, StoreError>;

    async fn enrollment_count(&self, course_id: &CourseId) -> Result<u64, StoreError>;

    /// Marks the enrollment completed at `certificate.issued_at` and stores `certificate`, atomically.
    async fn complete_enrollment(&self, certificate: &Certificate) -> Result<Completion, StoreError>;

    async fn certificate(
        &self, number: &CertificateNumber,
    ) -> Result<Option<Certificate>, StoreError>;

    /// All certificates of a learner, most recent first.
    async fn certificates(&self, learner_id: &LearnerId) -> Result<Vec<Certificate>, StoreError>;
}

fn newest_enrollments_first(enrollments: &mut [Enrollment]) {
    enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
}

fn newest_certificates_first(certificates: &mut [Certificate]) {
    certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
}
