use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::*;

type Pair = (LearnerId, CourseId);

/// In-process store backed by [DashMap]s.
///
/// The entry API of the enrollment map is the uniqueness guard; completion holds the enrollment's entry while it
/// inserts the certificate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    courses: DashMap<CourseId, Course>,
    enrollments: DashMap<Pair, Enrollment>,
    certificates: DashMap<CertificateNumber, Certificate>,
}

impl MemoryStore {
    pub fn put_course(&self, course: Course) {
        self.courses.insert(course.id.clone(), course);
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.courses.get(id).map(|course| course.clone()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let key = (enrollment.learner_id.clone(), enrollment.course_id.clone());

        match self.enrollments.entry(key) {
            Entry::Occupied(_) => DuplicateSnafu {
                what: format!(
                    "enrollment of `{}` in `{}`",
                    enrollment.learner_id, enrollment.course_id
                ),
            }
            .fail(),
            Entry::Vacant(slot) => {
                slot.insert(enrollment.clone());
                Ok(())
            }
        }
    }

    async fn enrollment(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let key = (learner_id.clone(), course_id.clone());
        Ok(self.enrollments.get(&key).map(|enrollment| enrollment.clone()))
    }

    async fn enrollments(&self, learner_id: &LearnerId) -> Result<Vec<Enrollment>, StoreError> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .iter()
            .filter(|entry| &entry.key().0 == learner_id)
            .map(|entry| entry.value().clone())
            .collect();

        newest_enrollments_first(&mut enrollments);
        Ok(enrollments)
    }

    async fn enrollment_count(&self, course_id: &CourseId) -> Result<u64, StoreError> {
        let count = self
            .enrollments
            .iter()
            .filter(|entry| &entry.key().1 == course_id)
            .count();

        Ok(count as u64)
    }

    async fn complete_enrollment(&self, certificate: &Certificate) -> Result<Completion, StoreError> {
        let key = (certificate.learner_id.clone(), certificate.course_id.clone());

        let Some(mut enrollment) = self.enrollments.get_mut(&key) else {
            return Ok(Completion::NotEnrolled);
        };

        if enrollment.is_completed() {
            return Ok(Completion::AlreadyCompleted);
        }

        // the enrollment guard is held until both writes are done
        match self.certificates.entry(certificate.number.clone()) {
            Entry::Occupied(_) => Ok(Completion::NumberTaken),
            Entry::Vacant(slot) => {
                slot.insert(certificate.clone());
                enrollment.complete(certificate.issued_at);
                Ok(Completion::Completed(enrollment.clone(), certificate.clone()))
            }
        }
    }

    async fn certificate(
        &self, number: &CertificateNumber,
    ) -> Result<Option<Certificate>, StoreError> {
        Ok(self.certificates.get(number).map(|certificate| certificate.clone()))
    }

    async fn certificates(&self, learner_id: &LearnerId) -> Result<Vec<Certificate>, StoreError> {
        let mut certificates: Vec<Certificate> = self
            .certificates
            .iter()
            .filter(|entry| &entry.value().learner_id == learner_id)
            .map(|entry| entry.value().clone())
            .collect();

        newest_certificates_first(&mut certificates);
        Ok(certificates)
    }
}
