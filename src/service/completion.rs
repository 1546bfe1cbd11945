use std::sync::Arc;

use derive_new::new;
use serde::Deserialize;
use snafu::{OptionExt as _, ResultExt as _};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::instrument;

use super::*;
use crate::model::{now, Certificate, CertificateNumber, Enrollment};
use crate::store::{Completion, Store};

pub const DEFAULT_CERTIFICATE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub enrollment: Enrollment,
    pub certificate: Certificate,
}

/// Why a single completion attempt did not go through.
#[derive(Debug)]
enum Attempt {
    /// The drawn certificate number belongs to another certificate, a new one may be drawn.
    NumberTaken,
    Failed(EngineError),
}

/// Finishes enrollments and issues their certificates.
#[derive(Clone, new)]
pub struct CompletionService {
    store: Arc<dyn Store>,
    /// How many certificate numbers are tried before giving up.
    #[new(value = "DEFAULT_CERTIFICATE_ATTEMPTS")]
    attempts: usize,
}

impl CompletionService {
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Completes the enrollment of `learner_id` in `course_id` and issues its certificate.
    ///
    /// This is a one-way transition: a second call fails with [EngineError::AlreadyCompleted] and changes nothing.
    /// When a generated certificate number is already taken, a new one is drawn and nothing from the failed
    /// attempt is kept.
    #[instrument(skip(self))]
    pub async fn complete_course(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<CompletedCourse> {
        require(course_id, "course_id")?;

        let retries = FixedInterval::from_millis(0).take(self.attempts.saturating_sub(1));
        let completed = RetryIf::spawn(
            retries,
            || self.attempt(learner_id, course_id),
            |failure: &Attempt| matches!(failure, Attempt::NumberTaken),
        )
        .await
        .map_err(|failure| match failure {
            Attempt::NumberTaken => CertificateNumberExhaustedSnafu {
                attempts: self.attempts,
            }
            .build(),
            Attempt::Failed(error) => error,
        })?;

        tracing::info!(
            number = %completed.certificate.number,
            completed_at = ?completed.enrollment.completed_at,
            "course completed and certificate issued"
        );
        Ok(completed)
    }

    async fn attempt(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<CompletedCourse, Attempt> {
        let certificate = Certificate::issue(learner_id.clone(), course_id.clone(), now());

        let completion = self
            .store
            .complete_enrollment(&certificate)
            .await
            .context(StoreSnafu)
            .map_err(Attempt::Failed)?;

        let failed = match completion {
            Completion::Completed(enrollment, certificate) => {
                return Ok(CompletedCourse {
                    enrollment,
                    certificate,
                })
            }
            Completion::NotEnrolled => EnrollmentNotFoundSnafu {
                learner_id: learner_id.clone(),
                course_id: course_id.clone(),
            }
            .build(),
            Completion::AlreadyCompleted => {
                tracing::debug!("course was already completed");
                AlreadyCompletedSnafu {
                    course_id: course_id.clone(),
                }
                .build()
            }
            Completion::NumberTaken => {
                tracing::warn!(number = %certificate.number, "certificate number already taken");
                return Err(Attempt::NumberTaken);
            }
        };

        Err(Attempt::Failed(failed))
    }

    #[instrument(skip(self))]
    pub async fn certificate(&self, number: &CertificateNumber) -> Result<Certificate> {
        self.store
            .certificate(number)
            .await
            .context(StoreSnafu)?
            .context(CertificateNotFoundSnafu {
                number: number.clone(),
            })
    }

    /// Certificates earned by `learner_id`, most recent first.
    #[instrument(skip(self))]
    pub async fn certificates(&self, learner_id: &LearnerId) -> Result<Vec<Certificate>> {
        self.store.certificates(learner_id).await.context(StoreSnafu)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::future::join_all;

    use super::*;
    use crate::store::{MemoryStore, StoreError};

    async fn enrolled(pairs: &[(&str, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        for (learner, course) in pairs {
            store
                .insert_enrollment(&Enrollment::new((*learner).into(), (*course).into(), now()))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn full_completion_then_replay() {
        let store = enrolled(&[("u1", "c1")]).await;
        let service = CompletionService::new(store.clone());

        let completed = service
            .complete_course(&"u1".into(), &"c1".into())
            .await
            .unwrap();
        assert_eq!(completed.enrollment.progress, 100);
        assert!(completed.enrollment.completed_at.is_some());
        assert!(completed.certificate.number.as_str().starts_with("CERT-"));

        let replay = service
            .complete_course(&"u1".into(), &"c1".into())
            .await
            .unwrap_err();
        assert_eq!(replay.kind(), ErrorKind::AlreadyCompleted);

        let enrollment = store
            .enrollment(&"u1".into(), &"c1".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.completed_at, completed.enrollment.completed_at);
        assert_eq!(service.certificates(&"u1".into()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completing_without_enrollment() {
        let store = enrolled(&[]).await;
        let service = CompletionService::new(store);

        let error = service
            .complete_course(&"u1".into(), &"c1".into())
            .await
            .unwrap_err();
        assert!(matches!(error, EngineError::EnrollmentNotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completion_issues_one_certificate() {
        let store = enrolled(&[("u1", "c1")]).await;
        let service = CompletionService::new(store.clone());

        let attempts = (0..16).map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.complete_course(&"u1".into(), &"c1".into()).await })
        });

        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|error| error.kind() == ErrorKind::AlreadyCompleted));
        assert_eq!(store.certificates(&"u1".into()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn certificate_numbers_are_unique() {
        let pairs: Vec<(String, String)> = (0..50)
            .map(|i| (format!("u{i}"), format!("c{}", i % 5)))
            .collect();
        let borrowed: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(learner, course)| (learner.as_str(), course.as_str()))
            .collect();

        let store = enrolled(&borrowed).await;
        let service = CompletionService::new(store);

        let mut numbers = HashSet::new();
        for (learner, course) in &borrowed {
            let completed = service
                .complete_course(&(*learner).into(), &(*course).into())
                .await
                .unwrap();
            assert!(numbers.insert(completed.certificate.number));
        }
        assert_eq!(numbers.len(), 50);
    }

    /// Claims every number is taken for the first `collisions` attempts.
    struct Colliding {
        inner: MemoryStore,
        collisions: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Store for Colliding {
        async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
            self.inner.insert_enrollment(enrollment).await
        }

        async fn enrollment(
            &self, learner_id: &LearnerId, course_id: &CourseId,
        ) -> Result<Option<Enrollment>, StoreError> {
            self.inner.enrollment(learner_id, course_id).await
        }

        async fn enrollments(&self, learner_id: &LearnerId) -> Result<Vec<Enrollment>, StoreError> {
            self.inner.enrollments(learner_id).await
        }

        async fn enrollment_count(&self, course_id: &CourseId) -> Result<u64, StoreError> {
            self.inner.enrollment_count(course_id).await
        }

        async fn complete_enrollment(
            &self, certificate: &Certificate,
        ) -> Result<Completion, StoreError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.collisions {
                return Ok(Completion::NumberTaken);
            }
            self.inner.complete_enrollment(certificate).await
        }

        async fn certificate(
            &self, number: &CertificateNumber,
        ) -> Result<Option<Certificate>, StoreError> {
            self.inner.certificate(number).await
        }

        async fn certificates(
            &self, learner_id: &LearnerId,
        ) -> Result<Vec<Certificate>, StoreError> {
            self.inner.certificates(learner_id).await
        }
    }

    async fn colliding(collisions: usize) -> Arc<Colliding> {
        let inner = MemoryStore::default();
        inner
            .insert_enrollment(&Enrollment::new("u1".into(), "c1".into(), now()))
            .await
            .unwrap();

        Arc::new(Colliding {
            inner,
            collisions,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn taken_numbers_are_redrawn() {
        let store = colliding(2).await;
        let service = CompletionService::new(store.clone()).with_attempts(3);

        let completed = service
            .complete_course(&"u1".into(), &"c1".into())
            .await
            .unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            store.certificate(&completed.certificate.number).await.unwrap(),
            Some(completed.certificate)
        );
    }

    #[tokio::test]
    async fn a_taken_number_fails_only_that_attempt() {
        let store = colliding(1).await;
        let service = CompletionService::new(store.clone()).with_attempts(3);

        let first = service.attempt(&"u1".into(), &"c1".into()).await.unwrap_err();
        assert!(matches!(first, Attempt::NumberTaken));

        let second = service.attempt(&"u1".into(), &"c1".into()).await.unwrap();
        assert!(second.enrollment.is_completed());

        let replay = service.attempt(&"u1".into(), &"c1".into()).await.unwrap_err();
        assert!(matches!(
            replay,
            Attempt::Failed(EngineError::AlreadyCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let store = colliding(10).await;
        let service = CompletionService::new(store.clone()).with_attempts(3);

        let error = service
            .complete_course(&"u1".into(), &"c1".into())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            EngineError::CertificateNumberExhausted { attempts: 3, .. }
        ));
        assert_eq!(error.kind(), ErrorKind::Store);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        let enrollment = store
            .enrollment(&"u1".into(), &"c1".into())
            .await
            .unwrap()
            .unwrap();
        assert!(!enrollment.is_completed());
    }
}
