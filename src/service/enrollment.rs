use std::sync::Arc;

use derive_new::new;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::instrument;

use super::*;
use crate::model::{now, Course, CourseSummary, EnrolledCourse, Enrollment};
use crate::store::{Catalog, Store, StoreError};

/// Creates and reads enrollments.
#[derive(Clone, new)]
pub struct EnrollmentService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn Store>,
}

impl EnrollmentService {
    /// Enrolls `learner_id` in a published course.
    ///
    /// The store's unique `(learner, course)` constraint is what settles concurrent requests: the losing request
    /// gets [EngineError::AlreadyEnrolled] just like a sequential retry would.
    #[instrument(skip(self))]
    pub async fn enroll(&self, learner_id: &LearnerId, course_id: &CourseId) -> Result<Enrollment> {
        require(learner_id, "learner_id")?;
        require(course_id, "course_id")?;

        self.published_course(course_id).await?;

        if self
            .store
            .enrollment(learner_id, course_id)
            .await
            .context(StoreSnafu)?
            .is_some()
        {
            tracing::debug!("learner is already enrolled");
            return AlreadyEnrolledSnafu {
                course_id: course_id.clone(),
            }
            .fail();
        }

        let enrollment = Enrollment::new(learner_id.clone(), course_id.clone(), now());

        match self.store.insert_enrollment(&enrollment).await {
            Ok(()) => {
                tracing::info!(enrolled_at = %enrollment.enrolled_at, "learner enrolled");
                Ok(enrollment)
            }
            Err(StoreError::Duplicate { .. }) => {
                tracing::debug!("lost an enrollment race");
                AlreadyEnrolledSnafu {
                    course_id: course_id.clone(),
                }
                .fail()
            }
            Err(source) => Err(source).context(StoreSnafu),
        }
    }

    #[instrument(skip(self))]
    pub async fn enrollment(
        &self, learner_id: &LearnerId, course_id: &CourseId,
    ) -> Result<EnrolledCourse> {
        require(course_id, "course_id")?;

        let enrollment = self
            .store
            .enrollment(learner_id, course_id)
            .await
            .context(StoreSnafu)?
            .context(EnrollmentNotFoundSnafu {
                learner_id: learner_id.clone(),
                course_id: course_id.clone(),
            })?;

        let course = self
            .catalog
            .course(course_id)
            .await
            .context(StoreSnafu)?
            .context(CourseNotFoundSnafu {
                course_id: course_id.clone(),
            })?;

        self.with_course(enrollment, &course).await
    }

    /// Every enrollment of `learner_id`, most recent first.
    ///
    /// Enrollments whose course is gone from the catalog are left out.
    #[instrument(skip(self))]
    pub async fn enrollments(&self, learner_id: &LearnerId) -> Result<Vec<EnrolledCourse>> {
        let enrollments = self.store.enrollments(learner_id).await.context(StoreSnafu)?;

        let mut enrolled = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let Some(course) = self
                .catalog
                .course(&enrollment.course_id)
                .await
                .context(StoreSnafu)?
            else {
                tracing::warn!(course_id = %enrollment.course_id, "enrolled course is missing from the catalog");
                continue;
            };

            enrolled.push(self.with_course(enrollment, &course).await?);
        }

        Ok(enrolled)
    }

    async fn published_course(&self, course_id: &CourseId) -> Result<Course> {
        let course = self
            .catalog
            .course(course_id)
            .await
            .context(StoreSnafu)?
            .filter(Course::is_published);

        course.context(CourseNotFoundSnafu {
            course_id: course_id.clone(),
        })
    }

    async fn with_course(&self, enrollment: Enrollment, course: &Course) -> Result<EnrolledCourse> {
        let count = self
            .store
            .enrollment_count(&course.id)
            .await
            .context(StoreSnafu)?;

        Ok(EnrolledCourse {
            enrollment,
            course: CourseSummary::of(course, count),
        })
    }
}
