use serde::{Deserialize, Serialize};

use super::*;

pub const COMPLETE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    /// Percent, `0..=100`.
    pub progress: u8,
    pub enrolled_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl Enrollment {
    pub fn new(learner_id: LearnerId, course_id: CourseId, enrolled_at: Timestamp) -> Self {
        Self {
            learner_id,
            course_id,
            progress: 0,
            enrolled_at,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Marks the enrollment finished. Returns `false` without touching anything when it already was.
    pub fn complete(&mut self, at: Timestamp) -> bool {
        if self.is_completed() {
            return false;
        }

        self.progress = COMPLETE;
        self.completed_at = Some(at);
        true
    }
}

/// An enrollment together with the course it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseSummary,
}
