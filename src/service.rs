use serde::Serialize;
use snafu::{Location, Snafu};

use crate::model::{CertificateNumber, CourseId, LearnerId, LectureId};
use crate::progression::ProgressionError;
use crate::store::StoreError;
use crate::Located;

pub use completion::*;
pub use enrollment::*;
pub use session::*;

mod completion;
mod enrollment;
mod session;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Snafu, Serialize)]
#[snafu(visibility(pub(crate)))]
#[serde(tag = "error", content = "data")]
pub enum EngineError {
    #[snafu(display("invalid request: {message}"))]
    InvalidRequest { message: String },

    #[snafu(display("course `{course_id}` does not exist or is not published"))]
    CourseNotFound { course_id: CourseId },

    #[snafu(display("`{learner_id}` is not enrolled in `{course_id}`"))]
    EnrollmentNotFound {
        learner_id: LearnerId,
        course_id: CourseId,
    },

    #[snafu(display("certificate `{number}` does not exist"))]
    CertificateNotFound { number: CertificateNumber },

    #[snafu(display("no open session for `{course_id}`"))]
    SessionNotFound { course_id: CourseId },

    #[snafu(display("lecture `{lecture_id}` is not part of `{course_id}`"))]
    LectureNotFound {
        course_id: CourseId,
        lecture_id: LectureId,
    },

    #[snafu(display("already enrolled in `{course_id}`"))]
    AlreadyEnrolled { course_id: CourseId },

    #[snafu(display("course `{course_id}` is already completed"))]
    AlreadyCompleted { course_id: CourseId },

    #[snafu(display("lecture `{lecture_id}` is locked"))]
    LessonLocked { lecture_id: LectureId },

    #[snafu(display("could not find a free certificate number after {attempts} attempts"))]
    CertificateNumberExhausted {
        attempts: usize,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("store failure: {source}"))]
    Store {
        #[serde(skip)]
        source: StoreError,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },
}

/// How a caller should treat an [EngineError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Conflict,
    AlreadyCompleted,
    LessonLocked,
    /// Unexpected persistence failure, the details stay on the server.
    Store,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            EngineError::CourseNotFound { .. }
            | EngineError::EnrollmentNotFound { .. }
            | EngineError::CertificateNotFound { .. }
            | EngineError::SessionNotFound { .. }
            | EngineError::LectureNotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyEnrolled { .. } => ErrorKind::Conflict,
            EngineError::AlreadyCompleted { .. } => ErrorKind::AlreadyCompleted,
            EngineError::LessonLocked { .. } => ErrorKind::LessonLocked,
            EngineError::CertificateNumberExhausted { .. } | EngineError::Store { .. } => {
                ErrorKind::Store
            }
        }
    }

    pub fn from_progression(course_id: &CourseId, error: ProgressionError) -> Self {
        match error {
            ProgressionError::LessonLocked { lecture_id } => EngineError::LessonLocked { lecture_id },
            ProgressionError::UnknownLecture { lecture_id } => EngineError::LectureNotFound {
                course_id: course_id.clone(),
                lecture_id,
            },
        }
    }

    /// Where a server-side fault originated. Expected domain outcomes carry no location.
    pub fn location(&self) -> Option<Location> {
        match self {
            EngineError::Store { source, .. } => Some(source.location()),
            EngineError::CertificateNumberExhausted { location, .. } => Some(*location),
            _ => None,
        }
    }
}

fn require(id: &impl AsRef<str>, field: &str) -> Result<()> {
    if id.as_ref().trim().is_empty() {
        return InvalidRequestSnafu {
            message: format!("`{field}` must not be empty"),
        }
        .fail();
    }

    Ok(())
}
