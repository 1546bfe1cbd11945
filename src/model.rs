use chrono::Utc;

pub use certificate::*;
pub use course::*;
pub use enrollment::*;

mod certificate;
mod course;
mod enrollment;

pub type Timestamp = chrono::DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}

crate::define_id! {
    /// Opaque identity of an authenticated learner.
    LearnerId
}

crate::define_id! {
    CourseId
}

crate::define_id! {
    SectionId
}

crate::define_id! {
    LectureId
}

crate::define_id! {
    CategoryId
}
