use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A catalog course. The engine only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub status: PublicationStatus,
    pub category: Category,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: LectureId,
    pub title: String,
    #[serde(default)]
    pub duration_secs: u32,
    /// Reference to externally hosted video content.
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub is_preview: bool,
}

impl Course {
    pub fn is_published(&self) -> bool {
        self.status == PublicationStatus::Published
    }

    /// Lectures in playback order, across section boundaries.
    pub fn lectures(&self) -> impl Iterator<Item = &Lecture> {
        self.sections.iter().flat_map(|section| section.lectures.iter())
    }

    pub fn lecture_count(&self) -> usize {
        self.sections.iter().map(|section| section.lectures.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub status: PublicationStatus,
    pub category: Category,
    pub lecture_count: usize,
    pub enrollment_count: u64,
}

impl CourseSummary {
    pub fn of(course: &Course, enrollment_count: u64) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            status: course.status,
            category: course.category.clone(),
            lecture_count: course.lecture_count(),
            enrollment_count,
        }
    }
}
