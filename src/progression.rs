//! Lesson lock state for one learner going through one course.
//!
//! Lectures are ordered by section, then by position inside the section. That flattened order drives every rule:
//! a fresh progression has the first lecture completed and the second one unlocked, everything else locked, and
//! completing a lecture unlocks the one right after it, across section boundaries.
//!
//! The state is rebuilt from the course structure every time a progression is created; nothing is read back from
//! earlier sessions.

use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt as _, Snafu};

use crate::model::{Course, Lecture, LectureId, SectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonState {
    Locked,
    Unlocked,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProgressionError {
    #[snafu(display("lecture `{lecture_id}` is locked"))]
    LessonLocked { lecture_id: LectureId },

    #[snafu(display("lecture `{lecture_id}` is not part of this course"))]
    UnknownLecture { lecture_id: LectureId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Lesson {
    section: usize,
    lecture: Lecture,
    state: LessonState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SectionInfo {
    id: SectionId,
    title: String,
    expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    sections: Vec<SectionInfo>,
    /// Every lecture of the course in flattened order.
    lessons: Vec<Lesson>,
    active: Option<usize>,
}

impl Progression {
    pub fn new(course: &Course) -> Self {
        let sections = course
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| SectionInfo {
                id: section.id.clone(),
                title: section.title.clone(),
                expanded: index == 0,
            })
            .collect();

        let lessons = course
            .sections
            .iter()
            .enumerate()
            .flat_map(|(section, s)| s.lectures.iter().map(move |lecture| (section, lecture)))
            .enumerate()
            .map(|(position, (section, lecture))| Lesson {
                section,
                lecture: lecture.clone(),
                state: seed_state(position),
            })
            .collect::<Vec<_>>();

        let active = (!lessons.is_empty()).then_some(0);

        Self {
            sections,
            lessons,
            active,
        }
    }

    fn position(&self, lecture_id: &LectureId) -> Result<usize, ProgressionError> {
        self.lessons
            .iter()
            .position(|lesson| &lesson.lecture.id == lecture_id)
            .context(UnknownLectureSnafu {
                lecture_id: lecture_id.clone(),
            })
    }

    pub fn state(&self, lecture_id: &LectureId) -> Result<LessonState, ProgressionError> {
        let position = self.position(lecture_id)?;
        Ok(self.lessons[position].state)
    }

    pub fn active(&self) -> Option<&LectureId> {
        self.active.map(|position| &self.lessons[position].lecture.id)
    }

    /// Makes `lecture_id` the lecture being played. Locked lectures are refused and the active lecture stays.
    pub fn select(&mut self, lecture_id: &LectureId) -> Result<(), ProgressionError> {
        let position = self.position(lecture_id)?;

        ensure!(
            self.lessons[position].state != LessonState::Locked,
            LessonLockedSnafu {
                lecture_id: lecture_id.clone()
            }
        );

        self.active = Some(position);
        Ok(())
    }

    /// Completes `lecture_id` and unlocks the lecture right after it.
    ///
    /// Completing a lecture twice is a no-op. The active lecture does not move.
    pub fn complete(&mut self, lecture_id: &LectureId) -> Result<Option<&LectureId>, ProgressionError> {
        let position = self.position(lecture_id)?;
        self.lessons[position].state = LessonState::Completed;

        let Some(next) = self.lessons.get_mut(position + 1) else {
            return Ok(None);
        };

        if next.state != LessonState::Locked {
            return Ok(None);
        }

        next.state = LessonState::Unlocked;
        Ok(Some(&next.lecture.id))
    }

    pub fn completed_count(&self) -> usize {
        self.lessons
            .iter()
            .filter(|lesson| lesson.state == LessonState::Completed)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.lessons.len()
    }

    /// Whether every lecture is completed. A course without lectures never is.
    pub fn all_completed(&self) -> bool {
        !self.lessons.is_empty() && self.completed_count() == self.lessons.len()
    }

    pub fn view(&self) -> ProgressView {
        let mut sections: Vec<SectionView> = self
            .sections
            .iter()
            .map(|section| SectionView {
                id: section.id.clone(),
                title: section.title.clone(),
                expanded: section.expanded,
                lectures: Vec::new(),
            })
            .collect();

        for lesson in &self.lessons {
            sections[lesson.section].lectures.push(LectureView {
                id: lesson.lecture.id.clone(),
                title: lesson.lecture.title.clone(),
                duration_secs: lesson.lecture.duration_secs,
                video: lesson.lecture.video.clone(),
                is_preview: lesson.lecture.is_preview,
                is_completed: lesson.state == LessonState::Completed,
                is_locked: lesson.state == LessonState::Locked,
            });
        }

        ProgressView {
            sections,
            active_lecture: self.active().cloned(),
            completed_lectures: self.completed_count(),
            total_lectures: self.total_count(),
            all_completed: self.all_completed(),
        }
    }
}

fn seed_state(position: usize) -> LessonState {
    match position {
        0 => LessonState::Completed,
        1 => LessonState::Unlocked,
        _ => LessonState::Locked,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub sections: Vec<SectionView>,
    pub active_lecture: Option<LectureId>,
    pub completed_lectures: usize,
    pub total_lectures: usize,
    pub all_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionView {
    pub id: SectionId,
    pub title: String,
    pub expanded: bool,
    pub lectures: Vec<LectureView>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureView {
    pub id: LectureId,
    pub title: String,
    pub duration_secs: u32,
    pub video: Option<String>,
    pub is_preview: bool,
    pub is_completed: bool,
    pub is_locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, PublicationStatus, Section};

    use LessonState::*;

    fn lecture(id: &str) -> Lecture {
        Lecture {
            id: id.into(),
            title: id.to_uppercase(),
            duration_secs: 60,
            video: Some(format!("https://videos.example/{id}")),
            is_preview: id == "a",
        }
    }

    fn course(sections: &[&[&str]]) -> Course {
        Course {
            id: "c1".into(),
            title: "Course".into(),
            status: PublicationStatus::Published,
            category: Category {
                id: "cat".into(),
                name: "Category".into(),
            },
            sections: sections
                .iter()
                .enumerate()
                .map(|(index, lectures)| Section {
                    id: format!("s{index}").into(),
                    title: format!("Section {index}"),
                    lectures: lectures.iter().map(|id| lecture(id)).collect(),
                })
                .collect(),
        }
    }

    fn states(progression: &Progression, ids: &[&str]) -> Vec<LessonState> {
        ids.iter()
            .map(|id| progression.state(&(*id).into()).unwrap())
            .collect()
    }

    #[test]
    fn seed_rule() {
        let progression = Progression::new(&course(&[&["a", "b"], &["c", "d"]]));

        assert_eq!(
            states(&progression, &["a", "b", "c", "d"]),
            vec![Completed, Unlocked, Locked, Locked]
        );
        assert_eq!(progression.active(), Some(&"a".into()));

        let view = progression.view();
        assert!(view.sections[0].expanded);
        assert!(!view.sections[1].expanded);
        assert_eq!(view.completed_lectures, 1);
        assert_eq!(view.total_lectures, 4);
    }

    #[test]
    fn completing_unlocks_only_the_next_lecture() {
        let mut progression = Progression::new(&course(&[&["a", "b", "c", "d"]]));

        let unlocked = progression.complete(&"b".into()).unwrap().cloned();
        assert_eq!(unlocked, Some("c".into()));
        assert_eq!(
            states(&progression, &["a", "b", "c", "d"]),
            vec![Completed, Completed, Unlocked, Locked]
        );

        let rejected = progression.select(&"d".into());
        assert_eq!(
            rejected,
            Err(ProgressionError::LessonLocked {
                lecture_id: "d".into()
            })
        );
        assert_eq!(progression.active(), Some(&"a".into()), "active lecture must not move");

        progression.complete(&"c".into()).unwrap();
        progression.select(&"d".into()).unwrap();
        assert_eq!(progression.active(), Some(&"d".into()));
    }

    #[test]
    fn unlocking_crosses_sections() {
        let mut progression = Progression::new(&course(&[&["a", "b"], &["c"]]));

        progression.complete(&"b".into()).unwrap();
        assert_eq!(progression.state(&"c".into()).unwrap(), Unlocked);
    }

    #[test]
    fn completing_twice_is_a_no_op() {
        let mut progression = Progression::new(&course(&[&["a", "b", "c"]]));

        progression.complete(&"b".into()).unwrap();
        let before = progression.clone();

        let unlocked = progression.complete(&"b".into()).unwrap();
        assert_eq!(unlocked, None);
        assert_eq!(progression, before);
    }

    #[test]
    fn completing_does_not_change_the_active_lecture() {
        let mut progression = Progression::new(&course(&[&["a", "b", "c"]]));
        progression.select(&"b".into()).unwrap();

        progression.complete(&"b".into()).unwrap();
        assert_eq!(progression.active(), Some(&"b".into()));
    }

    #[test]
    fn last_lecture_has_nothing_to_unlock() {
        let mut progression = Progression::new(&course(&[&["a", "b"]]));

        assert_eq!(progression.complete(&"b".into()).unwrap(), None);
        assert!(progression.all_completed());
        assert!(progression.view().all_completed);
    }

    #[test]
    fn unknown_lecture_is_reported() {
        let mut progression = Progression::new(&course(&[&["a"]]));

        assert_eq!(
            progression.select(&"zzz".into()),
            Err(ProgressionError::UnknownLecture {
                lecture_id: "zzz".into()
            })
        );
        assert!(progression.complete(&"zzz".into()).is_err());
    }

    #[test]
    fn empty_course() {
        let progression = Progression::new(&course(&[]));

        assert_eq!(progression.active(), None);
        assert!(!progression.all_completed());
        assert!(progression.view().sections.is_empty());
    }

    #[test]
    fn view_groups_lectures_by_section() {
        let progression = Progression::new(&course(&[&["a", "b"], &["c"]]));
        let view = progression.view();

        let ids: Vec<Vec<&str>> = view
            .sections
            .iter()
            .map(|section| section.lectures.iter().map(|l| l.id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["a", "b"], vec!["c"]]);

        let first = &view.sections[0].lectures[0];
        assert!(first.is_completed && !first.is_locked && first.is_preview);
        assert!(view.sections[1].lectures[0].is_locked);
    }
}
