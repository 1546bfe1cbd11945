use std::sync::Arc;

use dashmap::DashMap;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::instrument;

use super::*;
use crate::progression::{ProgressView, Progression};
use crate::store::{Catalog, Store};

type SessionKey = (LearnerId, CourseId);

/// Lesson progressions of the learners currently going through a course, one per `(learner, course)`.
///
/// Sessions are not persisted. Opening a session again starts over from the initial lock state.
///
/// Nothing expires a session: it stays in memory until [SessionManager::close] removes it, so the map holds at
/// most one progression per enrollment that was ever opened.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionKey, Progression>>,
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn Store>,
}

impl SessionManager {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn Store>) -> Self {
        Self {
            sessions: Arc::default(),
            catalog,
            store,
        }
    }

    /// Starts a fresh progression through `course_id`, replacing any session already open for it.
    #[instrument(skip(self))]
    pub async fn open(&self, learner_id: &LearnerId, course_id: &CourseId) -> Result<ProgressView> {
        require(course_id, "course_id")?;

        // both lookups finish before the session map is touched
        self.store
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

        let progression = Progression::new(&course);
        let view = progression.view();

        let key = (learner_id.clone(), course_id.clone());
        if self.sessions.insert(key, progression).is_some() {
            tracing::debug!("replaced an open session, lesson state starts over");
        }

        tracing::info!(lectures = view.total_lectures, "lesson session opened");
        Ok(view)
    }

    pub fn view(&self, learner_id: &LearnerId, course_id: &CourseId) -> Result<ProgressView> {
        self.with_session(learner_id, course_id, |progression| Ok(progression.view()))
    }

    #[instrument(skip(self))]
    pub fn select(
        &self, learner_id: &LearnerId, course_id: &CourseId, lecture_id: &LectureId,
    ) -> Result<ProgressView> {
        require(lecture_id, "lecture_id")?;

        self.with_session(learner_id, course_id, |progression| {
            progression
                .select(lecture_id)
                .map_err(|error| EngineError::from_progression(course_id, error))?;
            Ok(progression.view())
        })
    }

    #[instrument(skip(self))]
    pub fn complete(
        &self, learner_id: &LearnerId, course_id: &CourseId, lecture_id: &LectureId,
    ) -> Result<ProgressView> {
        require(lecture_id, "lecture_id")?;

        self.with_session(learner_id, course_id, |progression| {
            let unlocked = progression
                .complete(lecture_id)
                .map_err(|error| EngineError::from_progression(course_id, error))?;

            match unlocked {
                Some(next) => tracing::info!(unlocked = %next, "lecture completed"),
                None => tracing::info!("lecture completed"),
            }

            Ok(progression.view())
        })
    }

    pub fn close(&self, learner_id: &LearnerId, course_id: &CourseId) -> bool {
        let key = (learner_id.clone(), course_id.clone());
        self.sessions.remove(&key).is_some()
    }

    fn with_session<T>(
        &self, learner_id: &LearnerId, course_id: &CourseId,
        f: impl FnOnce(&mut Progression) -> Result<T>,
    ) -> Result<T> {
        let key = (learner_id.clone(), course_id.clone());
        let mut session = self.sessions.get_mut(&key).context(SessionNotFoundSnafu {
            course_id: course_id.clone(),
        })?;

        f(&mut session)
    }
}
