//! HTTP surface of the engine. Every route except certificate verification acts for the [Learner] named by the
//! bearer token.

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Learner;
use crate::model::{CourseId, LectureId};

pub use error::*;
pub use state::*;

mod error;
mod state;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

pub fn router(app: App) -> Router {
    Router::new()
        .route("/enrollments", post(enrollment::enroll).get(enrollment::list))
        .route("/enrollments/:course_id", get(enrollment::info))
        .route("/enrollments/:course_id/complete", post(certificate::complete))
        .route("/certificates", get(certificate::list))
        .route("/certificates/:number", get(certificate::verify))
        .route(
            "/courses/:course_id/session",
            post(session::open).get(session::view).delete(session::close),
        )
        .route("/courses/:course_id/session/select", post(session::select))
        .route("/courses/:course_id/session/complete", post(session::complete))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app)
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub course_id: CourseId,
}

#[derive(Debug, Deserialize)]
pub struct LectureRequest {
    #[serde(default)]
    pub lecture_id: LectureId,
}

pub mod enrollment {
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;
    use tracing::instrument;

    use super::*;
    use crate::model::{EnrolledCourse, Enrollment};

    #[instrument(skip(app))]
    pub async fn enroll(
        State(app): State<App>, Learner(learner_id): Learner, Json(request): Json<EnrollRequest>,
    ) -> Result<(StatusCode, Json<Enrollment>)> {
        let enrollment = app.enrollments.enroll(&learner_id, &request.course_id).await?;
        Ok((StatusCode::CREATED, Json(enrollment)))
    }

    #[instrument(skip(app))]
    pub async fn info(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
    ) -> Result<Json<EnrolledCourse>> {
        let enrolled = app.enrollments.enrollment(&learner_id, &course_id).await?;
        Ok(Json(enrolled))
    }

    #[instrument(skip(app))]
    pub async fn list(
        State(app): State<App>, Learner(learner_id): Learner,
    ) -> Result<Json<Vec<EnrolledCourse>>> {
        let enrolled = app.enrollments.enrollments(&learner_id).await?;
        Ok(Json(enrolled))
    }
}

pub mod certificate {
    use axum::extract::{Path, State};
    use axum::Json;
    use tracing::instrument;

    use super::*;
    use crate::model::{Certificate, CertificateNumber};
    use crate::service::CompletedCourse;

    #[instrument(skip(app))]
    pub async fn complete(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
    ) -> Result<Json<CompletedCourse>> {
        let completed = app.completions.complete_course(&learner_id, &course_id).await?;
        Ok(Json(completed))
    }

    #[instrument(skip(app))]
    pub async fn list(
        State(app): State<App>, Learner(learner_id): Learner,
    ) -> Result<Json<Vec<Certificate>>> {
        let certificates = app.completions.certificates(&learner_id).await?;
        Ok(Json(certificates))
    }

    /// Public lookup so third parties can check a certificate number.
    #[instrument(skip(app))]
    pub async fn verify(
        State(app): State<App>, Path(number): Path<CertificateNumber>,
    ) -> Result<Json<Certificate>> {
        let certificate = app.completions.certificate(&number).await?;
        Ok(Json(certificate))
    }
}

pub mod session {
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;
    use tracing::instrument;

    use super::*;
    use crate::progression::ProgressView;

    #[instrument(skip(app))]
    pub async fn open(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
    ) -> Result<Json<ProgressView>> {
        let view = app.sessions.open(&learner_id, &course_id).await?;
        Ok(Json(view))
    }

    #[instrument(skip(app))]
    pub async fn view(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
    ) -> Result<Json<ProgressView>> {
        let view = app.sessions.view(&learner_id, &course_id)?;
        Ok(Json(view))
    }

    #[instrument(skip(app))]
    pub async fn select(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
        Json(request): Json<LectureRequest>,
    ) -> Result<Json<ProgressView>> {
        let view = app.sessions.select(&learner_id, &course_id, &request.lecture_id)?;
        Ok(Json(view))
    }

    #[instrument(skip(app))]
    pub async fn complete(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
        Json(request): Json<LectureRequest>,
    ) -> Result<Json<ProgressView>> {
        let view = app.sessions.complete(&learner_id, &course_id, &request.lecture_id)?;
        Ok(Json(view))
    }

    #[instrument(skip(app))]
    pub async fn close(
        State(app): State<App>, Learner(learner_id): Learner, Path(course_id): Path<CourseId>,
    ) -> StatusCode {
        if app.sessions.close(&learner_id, &course_id) {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }
}
