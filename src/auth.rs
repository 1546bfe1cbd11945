//! Resolves the current learner from an `Authorization: Bearer <jwt>` header.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the learner id. Issuing tokens belongs to the identity provider;
//! [Authenticator::issue] exists for local tooling and tests.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use secrecy::{ExposeSecret as _, SecretString};

use crate::api::{ApiError, App};
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    /// Learner id.
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Snafu, Serialize)]
#[serde(tag = "error")]
pub enum AuthError {
    #[snafu(display("request is not authenticated"))]
    MissingToken,

    #[snafu(display("failed to decode JWT token"))]
    Decode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode JWT token"))]
    Encode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("token does not name a learner"))]
    EmptySubject,
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: SecretString,
    validation: Validation,
}

impl Authenticator {
    const ALGORITHM: Algorithm = Algorithm::HS256;

    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            validation: Validation::new(Self::ALGORITHM),
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    pub fn decode(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        jsonwebtoken::decode(token, &self.decoding_key(), &self.validation).context(DecodeSnafu)
    }

    /// Signs a token for `learner_id` that stays valid for `ttl`.
    pub fn issue(&self, learner_id: &LearnerId, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub: learner_id.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding_key())
            .context(EncodeSnafu)
    }

    /// Resolves the learner behind a bearer token.
    pub fn identify(&self, token: &str) -> Result<LearnerId, AuthError> {
        let TokenData { claims, .. } = self.decode(token)?;
        let learner_id = LearnerId::new(claims.sub);

        if learner_id.is_blank() {
            return EmptySubjectSnafu.fail();
        }

        Ok(learner_id)
    }
}

/// The authenticated learner making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learner(pub LearnerId);

#[async_trait]
impl FromRequestParts<App> for Learner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, app)
                .await
                .map_err(|_| ApiError::from(AuthError::MissingToken))?;

        let learner_id = app.authenticator.identify(bearer.token())?;
        Ok(Learner(learner_id))
    }
}
