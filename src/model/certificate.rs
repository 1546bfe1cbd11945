use rand::Rng;
use serde::{Deserialize, Serialize};

use super::*;

const PREFIX: &str = "CERT";
const SUFFIX_LEN: usize = 9;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Public identifier printed on a certificate, `CERT-<unix millis>-<9 uppercase alphanumerics>`.
///
/// Uniqueness is only probable; the stores reject a number that is already taken.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateNumber(String);

impl CertificateNumber {
    pub fn generate(at: Timestamp) -> Self {
        Self::generate_with(at, &mut rand::thread_rng())
    }

    pub fn generate_with(at: Timestamp, rng: &mut impl Rng) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
            .collect();

        Self(format!("{PREFIX}-{}-{suffix}", at.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CertificateNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub number: CertificateNumber,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub issued_at: Timestamp,
}

impl Certificate {
    pub fn issue(learner_id: LearnerId, course_id: CourseId, issued_at: Timestamp) -> Self {
        Self {
            number: CertificateNumber::generate(issued_at),
            learner_id,
            course_id,
            issued_at,
        }
    }

    /// The same certificate under a freshly generated number.
    pub fn renumber(mut self) -> Self {
        self.number = CertificateNumber::generate(self.issued_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn number_layout() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let number = CertificateNumber::generate(at);

        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected layout: {number}");
        assert_eq!(parts[0], "CERT");
        assert_eq!(parts[1], "1700000000123");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
            "suffix must be uppercase alphanumeric: {number}"
        );
    }

    #[test]
    fn same_millisecond_numbers_differ() {
        let at = now();
        let a = CertificateNumber::generate(at);
        let b = CertificateNumber::generate(at);
        assert_ne!(a, b);
    }

    #[test]
    fn renumber_keeps_everything_else() {
        let certificate = Certificate::issue("u1".into(), "c1".into(), now());
        let renumbered = certificate.clone().renumber();

        assert_ne!(certificate.number, renumbered.number);
        assert_eq!(certificate.learner_id, renumbered.learner_id);
        assert_eq!(certificate.course_id, renumbered.course_id);
        assert_eq!(certificate.issued_at, renumbered.issued_at);
    }
}
