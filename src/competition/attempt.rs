//! Attempt Records
//!
//! An attempt is the persisted outcome of one timed solve. Rows are immutable
//! apart from penalty correction, and they are the source of truth every
//! leaderboard is derived from.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::timing::penalty::Penalty;

/// Longest raw time accepted (24 hours).
pub const MAX_RAW_TIME_MS: u64 = 24 * 60 * 60 * 1_000;

/// Unique attempt identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a competitor, issued by the identity layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recorded solve attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Unique identifier.
    pub id: AttemptId,
    /// Who solved.
    pub participant_id: ParticipantId,
    /// Stopwatch time before penalties.
    pub raw_time_ms: u64,
    /// Penalty applied.
    pub penalty: Penalty,
    /// Competition day the attempt counts toward.
    pub competition_date: NaiveDate,
    /// When the attempt was recorded.
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    /// Raw time plus any +2. `None` for DNF.
    pub fn effective_time_ms(&self) -> Option<u64> {
        self.penalty.apply(self.raw_time_ms)
    }

    /// Whether the attempt is void.
    pub fn is_dnf(&self) -> bool {
        self.penalty.is_dnf()
    }
}

/// Attempt validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Participant id was blank.
    #[error("participant id must not be empty")]
    EmptyParticipant,
    /// Raw time beyond [`MAX_RAW_TIME_MS`].
    #[error("raw time {0} ms exceeds the {MAX_RAW_TIME_MS} ms limit")]
    RawTimeTooLarge(u64),
}

/// Submission payload for a new attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttempt {
    /// Who solved.
    pub participant_id: ParticipantId,
    /// Stopwatch time before penalties.
    pub raw_time_ms: u64,
    /// Penalty, typically from inspection.
    #[serde(default)]
    pub penalty: Penalty,
    /// Competition day.
    pub competition_date: NaiveDate,
}

impl NewAttempt {
    /// Check field constraints.
    pub fn validate(&self) -> Result<(), AttemptError> {
        if self.participant_id.as_str().trim().is_empty() {
            return Err(AttemptError::EmptyParticipant);
        }
        if self.raw_time_ms > MAX_RAW_TIME_MS {
            return Err(AttemptError::RawTimeTooLarge(self.raw_time_ms));
        }
        Ok(())
    }

    /// Materialize with a generated id and timestamp.
    pub fn into_attempt(self, id: AttemptId, created_at: DateTime<Utc>) -> Attempt {
        Attempt {
            id,
            participant_id: self.participant_id,
            raw_time_ms: self.raw_time_ms,
            penalty: self.penalty,
            competition_date: self.competition_date,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn new_attempt(raw: u64, penalty: Penalty) -> NewAttempt {
        NewAttempt {
            participant_id: "alice".into(),
            raw_time_ms: raw,
            penalty,
            competition_date: date(),
        }
    }

    #[test]
    fn test_effective_time() {
        let now = Utc::now();
        let clean = new_attempt(1_000, Penalty::None).into_attempt(AttemptId::new(), now);
        let plus2 = new_attempt(1_200, Penalty::Plus2).into_attempt(AttemptId::new(), now);
        let dnf = new_attempt(900, Penalty::Dnf).into_attempt(AttemptId::new(), now);

        assert_eq!(clean.effective_time_ms(), Some(1_000));
        assert_eq!(plus2.effective_time_ms(), Some(3_200));
        assert_eq!(dnf.effective_time_ms(), None);
        assert!(dnf.is_dnf());
    }

    #[test]
    fn test_validation() {
        assert!(new_attempt(0, Penalty::None).validate().is_ok());

        let mut blank = new_attempt(1_000, Penalty::None);
        blank.participant_id = ParticipantId::new("  ");
        assert_eq!(blank.validate(), Err(AttemptError::EmptyParticipant));

        let slow = new_attempt(MAX_RAW_TIME_MS + 1, Penalty::None);
        assert_eq!(slow.validate(), Err(AttemptError::RawTimeTooLarge(MAX_RAW_TIME_MS + 1)));
    }

    #[test]
    fn test_new_attempt_json_defaults_penalty() {
        let json = r#"{"participant_id":"bob","raw_time_ms":8123,"competition_date":"2026-10-19"}"#;
        let parsed: NewAttempt = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.penalty, Penalty::None);
        assert_eq!(parsed.participant_id.as_str(), "bob");
        assert_eq!(parsed.competition_date, date());
    }

    #[test]
    fn test_attempt_id_parse() {
        let id = AttemptId::new();
        assert_eq!(AttemptId::parse(&id.to_string()), Some(id));
        assert_eq!(AttemptId::parse("not-a-uuid"), None);
    }
}
