//! Protocol Messages
//!
//! JSON envelope for the competition operations. A transport layer decodes a
//! [`Request`], passes it to [`CompetitionService::handle`] and encodes the
//! returned [`Response`]. Failures become [`Response::Error`] rather than a
//! transport error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::competition::{
    Attempt, AttemptId, AttemptStore, CompetitionError, CompetitionService, DailyScramble, LeaderboardEntry,
    NewAttempt, ParticipantId, ParticipantStats, ScrambleStore,
};
use crate::core::format::format_millis;
use crate::scramble::RandomStateScrambler;
use crate::timing::penalty::Penalty;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Requests a client can make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Record an attempt.
    CreateAttempt(NewAttempt),

    /// Change an attempt's penalty.
    CorrectPenalty {
        /// Attempt to update.
        attempt_id: AttemptId,
        /// New penalty.
        penalty: Penalty,
    },

    /// Ranked entries for a date.
    Leaderboard {
        /// Competition date.
        date: NaiveDate,
    },

    /// Scramble of the day.
    Scramble {
        /// Competition date.
        date: NaiveDate,
        /// Discard any stored scramble and generate a new one.
        #[serde(default)]
        force: bool,
    },

    /// Statistics for a participant.
    Stats {
        /// Participant.
        participant_id: ParticipantId,
        /// Limit to one date.
        #[serde(default)]
        date: Option<NaiveDate>,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Responses to [`Request`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Stored attempt after a create or correction.
    Attempt(Attempt),

    /// A date's leaderboard.
    Leaderboard(LeaderboardView),

    /// A date's scramble.
    Scramble(DailyScramble),

    /// Participant statistics.
    Stats(ParticipantStats),

    /// Request failed.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

/// Leaderboard as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardView {
    /// Competition date.
    pub date: NaiveDate,
    /// Ranked rows.
    pub entries: Vec<LeaderboardRow>,
    /// Snapshot digest (hex).
    pub digest: String,
}

/// A leaderboard entry with its display time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// The entry.
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
    /// Best time formatted as `M:SS.CC` or `S.CC`.
    pub display_time: String,
}

impl From<LeaderboardEntry> for LeaderboardRow {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            display_time: format_millis(entry.best_effective_time_ms),
            entry,
        }
    }
}

impl Request {
    /// Decode from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Response {
    /// Encode as JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<CompetitionError> for Response {
    fn from(err: CompetitionError) -> Self {
        Response::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl<St, Sc> CompetitionService<St, Sc>
where
    St: AttemptStore + ScrambleStore,
    Sc: RandomStateScrambler,
{
    /// Dispatch a request. Never fails; errors come back as
    /// [`Response::Error`].
    pub async fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::CreateAttempt(new) => self.create_attempt(new).await.map(Response::Attempt),
            Request::CorrectPenalty { attempt_id, penalty } => {
                self.correct_penalty(attempt_id, penalty).await.map(Response::Attempt)
            }
            Request::Leaderboard { date } => self.leaderboard_snapshot(date).await.map(|snapshot| {
                Response::Leaderboard(LeaderboardView {
                    date,
                    entries: snapshot.entries.iter().cloned().map(LeaderboardRow::from).collect(),
                    digest: snapshot.digest_hex(),
                })
            }),
            Request::Scramble { date, force: false } => self.scramble_for_date(date).await.map(Response::Scramble),
            Request::Scramble { date, force: true } => self.regenerate_scramble(date).await.map(Response::Scramble),
            Request::Stats { participant_id, date } => self
                .participant_stats(&participant_id, date)
                .await
                .map(Response::Stats),
        };

        result.unwrap_or_else(|err| {
            warn!(code = err.code(), error = %err, "request failed");
            Response::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::{LeaderboardConfig, MemoryStore};
    use crate::scramble::{ProcessScrambler, ScrambleConfig, ScrambleService};
    use std::sync::Arc;

    fn service() -> CompetitionService<MemoryStore, Option<ProcessScrambler>> {
        CompetitionService::new(
            Arc::new(MemoryStore::new()),
            ScrambleService::from_config(&ScrambleConfig::default()),
            LeaderboardConfig::default(),
        )
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"type":"create_attempt","participant_id":"alice","raw_time_ms":65432,"penalty":"plus2","competition_date":"2026-10-19"}"#;
        let request = Request::from_json(json).unwrap();
        match request {
            Request::CreateAttempt(new) => {
                assert_eq!(new.raw_time_ms, 65_432);
                assert_eq!(new.penalty, Penalty::Plus2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let scramble: Request = serde_json::from_str(r#"{"type":"scramble","date":"2026-10-19"}"#).unwrap();
        assert!(matches!(scramble, Request::Scramble { force: false, .. }));

        let stats: Request = serde_json::from_str(r#"{"type":"stats","participant_id":"bob"}"#).unwrap();
        assert!(matches!(stats, Request::Stats { date: None, .. }));

        assert!(Request::from_json(r#"{"type":"teleport"}"#).is_err());
    }

    #[tokio::test]
    async fn test_handle_round() {
        let service = service();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        for (who, raw) in [("alice", 65_432), ("bob", 9_876)] {
            let response = service
                .handle(Request::CreateAttempt(NewAttempt {
                    participant_id: who.into(),
                    raw_time_ms: raw,
                    penalty: Penalty::None,
                    competition_date: date,
                }))
                .await;
            assert!(matches!(response, Response::Attempt(_)), "{response:?}");
        }

        let Response::Leaderboard(view) = service.handle(Request::Leaderboard { date }).await else {
            panic!("expected leaderboard");
        };
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.entries[0].display_time, "9.88");
        assert_eq!(view.entries[1].display_time, "1:05.43");
        assert_eq!(view.digest.len(), 64);

        let encoded = serde_json::to_value(&Response::Leaderboard(view)).unwrap();
        assert_eq!(encoded["type"], "leaderboard");
        assert_eq!(encoded["entries"][0]["participant_id"], "bob");
        assert_eq!(encoded["entries"][0]["rank"], 1);

        let Response::Scramble(daily) = service.handle(Request::Scramble { date, force: false }).await else {
            panic!("expected scramble");
        };
        assert!(daily.generated);
    }

    #[tokio::test]
    async fn test_handle_errors() {
        let service = service();
        let response = service
            .handle(Request::CorrectPenalty {
                attempt_id: AttemptId::new(),
                penalty: Penalty::Dnf,
            })
            .await;

        match response {
            Response::Error { ref code, ref message } => {
                assert_eq!(code, "not_found");
                assert!(message.contains("attempt not found"));
                let json = response.to_json().unwrap();
                assert!(json.starts_with(r#"{"type":"error""#));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
