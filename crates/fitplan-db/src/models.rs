use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Thumbs-up / thumbs-down rating a user attaches to a logged workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    Negative = -1,
    Positive = 1,
}

impl fmt::Display for FeedbackRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Negative => "down",
            Self::Positive => "up",
        };
        f.write_str(s)
    }
}

impl FromStr for FeedbackRating {
    type Err = FeedbackRatingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" | "positive" | "+1" | "1" => Ok(Self::Positive),
            "down" | "negative" | "-1" => Ok(Self::Negative),
            other => Err(FeedbackRatingParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`FeedbackRating`] string.
#[derive(Debug, Clone)]
pub struct FeedbackRatingParseError(pub String);

impl fmt::Display for FeedbackRatingParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid feedback rating: {:?} (expected up or down)", self.0)
    }
}

impl std::error::Error for FeedbackRatingParseError {}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A user's current medical conditions (one row per user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MedicalConditions {
    pub user_id: Uuid,
    pub conditions: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Exercises that should be avoided for a given medical condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contraindication {
    pub id: Uuid,
    pub condition: String,
    pub exercises_to_avoid: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A completed workout as logged by the user.
///
/// `exercises` is stored as JSONB in whatever shape the client logged; the
/// pipeline only renders it into prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub performed_at: DateTime<Utc>,
    pub title: String,
    pub exercises: Json<serde_json::Value>,
    pub notes: Option<String>,
}

/// Feedback on a logged workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WorkoutFeedback {
    pub id: Uuid,
    pub log_id: Uuid,
    pub rating: FeedbackRating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
