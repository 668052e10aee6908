//! Profile context gathering.
//!
//! The [`ContextGatherer`] reads everything the prompt needs about a user
//! from a [`ProfileStore`]. Medical conditions are the one critical read:
//! if they cannot be loaded the invocation fails. Contraindications and
//! workout history are best effort and degrade to a warning.

pub mod pg;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitplan_db::models::FeedbackRating;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

pub use pg::PgProfileStore;

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// Failure reading from a [`ProfileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    #[error("profile store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Exercises to avoid for one condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContraindicationNote {
    pub condition: String,
    pub exercises_to_avoid: Vec<String>,
}

/// One rating left on a past workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackNote {
    pub rating: FeedbackRating,
    pub comment: Option<String>,
}

/// A logged workout with its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastWorkout {
    pub performed_at: DateTime<Utc>,
    pub title: String,
    pub exercises: Value,
    pub notes: Option<String>,
    pub feedback: Vec<FeedbackNote>,
}

impl PastWorkout {
    /// `(positive, negative)` rating counts.
    pub fn rating_counts(&self) -> (usize, usize) {
        let positive = self
            .feedback
            .iter()
            .filter(|f| f.rating == FeedbackRating::Positive)
            .count();
        (positive, self.feedback.len() - positive)
    }
}

/// Read access to the profile store.
///
/// A user with no stored conditions yields an empty list, never an error.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Current medical conditions for exactly `user_id`.
    async fn medical_conditions(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Contraindications whose condition is one of `conditions`.
    async fn contraindications(
        &self,
        conditions: &[String],
    ) -> Result<Vec<ContraindicationNote>, StoreError>;

    /// Up to `limit` most recent workouts, newest first.
    async fn recent_workouts(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PastWorkout>, StoreError>;
}

// Compile-time assertion: ProfileStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn ProfileStore) {}
};

// ---------------------------------------------------------------------------
// Gathered context
// ---------------------------------------------------------------------------

/// Read-only snapshot of a user's profile as far as the prompt is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileContext {
    pub user_id: Uuid,
    pub fitness_level: Option<String>,
    pub medical_conditions: Vec<String>,
    /// May be empty even when `medical_conditions` is not.
    pub contraindications: Vec<ContraindicationNote>,
}

/// Everything the gatherer produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GatheredContext {
    pub profile: UserProfileContext,
    pub past_workouts: Vec<PastWorkout>,
}

/// Loads [`GatheredContext`] from a [`ProfileStore`], one call at a time,
/// each under its own timeout.
#[derive(Clone)]
pub struct ContextGatherer {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
    history_limit: usize,
}

impl fmt::Debug for ContextGatherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGatherer")
            .field("timeout", &self.timeout)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl ContextGatherer {
    pub fn new(store: Arc<dyn ProfileStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            timeout: config.store_timeout,
            history_limit: config.workout_history_limit,
        }
    }

    /// Gather context for `user_id`.
    ///
    /// Non-critical failures are logged and appended to `warnings`.
    pub async fn gather(
        &self,
        user_id: Uuid,
        fitness_level: Option<&str>,
        warnings: &mut Vec<String>,
    ) -> Result<GatheredContext, PipelineError> {
        let medical_conditions = self
            .timed(self.store.medical_conditions(user_id))
            .await
            .map_err(|source| PipelineError::Resource { user_id, source })?;
        debug!(user_id = %user_id, count = medical_conditions.len(), "loaded medical conditions");

        let contraindications = if medical_conditions.is_empty() {
            Vec::new()
        } else {
            match self.timed(self.store.contraindications(&medical_conditions)).await {
                Ok(notes) => notes,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "contraindication lookup failed, continuing without it");
                    warnings.push(format!(
                        "Contraindications could not be loaded ({e}); the plan does not account for exercises to avoid."
                    ));
                    Vec::new()
                }
            }
        };

        let past_workouts = if self.history_limit == 0 {
            Vec::new()
        } else {
            match self
                .timed(self.store.recent_workouts(user_id, self.history_limit))
                .await
            {
                Ok(workouts) => workouts,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "workout history lookup failed, continuing without it");
                    warnings.push(format!(
                        "Workout history could not be loaded ({e}); the plan does not reflect past workouts."
                    ));
                    Vec::new()
                }
            }
        };

        Ok(GatheredContext {
            profile: UserProfileContext {
                user_id,
                fitness_level: fitness_level.map(str::to_string),
                medical_conditions,
                contraindications,
            },
            past_workouts,
        })
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.timeout)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        conditions: Option<Vec<String>>,
        contraindications: Option<Vec<ContraindicationNote>>,
        workouts: Option<Vec<PastWorkout>>,
        hang_conditions: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl ProfileStore for FakeStore {
        async fn medical_conditions(&self, _user_id: Uuid) -> Result<Vec<String>, StoreError> {
            self.calls.lock().unwrap().push("conditions");
            if self.hang_conditions {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.conditions
                .clone()
                .ok_or_else(|| StoreError::Unavailable("down".into()))
        }

        async fn contraindications(
            &self,
            _conditions: &[String],
        ) -> Result<Vec<ContraindicationNote>, StoreError> {
            self.calls.lock().unwrap().push("contraindications");
            self.contraindications
                .clone()
                .ok_or_else(|| StoreError::Unavailable("down".into()))
        }

        async fn recent_workouts(
            &self,
            _user_id: Uuid,
            _limit: usize,
        ) -> Result<Vec<PastWorkout>, StoreError> {
            self.calls.lock().unwrap().push("workouts");
            self.workouts
                .clone()
                .ok_or_else(|| StoreError::Unavailable("down".into()))
        }
    }

    fn gatherer(store: FakeStore, config: &PipelineConfig) -> (ContextGatherer, Arc<FakeStore>) {
        let store = Arc::new(store);
        (ContextGatherer::new(store.clone(), config), store)
    }

    #[tokio::test]
    async fn conditions_failure_is_critical() {
        let (g, _) = gatherer(FakeStore::default(), &PipelineConfig::default());
        let user_id = Uuid::new_v4();
        let mut warnings = Vec::new();
        let err = g.gather(user_id, Some("beginner"), &mut warnings).await.unwrap_err();
        assert!(matches!(err, PipelineError::Resource { user_id: id, .. } if id == user_id));
    }

    #[tokio::test]
    async fn no_conditions_skips_contraindication_lookup() {
        let (g, store) = gatherer(
            FakeStore {
                conditions: Some(vec![]),
                workouts: Some(vec![]),
                ..Default::default()
            },
            &PipelineConfig::default(),
        );
        let mut warnings = Vec::new();
        let ctx = g.gather(Uuid::new_v4(), None, &mut warnings).await.unwrap();
        assert!(ctx.profile.contraindications.is_empty());
        assert!(warnings.is_empty());
        assert_eq!(*store.calls.lock().unwrap(), vec!["conditions", "workouts"]);
    }

    #[tokio::test]
    async fn contraindication_failure_degrades_to_warning() {
        let (g, _) = gatherer(
            FakeStore {
                conditions: Some(vec!["Knee injury".into()]),
                workouts: Some(vec![]),
                ..Default::default()
            },
            &PipelineConfig::default(),
        );
        let mut warnings = Vec::new();
        let ctx = g.gather(Uuid::new_v4(), Some("beginner"), &mut warnings).await.unwrap();
        assert_eq!(ctx.profile.medical_conditions, vec!["Knee injury"]);
        assert!(ctx.profile.contraindications.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Contraindications could not be loaded"));
    }

    #[tokio::test]
    async fn history_failure_degrades_to_warning() {
        let (g, _) = gatherer(
            FakeStore {
                conditions: Some(vec![]),
                ..Default::default()
            },
            &PipelineConfig::default(),
        );
        let mut warnings = Vec::new();
        let ctx = g.gather(Uuid::new_v4(), None, &mut warnings).await.unwrap();
        assert!(ctx.past_workouts.is_empty());
        assert!(warnings[0].starts_with("Workout history could not be loaded"));
    }

    #[tokio::test]
    async fn zero_history_limit_skips_lookup() {
        let config = PipelineConfig {
            workout_history_limit: 0,
            ..Default::default()
        };
        let (g, store) = gatherer(
            FakeStore {
                conditions: Some(vec![]),
                ..Default::default()
            },
            &config,
        );
        let mut warnings = Vec::new();
        g.gather(Uuid::new_v4(), None, &mut warnings).await.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(*store.calls.lock().unwrap(), vec!["conditions"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out_as_resource_error() {
        let config = PipelineConfig {
            store_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let (g, _) = gatherer(
            FakeStore {
                conditions: Some(vec![]),
                hang_conditions: true,
                ..Default::default()
            },
            &config,
        );
        let mut warnings = Vec::new();
        let err = g.gather(Uuid::new_v4(), None, &mut warnings).await.unwrap_err();
        match err {
            PipelineError::Resource { source, .. } => {
                assert!(matches!(source, StoreError::Timeout(_)))
            }
            other => panic!("expected resource error, got {other:?}"),
        }
    }

    #[test]
    fn rating_counts_split_positive_and_negative() {
        let workout = PastWorkout {
            performed_at: Utc::now(),
            title: "Legs".into(),
            exercises: Value::Null,
            notes: None,
            feedback: vec![
                FeedbackNote { rating: FeedbackRating::Positive, comment: None },
                FeedbackNote { rating: FeedbackRating::Negative, comment: Some("too long".into()) },
                FeedbackNote { rating: FeedbackRating::Positive, comment: None },
            ],
        };
        assert_eq!(workout.rating_counts(), (2, 1));
    }
}
