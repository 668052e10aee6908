//! [`ProfileStore`] over the PostgreSQL profile tables.

use std::collections::HashMap;

use async_trait::async_trait;
use fitplan_db::queries::{contraindications, medical_conditions, workout_logs};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ContraindicationNote, FeedbackNote, PastWorkout, ProfileStore, StoreError};

/// Profile store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn medical_conditions(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let row = medical_conditions::get_medical_conditions(&self.pool, user_id).await?;
        Ok(row.map(|r| r.conditions).unwrap_or_default())
    }

    async fn contraindications(
        &self,
        conditions: &[String],
    ) -> Result<Vec<ContraindicationNote>, StoreError> {
        let rows = contraindications::list_contraindications_for(&self.pool, conditions).await?;
        Ok(rows
            .into_iter()
            .map(|r| ContraindicationNote {
                condition: r.condition,
                exercises_to_avoid: r.exercises_to_avoid,
            })
            .collect())
    }

    async fn recent_workouts(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PastWorkout>, StoreError> {
        let limit = i64::try_from(limit).map_err(|_| StoreError::Malformed {
            what: "workout history limit",
            detail: format!("{limit} does not fit in a BIGINT"),
        })?;

        let logs = workout_logs::recent_workout_logs(&self.pool, user_id, limit).await?;
        let ids: Vec<Uuid> = logs.iter().map(|l| l.id).collect();

        let mut feedback: HashMap<Uuid, Vec<FeedbackNote>> = HashMap::new();
        for row in workout_logs::feedback_for_logs(&self.pool, &ids).await? {
            feedback.entry(row.log_id).or_default().push(FeedbackNote {
                rating: row.rating,
                comment: row.comment,
            });
        }

        Ok(logs
            .into_iter()
            .map(|log| PastWorkout {
                feedback: feedback.remove(&log.id).unwrap_or_default(),
                performed_at: log.performed_at,
                title: log.title,
                exercises: log.exercises.0,
                notes: log.notes,
            })
            .collect())
    }
}
