//! Integration tests for [`PgProfileStore`] against a real database.

use serde_json::json;
use uuid::Uuid;

use fitplan_core::context::{PgProfileStore, ProfileStore};
use fitplan_db::models::FeedbackRating;
use fitplan_db::queries::contraindications::{self, NewContraindication};
use fitplan_db::queries::medical_conditions;
use fitplan_db::queries::workout_logs::{self, NewWorkoutLog};
use fitplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn unknown_user_has_no_conditions_or_history() {
    let (pool, db_name) = create_test_db().await;
    let store = PgProfileStore::new(pool.clone());
    let user_id = Uuid::new_v4();

    assert!(store.medical_conditions(user_id).await.unwrap().is_empty());
    assert!(store.recent_workouts(user_id, 5).await.unwrap().is_empty());
    assert!(store.contraindications(&[]).await.unwrap().is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn conditions_and_matching_contraindications() {
    let (pool, db_name) = create_test_db().await;
    let store = PgProfileStore::new(pool.clone());
    let user_id = Uuid::new_v4();

    medical_conditions::upsert_medical_conditions(&pool, user_id, &["Knee Injury".to_string()])
        .await
        .unwrap();
    let avoid = vec!["Box jump".to_string()];
    contraindications::upsert_contraindication(
        &pool,
        &NewContraindication {
            condition: "knee injury",
            exercises_to_avoid: &avoid,
            notes: None,
        },
    )
    .await
    .unwrap();

    let conditions = store.medical_conditions(user_id).await.unwrap();
    assert_eq!(conditions, vec!["Knee Injury"]);

    let notes = store.contraindications(&conditions).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].exercises_to_avoid, avoid);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn recent_workouts_carry_their_feedback() {
    let (pool, db_name) = create_test_db().await;
    let store = PgProfileStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let exercises = json!([{"exercise": "Row", "sets": 3, "reps": 10}]);

    let log = workout_logs::insert_workout_log(
        &pool,
        &NewWorkoutLog {
            user_id,
            title: "Pull day",
            exercises: &exercises,
            notes: Some("grip gave out"),
        },
    )
    .await
    .unwrap();
    workout_logs::insert_feedback(&pool, log.id, FeedbackRating::Positive, Some("fun"))
        .await
        .unwrap();
    workout_logs::insert_feedback(&pool, log.id, FeedbackRating::Negative, None)
        .await
        .unwrap();

    let workouts = store.recent_workouts(user_id, 5).await.unwrap();
    assert_eq!(workouts.len(), 1);
    assert_eq!(workouts[0].title, "Pull day");
    assert_eq!(workouts[0].exercises, exercises);
    assert_eq!(workouts[0].notes.as_deref(), Some("grip gave out"));
    assert_eq!(workouts[0].rating_counts(), (1, 1));

    pool.close().await;
    drop_test_db(&db_name).await;
}
