pub mod contraindications;
pub mod medical_conditions;
pub mod workout_logs;
