//! Workout and nutrition plan generation.
//!
//! The workout pipeline gathers profile context, builds a prompt, calls a
//! language-completion service under a retry policy, parses and validates the
//! returned plan, and re-generates up to a bounded number of refinement
//! attempts before giving up. Every outcome is normalized into one
//! [`agent::AgentResult`] shape.
//!
//! ```text
//! AgentContext
//!     |
//!     v
//! ContextGatherer --(critical: medical conditions)--> PipelineError::Resource
//!     |        \--(non-critical: contraindications, history)--> warnings
//!     v
//! build_prompt
//!     |
//!     v
//! RefinementController  [Generating -> Parsing -> Validating]*
//!     |                      |            \-> Retrying / Exhausted
//!     |                      \-> CompletionInvoker (retry + backoff + timeout)
//!     v
//! format_result --> AgentResult --> SharedMemory (best effort)
//! ```

pub mod agent;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod plan;
pub mod refine;

pub use agent::{Agent, AgentContext, AgentDeps, AgentKind, AgentResult, UserProfile};
pub use config::PipelineConfig;
pub use error::PipelineError;
