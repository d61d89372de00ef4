//! Backward-compatibility assessment of CAN specification diffs.
//!
//! - [`analyze`] scores a diff list and derives migration risk and findings.
//! - [`find_impacted_consumers`] matches signal diffs against downstream
//!   consumer payloads.
//! - [`AssessmentCache`] memoizes assessments per specification pair and
//!   context.

pub mod analyzer;
pub mod cache;
pub mod consumer;
pub mod status;

pub use analyzer::{analyze, analyze_at, score_weight, CompatibilityAssessment, MigrationRisk};
pub use cache::{AssessmentCache, CacheKey, CacheStats};
pub use consumer::{
    escalate_consumed_removals, find_impacted_consumers, impact_weight, load_consumers,
    Consumer, ImpactedConsumer,
};
pub use status::CompatibilityStatus;
