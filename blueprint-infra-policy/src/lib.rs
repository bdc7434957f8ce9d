//! This crate provides the access-policy logic for blueprint-infra:
//! - IAM policy and trust document types
//! - Federated trust conditions for the GitHub deploy role
//! - Bucket/distribution access policy synthesis
//! - The monthly billing report's schedule and execution policy
//! - Least-privilege scope checks applied before anything is emitted
//!

pub mod arn;
mod error;
mod resource;
pub mod schedule;
mod scope;
pub mod synthesis;
mod types;

// Re-exports for a small, focused public API
pub use error::{PolicyError, PolicyResult};
pub use resource::{ResourceKind, ResourceRef};
pub use schedule::{define, CronSpec, ScheduledTask, MONTHLY_BILLING_REPORT};
pub use scope::ensure_least_privilege;
pub use synthesis::{synthesize_access_policy, synthesize_trust, TrustCondition};
pub use types::{
    AssumeRolePolicy, AssumeRoleStatement, Effect, PolicyDocument, PolicyStatement, Principal,
    POLICY_VERSION,
};
