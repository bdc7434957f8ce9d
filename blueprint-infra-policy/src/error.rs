//! Error types for policy synthesis.

use crate::ResourceKind;
use thiserror::Error;

/// Fatal synthesis errors.
///
/// Neither variant is caused by operator input: both mean the deploy must be
/// aborted rather than emit a policy that is wrong or over-broad.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A policy was synthesized from a resource reference that does not come
    /// from the expected creation step.
    #[error("Dependency ordering error: expected a provisioned {expected} reference, got {found}")]
    DependencyOrdering {
        expected: ResourceKind,
        found: String,
    },

    /// A statement would grant more than its purpose requires.
    #[error("Policy scope violation in statement '{sid}': {reason}")]
    ScopeViolation { sid: String, reason: String },
}

impl PolicyError {
    pub(crate) fn scope_violation(sid: &str, reason: impl Into<String>) -> Self {
        Self::ScopeViolation {
            sid: sid.to_string(),
            reason: reason.into(),
        }
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
