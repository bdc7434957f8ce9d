//! Error types for stack composition.

use blueprint_infra_policy::PolicyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// A resource was declared before something it depends on.
    #[error("Dependency ordering error: '{resource}' depends on '{dependency}', which has not been created")]
    UndeclaredDependency { resource: String, dependency: String },

    #[error("Resource '{0}' is declared more than once")]
    DuplicateResource(String),

    /// The provisioner could not produce an identifier for a resource.
    #[error("Failed to provision '{resource}': {message}")]
    Provisioning { resource: String, message: String },
}

impl StackError {
    /// Ordering and scope errors are composer or policy bugs, never input problems.
    pub fn is_fatal_design_error(&self) -> bool {
        matches!(
            self,
            StackError::Policy(_)
                | StackError::UndeclaredDependency { .. }
                | StackError::DuplicateResource(_)
        )
    }
}

pub type StackResult<T> = Result<T, StackError>;
