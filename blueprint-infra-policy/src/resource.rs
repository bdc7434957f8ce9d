//! References to provisioned resources

use crate::error::{PolicyError, PolicyResult};
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub enum ResourceKind {
    Bucket,
    Distribution,
    OidcProvider,
    Function,
    ScheduleRule,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Distribution => "distribution",
            ResourceKind::OidcProvider => "OIDC provider",
            ResourceKind::Function => "function",
            ResourceKind::ScheduleRule => "schedule rule",
        };
        f.write_str(name)
    }
}

/// Identifier of a resource, known only once its creation step has returned.
///
/// Policy synthesis takes these as parameters and never derives them itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    kind: ResourceKind,
    id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the identifier if this reference is a provisioned `expected` resource
    pub fn require(&self, expected: ResourceKind) -> PolicyResult<&str> {
        if self.kind != expected {
            return Err(PolicyError::DependencyOrdering {
                expected,
                found: format!("{} '{}'", self.kind, self.id),
            });
        }
        if self.id.trim().is_empty() {
            return Err(PolicyError::DependencyOrdering {
                expected,
                found: format!("{} with no identifier", self.kind),
            });
        }
        Ok(&self.id)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_matching_kind() {
        let bucket = ResourceRef::new(ResourceKind::Bucket, "b1");
        assert_eq!(bucket.require(ResourceKind::Bucket), Ok("b1"));
    }

    #[test]
    fn test_require_wrong_kind() {
        let distribution = ResourceRef::new(ResourceKind::Distribution, "d1");
        let err = distribution
            .require(ResourceKind::Bucket)
            .expect_err("wrong kind");
        assert_eq!(
            err,
            PolicyError::DependencyOrdering {
                expected: ResourceKind::Bucket,
                found: "distribution 'd1'".to_string(),
            }
        );
    }

    #[test]
    fn test_require_blank_identifier() {
        let bucket = ResourceRef::new(ResourceKind::Bucket, "  ");
        assert!(matches!(
            bucket.require(ResourceKind::Bucket),
            Err(PolicyError::DependencyOrdering { .. })
        ));
    }
}
