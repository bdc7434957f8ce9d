//! IAM policy document types
//!
//! Serialization follows the AWS policy grammar (`Version`, `Statement`,
//! `Sid`, `Effect`, `Action`, `Resource`, ...). Actions and resources are
//! sets so output is deterministic and free of duplicates.

use schemars::JsonSchema;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect. Only grants are ever synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum Effect {
    Allow,
}

/// A permission statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: BTreeSet<String>,
    #[serde(rename = "Resource")]
    pub resources: BTreeSet<String>,
}

impl PolicyStatement {
    /// Create an Allow statement
    pub fn allow<A, R>(sid: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid: sid.into(),
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }
}

/// An identity policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}

/// Who may assume a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub enum Principal {
    /// An OIDC identity provider, by ARN
    Federated(String),
    /// An AWS service principal such as `lambda.amazonaws.com`
    Service(String),
}

/// A statement of a role's trust (assume-role) policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct AssumeRoleStatement {
    pub effect: Effect,
    pub principal: Principal,
    pub action: String,
    /// Operator -> condition key -> expected value
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: BTreeMap<String, BTreeMap<String, String>>,
}

/// A role's trust policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct AssumeRolePolicy {
    pub version: String,
    pub statement: Vec<AssumeRoleStatement>,
}

impl AssumeRolePolicy {
    /// Trust policy letting an AWS service assume the role, e.g. Lambda
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![AssumeRoleStatement {
                effect: Effect::Allow,
                principal: Principal::Service(service.into()),
                action: "sts:AssumeRole".to_string(),
                condition: BTreeMap::new(),
            }],
        }
    }
}
