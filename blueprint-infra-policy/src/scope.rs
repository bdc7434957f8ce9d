//! Least-privilege checks run on every synthesized statement set

use crate::error::{PolicyError, PolicyResult};
use crate::PolicyStatement;
use log::debug;

/// Actions the provider does not allow to be scoped to a resource, so `*` is
/// the only valid resource for them.
const UNSCOPABLE_ACTIONS: &[&str] = &[
    "ce:GetCostAndUsage",
    "ce:GetCostAndUsageWithResources",
    "ses:SendEmail",
    "ses:SendRawEmail",
];

/// Suffix addressing every object under a bucket
const OBJECT_PATH_WILDCARD: &str = "/*";

/// Whether a value contains an IAM wildcard character (`*` or `?`)
pub(crate) fn has_wildcard(value: &str) -> bool {
    value.contains(|c: char| c == '*' || c == '?')
}

/// The bucket ARN of an `arn:<partition>:s3:::<bucket>/*` object grant.
///
/// Any other ARN ending in `/*` is a widened identifier, not an object path.
fn object_grant_bucket_arn(resource: &str) -> Option<&str> {
    let bucket_arn = resource.strip_suffix(OBJECT_PATH_WILDCARD)?;
    let (partition, bucket) = bucket_arn.strip_prefix("arn:")?.split_once(":s3:::")?;
    let is_bucket = !partition.is_empty()
        && !partition.contains(':')
        && !bucket.is_empty()
        && !bucket.contains('/');
    is_bucket.then_some(bucket_arn)
}

/// Reject statements that would grant more than their actions need.
///
/// A statement fails when it has no actions or no resources, when it names a
/// bare `*` resource for an action that can be resource-scoped, or when a
/// concrete identifier has been widened with a wildcard (other than the
/// trailing object path of an S3 bucket ARN).
pub fn ensure_least_privilege(statements: &[PolicyStatement]) -> PolicyResult<()> {
    for statement in statements {
        check_statement(statement)?;
    }
    debug!("{} statement(s) passed scope checks", statements.len());
    Ok(())
}

fn check_statement(statement: &PolicyStatement) -> PolicyResult<()> {
    let sid = statement.sid.as_str();

    if statement.actions.is_empty() {
        return Err(PolicyError::scope_violation(sid, "statement has no actions"));
    }
    if statement.resources.is_empty() {
        return Err(PolicyError::scope_violation(sid, "statement has no resources"));
    }

    for resource in &statement.resources {
        if resource.trim().is_empty() {
            return Err(PolicyError::scope_violation(sid, "resource identifier is empty"));
        }

        if resource == "*" {
            if let Some(action) = statement
                .actions
                .iter()
                .find(|action| !UNSCOPABLE_ACTIONS.contains(&action.as_str()))
            {
                return Err(PolicyError::scope_violation(
                    sid,
                    format!("wildcard resource granted for resource-scopable action {action}"),
                ));
            }
            continue;
        }

        let identifier = object_grant_bucket_arn(resource).unwrap_or(resource);
        if has_wildcard(identifier) || identifier.ends_with(':') || identifier.ends_with('/') {
            return Err(PolicyError::scope_violation(
                sid,
                format!("resource {resource} is not a concrete identifier"),
            ));
        }
    }

    Ok(())
}
