//! Trust and access policy synthesis for the GitHub deploy role
//!
//! The deploy role is assumed by GitHub Actions through OIDC federation. Its
//! trust is bound to exactly one `owner/repo` and one branch ref, and its
//! permissions are bound to exactly one bucket and one distribution.

use crate::arn;
use crate::error::{PolicyError, PolicyResult};
use crate::scope::{ensure_least_privilege, has_wildcard};
use crate::types::{AssumeRolePolicy, AssumeRoleStatement, Effect, Principal, POLICY_VERSION};
use crate::{PolicyStatement, ResourceKind, ResourceRef};
use log::debug;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Issuer URL of GitHub Actions OIDC tokens
pub const GITHUB_OIDC_URL: &str = "https://token.actions.githubusercontent.com";

/// Host part of [`GITHUB_OIDC_URL`], which prefixes the token claim keys
pub const GITHUB_OIDC_HOST: &str = "token.actions.githubusercontent.com";

/// Audience GitHub requests when exchanging its token with STS
pub const STS_AUDIENCE: &str = "sts.amazonaws.com";

/// Bucket actions needed to sync a static site: object read/write/delete,
/// listing, multipart cleanup and bucket location lookup.
pub const SITE_BUCKET_ACTIONS: &[&str] = &[
    "s3:AbortMultipartUpload",
    "s3:DeleteObject",
    "s3:GetBucketLocation",
    "s3:GetObject",
    "s3:ListBucket",
    "s3:ListBucketMultipartUploads",
    "s3:PutObject",
];

pub const DISTRIBUTION_ACTIONS: &[&str] = &["cloudfront:CreateInvalidation"];

const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";

/// Claims a federated token must carry to assume the deploy role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustCondition {
    pub audience_claim: String,
    pub subject_claim: String,
}

impl TrustCondition {
    /// Reject a subject that would match more than one repository or branch.
    pub fn ensure_exact(&self) -> PolicyResult<()> {
        if has_wildcard(&self.subject_claim) {
            return Err(PolicyError::scope_violation(
                "GithubTrust",
                format!("subject claim {} contains a wildcard", self.subject_claim),
            ));
        }
        Ok(())
    }

    /// Trust policy admitting tokens from the given OIDC provider whose claims
    /// match this condition exactly.
    pub fn to_trust_policy(&self, oidc_provider: &ResourceRef) -> PolicyResult<AssumeRolePolicy> {
        let provider_arn = oidc_provider.require(ResourceKind::OidcProvider)?;
        self.ensure_exact()?;

        let claims = BTreeMap::from([
            (
                format!("{GITHUB_OIDC_HOST}:aud"),
                self.audience_claim.clone(),
            ),
            (
                format!("{GITHUB_OIDC_HOST}:sub"),
                self.subject_claim.clone(),
            ),
        ]);

        Ok(AssumeRolePolicy {
            version: POLICY_VERSION.to_string(),
            statement: vec![AssumeRoleStatement {
                effect: Effect::Allow,
                principal: Principal::Federated(provider_arn.to_string()),
                action: ASSUME_ROLE_WITH_WEB_IDENTITY.to_string(),
                condition: BTreeMap::from([("StringEquals".to_string(), claims)]),
            }],
        })
    }
}

/// Build the trust condition for one repository and branch.
pub fn synthesize_trust(owner: &str, repo: &str, branch: &str) -> TrustCondition {
    let subject_claim = format!("repo:{owner}/{repo}:ref:refs/heads/{branch}");
    debug!("Synthesized trust subject {}", subject_claim);
    TrustCondition {
        audience_claim: STS_AUDIENCE.to_string(),
        subject_claim,
    }
}

/// Build the deploy role's permissions for one bucket and one distribution.
///
/// Both references must come from their resources' creation steps; anything
/// else is a [`PolicyError::DependencyOrdering`]. The result is checked with
/// [`ensure_least_privilege`] before it is returned.
pub fn synthesize_access_policy(
    bucket: &ResourceRef,
    distribution: &ResourceRef,
    account_id: &str,
) -> PolicyResult<Vec<PolicyStatement>> {
    let bucket_name = bucket.require(ResourceKind::Bucket)?;
    let distribution_id = distribution.require(ResourceKind::Distribution)?;

    let statements = vec![
        PolicyStatement::allow(
            "DeploySiteBucket",
            SITE_BUCKET_ACTIONS.iter().copied(),
            [arn::bucket(bucket_name), arn::bucket_objects(bucket_name)],
        ),
        PolicyStatement::allow(
            "InvalidateSiteDistribution",
            DISTRIBUTION_ACTIONS.iter().copied(),
            [arn::distribution(account_id, distribution_id)],
        ),
    ];

    ensure_least_privilege(&statements)?;
    debug!(
        "Synthesized deploy policy for bucket {} and distribution {}",
        bucket_name, distribution_id
    );
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn bucket(id: &str) -> ResourceRef {
        ResourceRef::new(ResourceKind::Bucket, id)
    }

    fn distribution(id: &str) -> ResourceRef {
        ResourceRef::new(ResourceKind::Distribution, id)
    }

    #[test]
    fn test_trust_subject_is_fully_qualified() {
        let trust = synthesize_trust("acme", "site", "main");
        assert_eq!(trust.subject_claim, "repo:acme/site:ref:refs/heads/main");
        assert_eq!(trust.audience_claim, "sts.amazonaws.com");
        assert_eq!(trust.ensure_exact(), Ok(()));
    }

    #[test]
    fn test_trust_rejects_wildcard_subject() {
        let trust = synthesize_trust("acme", "*", "main");
        assert!(matches!(
            trust.ensure_exact(),
            Err(PolicyError::ScopeViolation { .. })
        ));
    }

    #[test]
    fn test_trust_policy_document() {
        let provider = ResourceRef::new(
            ResourceKind::OidcProvider,
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com",
        );
        let policy = synthesize_trust("acme", "site", "main")
            .to_trust_policy(&provider)
            .expect("trust policy");
        let value = serde_json::to_value(&policy).expect("serialize");
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {
                        "Federated": "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
                    },
                    "Action": "sts:AssumeRoleWithWebIdentity",
                    "Condition": {
                        "StringEquals": {
                            "token.actions.githubusercontent.com:aud": "sts.amazonaws.com",
                            "token.actions.githubusercontent.com:sub": "repo:acme/site:ref:refs/heads/main"
                        }
                    }
                }]
            })
        );
    }

    #[test]
    fn test_trust_policy_requires_provisioned_provider() {
        let trust = synthesize_trust("acme", "site", "main");
        let err = trust
            .to_trust_policy(&bucket("b1"))
            .expect_err("wrong reference kind");
        assert!(matches!(err, PolicyError::DependencyOrdering { .. }));
    }

    #[test]
    fn test_access_policy_statements() {
        let statements =
            synthesize_access_policy(&bucket("b1"), &distribution("d1"), "123456789012")
                .expect("policy");
        assert_eq!(statements.len(), 2);

        let bucket_statement = &statements[0];
        assert_eq!(
            bucket_statement.resources.iter().collect::<Vec<_>>(),
            ["arn:aws:s3:::b1", "arn:aws:s3:::b1/*"]
        );
        assert!(bucket_statement.actions.contains("s3:PutObject"));
        assert!(bucket_statement.actions.contains("s3:AbortMultipartUpload"));
        assert!(!bucket_statement.actions.contains("s3:PutObjectAcl"));
        assert!(!bucket_statement.actions.contains("s3:DeleteBucket"));

        let distribution_statement = &statements[1];
        assert_eq!(
            distribution_statement.actions.iter().collect::<Vec<_>>(),
            ["cloudfront:CreateInvalidation"]
        );
        assert_eq!(
            distribution_statement.resources.iter().collect::<Vec<_>>(),
            ["arn:aws:cloudfront::123456789012:distribution/d1"]
        );
    }

    #[test]
    fn test_access_policy_rejects_swapped_references() {
        let err = synthesize_access_policy(&distribution("d1"), &bucket("b1"), "123456789012")
            .expect_err("swapped");
        assert_eq!(
            err,
            PolicyError::DependencyOrdering {
                expected: ResourceKind::Bucket,
                found: "distribution 'd1'".to_string(),
            }
        );
    }

    #[test]
    fn test_access_policy_rejects_unprovisioned_reference() {
        let err = synthesize_access_policy(&bucket("b1"), &distribution(""), "123456789012")
            .expect_err("no distribution id");
        assert!(matches!(err, PolicyError::DependencyOrdering { .. }));
    }

    #[test]
    fn test_access_policy_rejects_wildcard_identifier() {
        let err = synthesize_access_policy(&bucket("*"), &distribution("d1"), "123456789012")
            .expect_err("wildcard bucket");
        assert!(matches!(err, PolicyError::ScopeViolation { .. }));
    }

    #[test]
    fn test_access_policy_rejects_wildcard_distribution() {
        let err = synthesize_access_policy(&bucket("b1"), &distribution("*"), "123456789012")
            .expect_err("wildcard distribution");
        assert!(
            matches!(err, PolicyError::ScopeViolation { ref sid, .. } if sid == "InvalidateSiteDistribution"),
            "{err}"
        );
    }

    #[test]
    fn test_access_policy_rejects_single_character_wildcard() {
        let err = synthesize_access_policy(&bucket("b?"), &distribution("d1"), "123456789012")
            .expect_err("'?' in bucket name");
        assert!(
            matches!(err, PolicyError::ScopeViolation { ref sid, .. } if sid == "DeploySiteBucket"),
            "{err}"
        );
    }

    #[test]
    fn test_trust_rejects_single_character_wildcard() {
        let trust = synthesize_trust("acme", "site", "releas?");
        assert!(matches!(
            trust.ensure_exact(),
            Err(PolicyError::ScopeViolation { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_access_policy_never_uses_wildcard_resource(
            bucket_name in "[a-z0-9][a-z0-9.-]{2,40}",
            distribution_id in "[A-Z0-9]{8,14}",
            account in "[0-9]{12}",
        ) {
            let statements = synthesize_access_policy(
                &bucket(&bucket_name),
                &distribution(&distribution_id),
                &account,
            ).expect("policy");
            for statement in &statements {
                prop_assert!(!statement.resources.is_empty());
                prop_assert!(!statement.resources.contains("*"));
            }
        }

        #[test]
        fn prop_trust_subject_binds_one_repo_and_branch(
            owner in "[a-zA-Z0-9-]{1,20}",
            repo in "[a-zA-Z0-9._-]{1,30}",
            branch in "[a-zA-Z0-9/_-]{1,30}",
        ) {
            let trust = synthesize_trust(&owner, &repo, &branch);
            prop_assert_eq!(
                trust.subject_claim,
                format!("repo:{owner}/{repo}:ref:refs/heads/{branch}")
            );
        }
    }
}
