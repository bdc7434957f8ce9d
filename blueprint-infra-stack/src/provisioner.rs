//! Seam between the composer and whatever creates resources

use crate::error::{StackError, StackResult};
use crate::manifest::{ResourceDeclaration, ResourceProperties};
use blueprint_infra_policy::{arn, ResourceKind, ResourceRef};
use log::trace;

/// Creates a declared resource and returns its identifier.
///
/// The composer calls this only for resources whose identifiers are
/// referenced later (bucket, distribution, OIDC provider, function, rule),
/// and only after every dependency of the declaration has been created.
pub trait Provisioner {
    fn create(&mut self, declaration: &ResourceDeclaration) -> StackResult<ResourceRef>;
}

/// Provisioner for a purely declarative run.
///
/// Identifiers that are fixed by configuration (bucket names, ARNs built from
/// names) are returned as-is. Identifiers the provisioning engine assigns at
/// apply time, such as a distribution id, are returned as a `${LogicalId.Id}`
/// reference the engine resolves.
#[derive(Debug, Clone)]
pub struct DeclarativeProvisioner {
    account_id: String,
    region: String,
}

impl DeclarativeProvisioner {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }
}

impl Provisioner for DeclarativeProvisioner {
    fn create(&mut self, declaration: &ResourceDeclaration) -> StackResult<ResourceRef> {
        let reference = match &declaration.properties {
            ResourceProperties::Bucket { bucket_name, .. } => {
                ResourceRef::new(ResourceKind::Bucket, bucket_name.clone())
            }
            ResourceProperties::Distribution { .. } => ResourceRef::new(
                ResourceKind::Distribution,
                format!("${{{}.Id}}", declaration.logical_id),
            ),
            ResourceProperties::OidcProvider { url, .. } => {
                let host = url.trim_start_matches("https://");
                ResourceRef::new(
                    ResourceKind::OidcProvider,
                    arn::oidc_provider(&self.account_id, host),
                )
            }
            ResourceProperties::Function { function_name, .. } => ResourceRef::new(
                ResourceKind::Function,
                arn::function(&self.region, &self.account_id, function_name),
            ),
            ResourceProperties::ScheduleRule { rule_name, .. } => ResourceRef::new(
                ResourceKind::ScheduleRule,
                arn::schedule_rule(&self.region, &self.account_id, rule_name),
            ),
            ResourceProperties::EmailIdentity { .. }
            | ResourceProperties::Role { .. }
            | ResourceProperties::InvokePermission { .. } => {
                return Err(StackError::Provisioning {
                    resource: declaration.logical_id.clone(),
                    message: "resource type has no identifier to reference".to_string(),
                })
            }
        };

        trace!("{} -> {}", declaration.logical_id, reference);
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(logical_id: &str, properties: ResourceProperties) -> ResourceDeclaration {
        ResourceDeclaration {
            logical_id: logical_id.to_string(),
            depends_on: vec![],
            properties,
        }
    }

    #[test]
    fn test_bucket_identifier_is_its_name() {
        let mut provisioner = DeclarativeProvisioner::new("123456789012", "us-east-1");
        let reference = provisioner
            .create(&declaration(
                "WebsiteBucket",
                ResourceProperties::Bucket {
                    bucket_name: "blueprint-chat-website".to_string(),
                    index_document: "index.html".to_string(),
                    error_document: "index.html".to_string(),
                },
            ))
            .expect("bucket");
        assert_eq!(reference.kind(), ResourceKind::Bucket);
        assert_eq!(reference.id(), "blueprint-chat-website");
    }

    #[test]
    fn test_distribution_identifier_is_deferred() {
        let mut provisioner = DeclarativeProvisioner::new("123456789012", "us-east-1");
        let reference = provisioner
            .create(&declaration(
                "WebsiteDistribution",
                ResourceProperties::Distribution {
                    origin_bucket: "blueprint-chat-website".to_string(),
                    aliases: vec!["app.example.com".to_string()],
                    certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/x"
                        .to_string(),
                    default_root_object: "index.html".to_string(),
                    not_found_response_page_path: "/404.html".to_string(),
                },
            ))
            .expect("distribution");
        assert_eq!(reference.kind(), ResourceKind::Distribution);
        assert_eq!(reference.id(), "${WebsiteDistribution.Id}");
    }

    #[test]
    fn test_oidc_provider_identifier_is_its_arn() {
        let mut provisioner = DeclarativeProvisioner::new("123456789012", "us-east-1");
        let reference = provisioner
            .create(&declaration(
                "GitHubOIDC",
                ResourceProperties::OidcProvider {
                    url: "https://token.actions.githubusercontent.com".to_string(),
                    client_ids: vec!["sts.amazonaws.com".to_string()],
                },
            ))
            .expect("provider");
        assert_eq!(
            reference.id(),
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
        );
    }

    #[test]
    fn test_unreferenceable_resource_is_an_error() {
        let mut provisioner = DeclarativeProvisioner::new("123456789012", "us-east-1");
        let result = provisioner.create(&declaration(
            "BillingReportIdentity",
            ResourceProperties::EmailIdentity {
                identity: "billing@example.com".to_string(),
            },
        ));
        assert!(matches!(result, Err(StackError::Provisioning { .. })));
    }
}
