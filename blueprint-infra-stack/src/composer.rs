//! Ordered composition of the stack
//!
//! The sequencing contract is carried by types: the deploy role can only be
//! built from a [`SiteResources`], and only [`StackComposer::static_site`]
//! produces one, after the bucket and distribution creation steps have
//! returned their identifiers.

use crate::error::StackResult;
use crate::manifest::{
    DeploymentManifest, FunctionEnvironment, ManifestBuilder, ResourceDeclaration,
    ResourceProperties, StackOutputs,
};
use crate::provisioner::{DeclarativeProvisioner, Provisioner};
use blueprint_infra_config::Config;
use blueprint_infra_policy::schedule::LAMBDA_BASIC_EXECUTION_POLICY;
use blueprint_infra_policy::synthesis::{GITHUB_OIDC_URL, STS_AUDIENCE};
use blueprint_infra_policy::{
    arn, define, synthesize_access_policy, synthesize_trust, AssumeRolePolicy, PolicyDocument,
    ResourceKind, ResourceRef, ScheduledTask,
};
use log::info;
use std::collections::BTreeMap;

pub const STACK_NAME: &str = "blueprint-infra-stack";

/// Prefix of the static site's resource names
const SITE_NAME: &str = "blueprint-chat";
const SITE_INDEX_DOCUMENT: &str = "index.html";
const SITE_ERROR_DOCUMENT: &str = "index.html";
const SITE_NOT_FOUND_PAGE: &str = "/404.html";

const BILLING_FUNCTION_NAME: &str = "blueprint-billing-report";
const BILLING_ROLE_NAME: &str = "blueprint-billing-report-lambda";
const BILLING_RULE_NAME: &str = "blueprint-monthly-billing-report";
const BILLING_RUNTIME: &str = "python3.12";
const BILLING_HANDLER: &str = "send_billing_report.lambda_handler";
const BILLING_CODE_ASSET: &str = "lambda";
const BILLING_TIMEOUT_SECONDS: u32 = 60;

const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
const EVENTS_SERVICE_PRINCIPAL: &str = "events.amazonaws.com";

mod logical_id {
    pub const EMAIL_IDENTITY: &str = "BillingReportIdentity";
    pub const BILLING_ROLE: &str = "BillingReportLambdaRole";
    pub const BILLING_FUNCTION: &str = "SendBillingReportFunction";
    pub const BILLING_RULE: &str = "MonthlyBillingRule";
    pub const BILLING_INVOKE_PERMISSION: &str = "MonthlyBillingRuleInvokePermission";
    pub const WEBSITE_BUCKET: &str = "WebsiteBucket";
    pub const WEBSITE_DISTRIBUTION: &str = "WebsiteDistribution";
    pub const GITHUB_OIDC: &str = "GitHubOIDC";
    pub const DEPLOY_ROLE: &str = "GithubDeployerRole";
}

/// Identifiers of the provisioned static site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteResources {
    bucket: ResourceRef,
    distribution: ResourceRef,
}

impl SiteResources {
    pub fn bucket(&self) -> &ResourceRef {
        &self.bucket
    }

    pub fn distribution(&self) -> &ResourceRef {
        &self.distribution
    }
}

/// The GitHub deploy role as declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRole {
    pub role_name: String,
    pub role_arn: String,
}

pub struct StackComposer<'a, P> {
    config: &'a Config,
    provisioner: P,
    manifest: ManifestBuilder,
}

impl<'a, P: Provisioner> StackComposer<'a, P> {
    pub fn new(config: &'a Config, provisioner: P) -> Self {
        Self {
            config,
            provisioner,
            manifest: ManifestBuilder::default(),
        }
    }

    /// Build every resource in dependency order and return the manifest.
    pub fn compose(mut self) -> StackResult<DeploymentManifest> {
        info!(
            "Composing {} for account {} in {}",
            STACK_NAME,
            self.config.account_id(),
            self.config.region()
        );

        self.billing_report()?;
        let site = self.static_site()?;
        let oidc_provider = self.github_oidc_provider()?;
        let deploy_role = self.deploy_role(&site, &oidc_provider)?;

        let outputs = StackOutputs {
            bucket_name: site.bucket().id().to_string(),
            distribution_id: site.distribution().id().to_string(),
            deploy_role_arn: deploy_role.role_arn,
            site_url: format!("https://{}", self.config.site_host()),
        };
        info!(
            "Composed {} resources; deploy target bucket {}",
            self.manifest.len(),
            outputs.bucket_name
        );

        Ok(self.manifest.finish(
            STACK_NAME,
            self.config.account_id(),
            self.config.region(),
            outputs,
        ))
    }

    /// Declare a resource whose identifier nothing references
    fn declare(
        &mut self,
        logical_id: &str,
        depends_on: &[&str],
        properties: ResourceProperties,
    ) -> StackResult<()> {
        self.manifest.declare(ResourceDeclaration {
            logical_id: logical_id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            properties,
        })
    }

    /// Declare a resource and create it, returning its identifier
    fn create(
        &mut self,
        logical_id: &str,
        depends_on: &[&str],
        properties: ResourceProperties,
    ) -> StackResult<ResourceRef> {
        let declaration = ResourceDeclaration {
            logical_id: logical_id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            properties,
        };
        self.manifest.declare(declaration.clone())?;
        self.provisioner.create(&declaration)
    }

    /// Scheduled billing report: sender identity, execution role, function,
    /// monthly rule and the permission letting the rule invoke the function.
    pub fn billing_report(&mut self) -> StackResult<ScheduledTask> {
        let task = define(self.config.sender_email(), self.config.recipient_emails())?;

        self.declare(
            logical_id::EMAIL_IDENTITY,
            &[],
            ResourceProperties::EmailIdentity {
                identity: task.email_identity.clone(),
            },
        )?;

        self.declare(
            logical_id::BILLING_ROLE,
            &[],
            ResourceProperties::Role {
                role_name: BILLING_ROLE_NAME.to_string(),
                description: "Allows Lambda to query Cost Explorer and send via SES".to_string(),
                assume_role_policy: AssumeRolePolicy::for_service(LAMBDA_SERVICE_PRINCIPAL),
                inline_policies: task.inline_policies(),
                managed_policy_arns: vec![arn::aws_managed_policy(LAMBDA_BASIC_EXECUTION_POLICY)],
            },
        )?;

        let environment = FunctionEnvironment::from([
            ("SENDER_EMAIL".to_string(), task.email_identity.clone()),
            ("RECIPIENT_EMAILS".to_string(), task.recipients.join(",")),
        ]);
        let function = self.create(
            logical_id::BILLING_FUNCTION,
            &[logical_id::BILLING_ROLE],
            ResourceProperties::Function {
                function_name: BILLING_FUNCTION_NAME.to_string(),
                runtime: BILLING_RUNTIME.to_string(),
                handler: BILLING_HANDLER.to_string(),
                code_asset: BILLING_CODE_ASSET.to_string(),
                timeout_seconds: BILLING_TIMEOUT_SECONDS,
                role_arn: arn::role(self.config.account_id(), BILLING_ROLE_NAME),
                environment,
            },
        )?;
        let function_arn = function.require(ResourceKind::Function)?.to_string();

        let rule = self.create(
            logical_id::BILLING_RULE,
            &[logical_id::BILLING_FUNCTION],
            ResourceProperties::ScheduleRule {
                rule_name: BILLING_RULE_NAME.to_string(),
                description:
                    "Trigger the billing-report Lambda on the first day of each month at 12:00 UTC"
                        .to_string(),
                schedule_expression: task.trigger.expression(),
                cron: task.trigger,
                target_arn: function_arn.clone(),
            },
        )?;
        let rule_arn = rule.require(ResourceKind::ScheduleRule)?.to_string();

        self.declare(
            logical_id::BILLING_INVOKE_PERMISSION,
            &[logical_id::BILLING_FUNCTION, logical_id::BILLING_RULE],
            ResourceProperties::InvokePermission {
                function_arn,
                action: "lambda:InvokeFunction".to_string(),
                principal: EVENTS_SERVICE_PRINCIPAL.to_string(),
                source_arn: rule_arn,
            },
        )?;

        Ok(task)
    }

    /// Static site bucket, then the distribution in front of it.
    pub fn static_site(&mut self) -> StackResult<SiteResources> {
        let bucket = self.create(
            logical_id::WEBSITE_BUCKET,
            &[],
            ResourceProperties::Bucket {
                bucket_name: format!("{SITE_NAME}-website"),
                index_document: SITE_INDEX_DOCUMENT.to_string(),
                error_document: SITE_ERROR_DOCUMENT.to_string(),
            },
        )?;
        let origin_bucket = bucket.require(ResourceKind::Bucket)?.to_string();

        let distribution = self.create(
            logical_id::WEBSITE_DISTRIBUTION,
            &[logical_id::WEBSITE_BUCKET],
            ResourceProperties::Distribution {
                origin_bucket,
                aliases: vec![self.config.site_host()],
                certificate_arn: self.config.certificate_arn().to_string(),
                default_root_object: SITE_INDEX_DOCUMENT.to_string(),
                not_found_response_page_path: SITE_NOT_FOUND_PAGE.to_string(),
            },
        )?;

        Ok(SiteResources {
            bucket,
            distribution,
        })
    }

    pub fn github_oidc_provider(&mut self) -> StackResult<ResourceRef> {
        self.create(
            logical_id::GITHUB_OIDC,
            &[],
            ResourceProperties::OidcProvider {
                url: GITHUB_OIDC_URL.to_string(),
                client_ids: vec![STS_AUDIENCE.to_string()],
            },
        )
    }

    /// Deploy role trusted by one repository/branch, scoped to the site's
    /// bucket and distribution.
    pub fn deploy_role(
        &mut self,
        site: &SiteResources,
        oidc_provider: &ResourceRef,
    ) -> StackResult<DeployRole> {
        let config = self.config;
        let trust = synthesize_trust(
            config.github_owner(),
            config.github_repository_name(),
            config.github_branch_name(),
        );
        let assume_role_policy = trust.to_trust_policy(oidc_provider)?;
        let statements =
            synthesize_access_policy(site.bucket(), site.distribution(), config.account_id())?;

        let role_name = format!("github-deployer-{}", config.github_repository_name());
        let role_arn = arn::role(config.account_id(), &role_name);

        self.declare(
            logical_id::DEPLOY_ROLE,
            &[
                logical_id::GITHUB_OIDC,
                logical_id::WEBSITE_BUCKET,
                logical_id::WEBSITE_DISTRIBUTION,
            ],
            ResourceProperties::Role {
                role_name: role_name.clone(),
                description:
                    "GitHub Actions can deploy static site to S3 and invalidate CloudFront."
                        .to_string(),
                assume_role_policy,
                inline_policies: BTreeMap::from([(
                    "DeployPolicy".to_string(),
                    PolicyDocument::new(statements),
                )]),
                managed_policy_arns: vec![],
            },
        )?;

        info!("Deploy role {} trusts {}", role_name, trust.subject_claim);
        Ok(DeployRole { role_name, role_arn })
    }
}

/// Compose the full stack for a validated configuration with the declarative
/// provisioner.
pub fn compose(config: &Config) -> StackResult<DeploymentManifest> {
    let provisioner = DeclarativeProvisioner::new(config.account_id(), config.region());
    StackComposer::new(config, provisioner).compose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use blueprint_infra_config::{validate, RawConfig};
    use blueprint_infra_policy::PolicyError;

    fn config() -> Config {
        let raw: RawConfig = [
            ("ACCOUNT_ID", "123456789012"),
            ("SENDER_EMAIL", "billing@example.com"),
            ("RECIPIENT_EMAILS", "acct@example.com, finance@example.com"),
            ("DOMAIN_NAME", "example.com"),
            ("SUBDOMAIN_NAME", "app"),
            (
                "CERTIFICATE_ARN",
                "arn:aws:acm:us-east-1:123456789012:certificate/abc-123",
            ),
            ("GITHUB_OWNER", "acme"),
            ("GITHUB_REPOSITORY_NAME", "site"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        validate(&raw).expect("valid config")
    }

    /// Records creation order and hands out fixed identifiers
    #[derive(Default)]
    struct RecordingProvisioner {
        created: Vec<String>,
        distribution_id: String,
    }

    impl Provisioner for RecordingProvisioner {
        fn create(&mut self, declaration: &ResourceDeclaration) -> StackResult<ResourceRef> {
            self.created.push(declaration.logical_id.clone());
            let reference = match &declaration.properties {
                ResourceProperties::Bucket { bucket_name, .. } => {
                    ResourceRef::new(ResourceKind::Bucket, bucket_name.clone())
                }
                ResourceProperties::Distribution { .. } => {
                    ResourceRef::new(ResourceKind::Distribution, self.distribution_id.clone())
                }
                ResourceProperties::OidcProvider { .. } => ResourceRef::new(
                    ResourceKind::OidcProvider,
                    "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com",
                ),
                ResourceProperties::Function { function_name, .. } => {
                    ResourceRef::new(ResourceKind::Function, format!("fn:{function_name}"))
                }
                ResourceProperties::ScheduleRule { rule_name, .. } => {
                    ResourceRef::new(ResourceKind::ScheduleRule, format!("rule:{rule_name}"))
                }
                _ => ResourceRef::new(ResourceKind::Bucket, ""),
            };
            Ok(reference)
        }
    }

    #[test]
    fn test_referenced_resources_created_in_order() {
        let config = config();
        let mut composer = StackComposer::new(
            &config,
            RecordingProvisioner {
                distribution_id: "E2ABCDEF".to_string(),
                ..Default::default()
            },
        );
        composer.billing_report().expect("billing");
        let site = composer.static_site().expect("site");
        let provider = composer.github_oidc_provider().expect("oidc");
        composer.deploy_role(&site, &provider).expect("deploy role");

        assert_eq!(
            composer.provisioner.created,
            [
                "SendBillingReportFunction",
                "MonthlyBillingRule",
                "WebsiteBucket",
                "WebsiteDistribution",
                "GitHubOIDC",
            ]
        );
        assert_eq!(site.distribution().id(), "E2ABCDEF");
    }

    #[test]
    fn test_deploy_policy_uses_provisioned_distribution_id() {
        let config = config();
        let manifest = StackComposer::new(
            &config,
            RecordingProvisioner {
                distribution_id: "E2ABCDEF".to_string(),
                ..Default::default()
            },
        )
        .compose()
        .expect("manifest");

        assert_eq!(manifest.outputs.distribution_id, "E2ABCDEF");
        let Some(ResourceProperties::Role {
            inline_policies, ..
        }) = manifest
            .resource("GithubDeployerRole")
            .map(|r| &r.properties)
        else {
            panic!("deploy role missing");
        };
        let resources: Vec<&String> = inline_policies["DeployPolicy"]
            .statement
            .iter()
            .flat_map(|s| s.resources.iter())
            .collect();
        assert!(resources
            .iter()
            .any(|r| *r == "arn:aws:cloudfront::123456789012:distribution/E2ABCDEF"));
    }

    #[test]
    fn test_unprovisioned_distribution_aborts_composition() {
        let config = config();
        let err = StackComposer::new(&config, RecordingProvisioner::default())
            .compose()
            .expect_err("blank distribution id");
        assert!(matches!(
            err,
            StackError::Policy(PolicyError::DependencyOrdering { .. })
        ));
        assert!(err.is_fatal_design_error());
    }

    #[test]
    fn test_billing_function_environment() {
        let config = config();
        let manifest = compose(&config).expect("manifest");
        let Some(ResourceProperties::Function {
            environment,
            runtime,
            timeout_seconds,
            ..
        }) = manifest
            .resource("SendBillingReportFunction")
            .map(|r| &r.properties)
        else {
            panic!("function missing");
        };
        assert_eq!(environment["SENDER_EMAIL"], "billing@example.com");
        assert_eq!(
            environment["RECIPIENT_EMAILS"],
            "acct@example.com,finance@example.com"
        );
        assert_eq!(runtime, "python3.12");
        assert_eq!(*timeout_seconds, 60);
    }

    #[test]
    fn test_schedule_rule_targets_function() {
        let config = config();
        let manifest = compose(&config).expect("manifest");
        let Some(ResourceProperties::ScheduleRule {
            schedule_expression,
            target_arn,
            ..
        }) = manifest.resource("MonthlyBillingRule").map(|r| &r.properties)
        else {
            panic!("rule missing");
        };
        assert_eq!(schedule_expression, "cron(0 12 1 * ? *)");
        assert_eq!(
            target_arn,
            "arn:aws:lambda:us-east-1:123456789012:function:blueprint-billing-report"
        );
    }
}
