//! Declarative output handed to the provisioning engine

use crate::error::{StackError, StackResult};
use blueprint_infra_policy::{AssumeRolePolicy, CronSpec, PolicyDocument};
use log::debug;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Environment variables of the billing report function
pub type FunctionEnvironment = BTreeMap<String, String>;

/// Properties of each resource type this stack declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResourceProperties {
    /// SES identity for the report sender; verification happens out of band
    #[serde(rename_all = "camelCase")]
    EmailIdentity { identity: String },

    #[serde(rename_all = "camelCase")]
    Role {
        role_name: String,
        description: String,
        assume_role_policy: AssumeRolePolicy,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        inline_policies: BTreeMap<String, PolicyDocument>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        managed_policy_arns: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    Function {
        function_name: String,
        runtime: String,
        handler: String,
        code_asset: String,
        timeout_seconds: u32,
        role_arn: String,
        environment: FunctionEnvironment,
    },

    #[serde(rename_all = "camelCase")]
    ScheduleRule {
        rule_name: String,
        description: String,
        schedule_expression: String,
        cron: CronSpec,
        target_arn: String,
    },

    #[serde(rename_all = "camelCase")]
    InvokePermission {
        function_arn: String,
        action: String,
        principal: String,
        source_arn: String,
    },

    #[serde(rename_all = "camelCase")]
    Bucket {
        bucket_name: String,
        index_document: String,
        error_document: String,
    },

    #[serde(rename_all = "camelCase")]
    Distribution {
        origin_bucket: String,
        aliases: Vec<String>,
        certificate_arn: String,
        default_root_object: String,
        not_found_response_page_path: String,
    },

    #[serde(rename_all = "camelCase")]
    OidcProvider { url: String, client_ids: Vec<String> },
}

/// One resource in creation order, with the resources it must follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDeclaration {
    pub logical_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub properties: ResourceProperties,
}

/// Identifiers exposed to operators and CI pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StackOutputs {
    pub bucket_name: String,
    pub distribution_id: String,
    pub deploy_role_arn: String,
    pub site_url: String,
}

/// The complete declarative output of one deploy invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    pub stack_name: String,
    pub account_id: String,
    pub region: String,
    pub resources: Vec<ResourceDeclaration>,
    pub outputs: StackOutputs,
}

impl DeploymentManifest {
    pub fn resource(&self, logical_id: &str) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Position of a resource in creation order
    pub fn position(&self, logical_id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.logical_id == logical_id)
    }
}

/// Accumulates declarations, refusing any whose dependencies are not yet in place.
#[derive(Debug, Default)]
pub(crate) struct ManifestBuilder {
    resources: Vec<ResourceDeclaration>,
}

impl ManifestBuilder {
    fn contains(&self, logical_id: &str) -> bool {
        self.resources.iter().any(|r| r.logical_id == logical_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.resources.len()
    }

    pub(crate) fn declare(&mut self, declaration: ResourceDeclaration) -> StackResult<()> {
        if self.contains(&declaration.logical_id) {
            return Err(StackError::DuplicateResource(declaration.logical_id));
        }
        if let Some(missing) = declaration
            .depends_on
            .iter()
            .find(|dependency| !self.contains(dependency))
        {
            return Err(StackError::UndeclaredDependency {
                resource: declaration.logical_id.clone(),
                dependency: missing.clone(),
            });
        }

        debug!(
            "Declared {} (after {:?})",
            declaration.logical_id, declaration.depends_on
        );
        self.resources.push(declaration);
        Ok(())
    }

    pub(crate) fn finish(
        self,
        stack_name: &str,
        account_id: &str,
        region: &str,
        outputs: StackOutputs,
    ) -> DeploymentManifest {
        DeploymentManifest {
            stack_name: stack_name.to_string(),
            account_id: account_id.to_string(),
            region: region.to_string(),
            resources: self.resources,
            outputs,
        }
    }
}
