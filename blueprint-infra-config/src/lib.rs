//! Deployment configuration for blueprint-infra.
//!
//! This crate owns the deploy-time input surface:
//! - Loading a flat key/value map from the environment and an optional TOML file
//! - Validating every field against its format rule, collecting all violations
//! - Producing an immutable, normalized [`Config`] on success
//!

mod error;
mod field;
mod sources;
mod validation;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrors};
pub use field::Field;
pub use sources::{
    load_raw, load_raw_from, EnvSource, RawConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE,
};
pub use validation::validate;

use serde::Serialize;
use std::path::Path;

/// Region used when `AWS_REGION` is absent or blank
pub const DEFAULT_REGION: &str = "us-east-1";

/// Branch used when `GITHUB_BRANCH_NAME` is absent or blank
pub const DEFAULT_BRANCH: &str = "main";

/// Validated deployment configuration.
///
/// Only [`validate`] constructs this type, so holding a `Config` means every
/// field passed its format rule. Values are trimmed and read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    account_id: String,
    region: String,
    sender_email: String,
    recipient_emails: Vec<String>,
    domain_name: String,
    subdomain_name: String,
    certificate_arn: String,
    github_owner: String,
    github_repository_name: String,
    github_branch_name: String,
}

impl Config {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn sender_email(&self) -> &str {
        &self.sender_email
    }

    /// Recipients in the order they were configured, duplicates kept
    pub fn recipient_emails(&self) -> &[String] {
        &self.recipient_emails
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn subdomain_name(&self) -> &str {
        &self.subdomain_name
    }

    /// Fully qualified site host, e.g. `app.example.com`
    pub fn site_host(&self) -> String {
        format!("{}.{}", self.subdomain_name, self.domain_name)
    }

    pub fn certificate_arn(&self) -> &str {
        &self.certificate_arn
    }

    pub fn github_owner(&self) -> &str {
        &self.github_owner
    }

    pub fn github_repository_name(&self) -> &str {
        &self.github_repository_name
    }

    pub fn github_branch_name(&self) -> &str {
        &self.github_branch_name
    }
}

/// Load configuration from its sources and validate it in one step.
pub fn load(explicit_path: Option<&Path>) -> ConfigResult<Config> {
    let raw = load_raw(explicit_path)?;
    Ok(validate(&raw)?)
}
