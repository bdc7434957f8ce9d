//! Configuration field identifiers

use serde::Serialize;
use std::fmt;

/// A configuration field, in declaration order.
///
/// Validation errors are always reported in the order of [`Field::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    AccountId,
    Region,
    SenderEmail,
    RecipientEmails,
    DomainName,
    SubdomainName,
    CertificateArn,
    GithubOwner,
    GithubRepositoryName,
    GithubBranchName,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::AccountId,
        Field::Region,
        Field::SenderEmail,
        Field::RecipientEmails,
        Field::DomainName,
        Field::SubdomainName,
        Field::CertificateArn,
        Field::GithubOwner,
        Field::GithubRepositoryName,
        Field::GithubBranchName,
    ];

    /// Key used in the environment and in config files
    pub const fn key(self) -> &'static str {
        match self {
            Field::AccountId => "ACCOUNT_ID",
            Field::Region => "AWS_REGION",
            Field::SenderEmail => "SENDER_EMAIL",
            Field::RecipientEmails => "RECIPIENT_EMAILS",
            Field::DomainName => "DOMAIN_NAME",
            Field::SubdomainName => "SUBDOMAIN_NAME",
            Field::CertificateArn => "CERTIFICATE_ARN",
            Field::GithubOwner => "GITHUB_OWNER",
            Field::GithubRepositoryName => "GITHUB_REPOSITORY_NAME",
            Field::GithubBranchName => "GITHUB_BRANCH_NAME",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
