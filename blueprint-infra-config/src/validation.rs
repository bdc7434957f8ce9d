//! Field validation with aggregated error reporting
//!
//! Each field has a pure check that either returns the normalized value or the
//! rejected fragments. The aggregator runs every check regardless of earlier
//! failures so operators see the complete list of problems in one pass.

use crate::error::{ValidationError, ValidationErrors};
use crate::sources::RawConfig;
use crate::{Config, Field, DEFAULT_BRANCH, DEFAULT_REGION};
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;

/// CloudFront only accepts ACM certificates issued in this region
const CLOUDFRONT_CERTIFICATE_REGION: &str = "us-east-1";

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_EMAIL_LOCAL_PART_LENGTH: usize = 64;
const MAX_DOMAIN_LENGTH: usize = 253;

/// A fragment of a field value that failed its check
#[derive(Debug, PartialEq, Eq)]
struct Rejection {
    value: String,
    message: &'static str,
}

type Checked<T> = Result<T, Vec<Rejection>>;

fn reject<T>(value: &str, message: &'static str) -> Checked<T> {
    Err(vec![Rejection {
        value: value.to_string(),
        message,
    }])
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
        )
        .expect("email pattern is a valid regex")
    })
}

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9-]{1,63}\.)+[A-Za-z]{2,63}$")
            .expect("domain pattern is a valid regex")
    })
}

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("label pattern is a valid regex")
    })
}

fn arn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^arn:(?P<partition>[a-z0-9-]+):(?P<service>[a-z0-9-]+):(?P<region>[a-z0-9-]*):(?P<account>[0-9]{12}):(?P<resource>.+)$",
        )
        .expect("arn pattern is a valid regex")
    })
}

fn is_valid_email(value: &str) -> bool {
    let local_len = value.find('@').unwrap_or(value.len());
    value.len() <= MAX_EMAIL_LENGTH
        && local_len <= MAX_EMAIL_LOCAL_PART_LENGTH
        && email_regex().is_match(value)
}

fn check_account_id(value: &str) -> Checked<String> {
    if value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(value.to_string())
    } else {
        reject(value, "must be exactly 12 decimal digits")
    }
}

/// Blank values are reported as missing before checks run, so anything
/// reaching this point is non-empty.
fn check_non_empty(value: &str) -> Checked<String> {
    Ok(value.to_string())
}

fn check_email(value: &str) -> Checked<String> {
    if is_valid_email(value) {
        Ok(value.to_string())
    } else {
        reject(value, "is not a valid email address")
    }
}

fn check_recipient_emails(value: &str) -> Checked<Vec<String>> {
    let recipients: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    if recipients.is_empty() {
        return reject(value, "must contain at least one email address");
    }

    let rejections: Vec<Rejection> = recipients
        .iter()
        .filter(|email| !is_valid_email(email))
        .map(|email| Rejection {
            value: (*email).to_string(),
            message: "is not a valid email address",
        })
        .collect();

    if rejections.is_empty() {
        Ok(recipients.into_iter().map(str::to_string).collect())
    } else {
        Err(rejections)
    }
}

fn check_domain_name(value: &str) -> Checked<String> {
    if value.len() <= MAX_DOMAIN_LENGTH && domain_regex().is_match(value) {
        Ok(value.to_string())
    } else {
        reject(
            value,
            "must be dot-separated labels of 1-63 letters, digits or hyphens ending in an alphabetic top-level label of 2-63 characters",
        )
    }
}

fn check_subdomain_name(value: &str) -> Checked<String> {
    if label_regex().is_match(value) {
        Ok(value.to_string())
    } else {
        reject(
            value,
            "must be a single DNS label of 1-63 letters, digits or hyphens that does not start or end with a hyphen",
        )
    }
}

fn check_certificate_arn(value: &str) -> Checked<String> {
    let Some(captures) = arn_regex().captures(value) else {
        return reject(
            value,
            "must match arn:<partition>:<service>:<region>:<12-digit-account>:<resource>",
        );
    };

    // Structurally valid ARNs that CloudFront will refuse are worth a warning,
    // not a rejection.
    let service = captures.name("service").map_or("", |m| m.as_str());
    let region = captures.name("region").map_or("", |m| m.as_str());
    if service != "acm" {
        warn!(
            "CERTIFICATE_ARN names service '{}', CloudFront expects an ACM certificate",
            service
        );
    } else if region != CLOUDFRONT_CERTIFICATE_REGION {
        warn!(
            "CERTIFICATE_ARN is in region '{}', CloudFront requires certificates in {}",
            region, CLOUDFRONT_CERTIFICATE_REGION
        );
    }

    Ok(value.to_string())
}

/// Runs field checks against a raw map and accumulates every violation.
struct Collector<'a> {
    raw: &'a RawConfig,
    errors: Vec<ValidationError>,
}

impl<'a> Collector<'a> {
    fn new(raw: &'a RawConfig) -> Self {
        Self {
            raw,
            errors: Vec::new(),
        }
    }

    /// Trimmed value for a field, `None` when absent or blank
    fn lookup(&self, field: Field) -> Option<&'a str> {
        self.raw
            .get(field.key())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required<T>(&mut self, field: Field, check: fn(&str) -> Checked<T>) -> Option<T> {
        match self.lookup(field) {
            Some(value) => self.apply(field, value, check),
            None => {
                self.errors.push(ValidationError::missing(field));
                None
            }
        }
    }

    fn with_default<T>(
        &mut self,
        field: Field,
        default: &'static str,
        check: fn(&str) -> Checked<T>,
    ) -> Option<T> {
        let value = self.lookup(field).unwrap_or_else(|| {
            debug!("{} not set, using default '{}'", field.key(), default);
            default
        });
        self.apply(field, value, check)
    }

    fn apply<T>(&mut self, field: Field, value: &str, check: fn(&str) -> Checked<T>) -> Option<T> {
        match check(value) {
            Ok(normalized) => Some(normalized),
            Err(rejections) => {
                self.errors.extend(rejections.into_iter().map(|rejection| {
                    ValidationError::malformed(field, rejection.value, rejection.message)
                }));
                None
            }
        }
    }
}

/// Validate a raw key/value map into a [`Config`].
///
/// Every field is checked independently. On failure the complete list of
/// violations is returned in field-declaration order; there is no partial
/// success.
pub fn validate(raw: &RawConfig) -> Result<Config, ValidationErrors> {
    let mut collector = Collector::new(raw);

    let account_id = collector.required(Field::AccountId, check_account_id);
    let region = collector.with_default(Field::Region, DEFAULT_REGION, check_non_empty);
    let sender_email = collector.required(Field::SenderEmail, check_email);
    let recipient_emails = collector.required(Field::RecipientEmails, check_recipient_emails);
    let domain_name = collector.required(Field::DomainName, check_domain_name);
    let subdomain_name = collector.required(Field::SubdomainName, check_subdomain_name);
    let certificate_arn = collector.required(Field::CertificateArn, check_certificate_arn);
    let github_owner = collector.required(Field::GithubOwner, check_non_empty);
    let github_repository_name = collector.required(Field::GithubRepositoryName, check_non_empty);
    let github_branch_name =
        collector.with_default(Field::GithubBranchName, DEFAULT_BRANCH, check_non_empty);

    let errors = collector.errors;

    match (
        account_id,
        region,
        sender_email,
        recipient_emails,
        domain_name,
        subdomain_name,
        certificate_arn,
        github_owner,
        github_repository_name,
        github_branch_name,
    ) {
        (
            Some(account_id),
            Some(region),
            Some(sender_email),
            Some(recipient_emails),
            Some(domain_name),
            Some(subdomain_name),
            Some(certificate_arn),
            Some(github_owner),
            Some(github_repository_name),
            Some(github_branch_name),
        ) if errors.is_empty() => {
            debug!(
                "Configuration valid: account {}, region {}, {} recipient(s)",
                account_id,
                region,
                recipient_emails.len()
            );
            Ok(Config {
                account_id,
                region,
                sender_email,
                recipient_emails,
                domain_name,
                subdomain_name,
                certificate_arn,
                github_owner,
                github_repository_name,
                github_branch_name,
            })
        }
        _ => Err(ValidationErrors::new(errors)),
    }
}
