//! Monthly billing report job: trigger and execution policy

use crate::error::PolicyResult;
use crate::scope::ensure_least_privilege;
use crate::{PolicyDocument, PolicyStatement};
use log::debug;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Cost Explorer reads. Aggregate cost queries cannot be scoped to a resource.
pub const COST_EXPLORER_ACTIONS: &[&str] = &["ce:GetCostAndUsage", "ce:GetCostAndUsageWithResources"];

/// SES sends. The sending identity is verified with SES out of band.
pub const SES_SEND_ACTIONS: &[&str] = &["ses:SendEmail", "ses:SendRawEmail"];

/// Managed policy giving the job's function access to its own log group
pub const LAMBDA_BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

pub const COST_EXPLORER_POLICY_NAME: &str = "CostExplorerPolicy";
pub const SES_SEND_EMAIL_POLICY_NAME: &str = "SESSendEmailPolicy";

/// A UTC schedule firing once a month. Month and year are always `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CronSpec {
    pub minute: u8,
    pub hour: u8,
    pub day_of_month: u8,
}

impl CronSpec {
    /// EventBridge schedule expression
    pub fn expression(&self) -> String {
        format!(
            "cron({} {} {} * ? *)",
            self.minute, self.hour, self.day_of_month
        )
    }
}

/// Billing review cadence: the 1st of every month at 12:00 UTC
pub const MONTHLY_BILLING_REPORT: CronSpec = CronSpec {
    minute: 0,
    hour: 12,
    day_of_month: 1,
};

/// Everything the provisioning engine needs to declare the billing report job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub execution_policy: Vec<PolicyStatement>,
    pub trigger: CronSpec,
    /// Sender address, registered with SES as its own resource
    pub email_identity: String,
    pub recipients: Vec<String>,
}

impl ScheduledTask {
    /// Execution policy split into the named inline policies attached to the
    /// job's role, one per statement group.
    pub fn inline_policies(&self) -> BTreeMap<String, PolicyDocument> {
        self.execution_policy
            .iter()
            .map(|statement| {
                let name = if statement.sid == COST_EXPLORER_SID {
                    COST_EXPLORER_POLICY_NAME
                } else {
                    SES_SEND_EMAIL_POLICY_NAME
                };
                (name.to_string(), PolicyDocument::new(vec![statement.clone()]))
            })
            .collect()
    }
}

const COST_EXPLORER_SID: &str = "ReadCostAndUsage";
const SES_SEND_SID: &str = "SendBillingReport";

/// Define the billing report job for a sender and its recipients.
pub fn define(sender_email: &str, recipient_emails: &[String]) -> PolicyResult<ScheduledTask> {
    let execution_policy = vec![
        PolicyStatement::allow(COST_EXPLORER_SID, COST_EXPLORER_ACTIONS.iter().copied(), ["*"]),
        PolicyStatement::allow(SES_SEND_SID, SES_SEND_ACTIONS.iter().copied(), ["*"]),
    ];
    ensure_least_privilege(&execution_policy)?;

    debug!(
        "Billing report from {} to {} recipient(s) on {}",
        sender_email,
        recipient_emails.len(),
        MONTHLY_BILLING_REPORT.expression()
    );

    Ok(ScheduledTask {
        execution_policy,
        trigger: MONTHLY_BILLING_REPORT,
        email_identity: sender_email.to_string(),
        recipients: recipient_emails.to_vec(),
    })
}
