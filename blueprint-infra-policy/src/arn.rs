//! ARN construction for the resources this stack references

/// AWS partition every ARN is built in
pub const PARTITION: &str = "aws";

/// S3 bucket ARN, e.g. `arn:aws:s3:::my-bucket`
pub fn bucket(bucket_name: &str) -> String {
    format!("arn:{PARTITION}:s3:::{bucket_name}")
}

/// ARN matching every object in a bucket, e.g. `arn:aws:s3:::my-bucket/*`
pub fn bucket_objects(bucket_name: &str) -> String {
    format!("{}/*", bucket(bucket_name))
}

/// CloudFront distribution ARN. CloudFront is global so the region is empty.
pub fn distribution(account_id: &str, distribution_id: &str) -> String {
    format!("arn:{PARTITION}:cloudfront::{account_id}:distribution/{distribution_id}")
}

pub fn role(account_id: &str, role_name: &str) -> String {
    format!("arn:{PARTITION}:iam::{account_id}:role/{role_name}")
}

/// IAM OIDC provider ARN, keyed by the provider host
pub fn oidc_provider(account_id: &str, provider_host: &str) -> String {
    format!("arn:{PARTITION}:iam::{account_id}:oidc-provider/{provider_host}")
}

/// AWS managed policy ARN, e.g. `service-role/AWSLambdaBasicExecutionRole`
pub fn aws_managed_policy(policy_path: &str) -> String {
    format!("arn:{PARTITION}:iam::aws:policy/{policy_path}")
}

pub fn function(region: &str, account_id: &str, function_name: &str) -> String {
    format!("arn:{PARTITION}:lambda:{region}:{account_id}:function:{function_name}")
}

pub fn schedule_rule(region: &str, account_id: &str, rule_name: &str) -> String {
    format!("arn:{PARTITION}:events:{region}:{account_id}:rule/{rule_name}")
}
