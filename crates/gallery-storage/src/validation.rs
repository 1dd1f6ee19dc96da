//! Storage configuration validation.

use std::sync::LazyLock;

use gallery_models::StorageConfig;
use regex::Regex;
use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Coarse region shape, e.g. `us-east-1`.
static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]+-\d$").expect("valid region regex"));

/// Lowercase alphanumerics, dots and hyphens; alphanumeric at both ends.
static BUCKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$").expect("valid bucket regex"));

const BUCKET_NAME_LEN: std::ops::RangeInclusive<usize> = 3..=63;

/// Outcome of validating a configuration. Lists every violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn into_result(self) -> StorageResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(StorageError::Validation(self.errors))
        }
    }
}

/// Validate a configuration. Pure; never fails.
pub fn validate_config(config: &StorageConfig) -> ValidationReport {
    let mut errors = Vec::new();

    let required = [
        ("accessKeyId", &config.access_key_id),
        ("secretAccessKey", &config.secret_access_key),
        ("region", &config.region),
        ("bucket", &config.bucket),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            errors.push(format!("Missing required parameter: {}", name));
        }
    }

    if !config.region.trim().is_empty() && !REGION_PATTERN.is_match(&config.region) {
        errors.push("Invalid AWS region format (e.g., us-east-1)".to_string());
    }

    if !config.bucket.trim().is_empty()
        && (!BUCKET_PATTERN.is_match(&config.bucket)
            || !BUCKET_NAME_LEN.contains(&config.bucket.len()))
    {
        errors.push("Invalid S3 bucket name format".to_string());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> StorageConfig {
        StorageConfig::new("AKIAEXAMPLE", "secret", "us-east-1", "my-photos.2024")
    }

    #[test]
    fn test_valid_config() {
        let report = validate_config(&valid());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_missing_fields_each_reported() {
        let report = validate_config(&StorageConfig::default());
        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "Missing required parameter: accessKeyId",
                "Missing required parameter: secretAccessKey",
                "Missing required parameter: region",
                "Missing required parameter: bucket",
            ]
        );
    }

    #[test]
    fn test_single_missing_field() {
        let config = StorageConfig {
            secret_access_key: "  ".to_string(),
            ..valid()
        };
        let report = validate_config(&config);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Missing required parameter: secretAccessKey"]);
    }

    #[test]
    fn test_invalid_bucket_name() {
        let config = StorageConfig {
            bucket: "Invalid_Bucket".to_string(),
            ..valid()
        };
        let report = validate_config(&config);
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Invalid S3 bucket name format"]);
    }

    #[test]
    fn test_bucket_edges() {
        let too_long = "a".repeat(64);
        let longest = "a".repeat(63);

        for bucket in ["-photos", "photos-", ".photos", "photos.", "ab", too_long.as_str()] {
            let config = StorageConfig {
                bucket: bucket.to_string(),
                ..valid()
            };
            assert!(!validate_config(&config).is_valid, "{bucket} should be rejected");
        }

        for bucket in ["abc", "photos-2024", "a.b.c", longest.as_str()] {
            let config = StorageConfig {
                bucket: bucket.to_string(),
                ..valid()
            };
            assert!(validate_config(&config).is_valid, "{bucket} should be accepted");
        }
    }

    #[test]
    fn test_invalid_region_and_bucket_reported_together() {
        let config = StorageConfig {
            region: "US_EAST".to_string(),
            bucket: "Bad Bucket".to_string(),
            ..valid()
        };
        let report = validate_config(&config);
        assert_eq!(
            report.errors,
            vec![
                "Invalid AWS region format (e.g., us-east-1)",
                "Invalid S3 bucket name format",
            ]
        );
    }

    #[test]
    fn test_region_shapes() {
        for region in ["us-east-1", "eu-central-1", "ap-southeast-2"] {
            let config = StorageConfig {
                region: region.to_string(),
                ..valid()
            };
            assert!(validate_config(&config).is_valid, "{region} should be accepted");
        }

        for region in ["useast1", "us-east-12", "auto"] {
            let config = StorageConfig {
                region: region.to_string(),
                ..valid()
            };
            assert!(!validate_config(&config).is_valid, "{region} should be rejected");
        }
    }

    #[test]
    fn test_into_result_error() {
        let err = validate_config(&StorageConfig::default()).into_result().unwrap_err();
        assert!(matches!(err, StorageError::Validation(ref errors) if errors.len() == 4));
    }
}
