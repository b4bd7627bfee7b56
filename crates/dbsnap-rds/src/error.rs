//! RDS and S3 error classification
//!
//! Provides typed errors for RDS and S3 operations using the `.code()`
//! method instead of string matching on Debug format.

use aws_sdk_rds::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Error categories for retry, cleanup and exit-code decisions
#[derive(Debug, Clone, Error)]
pub enum RdsError {
    /// The database, snapshot or subnet group does not exist
    #[error("Resource not found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// Resource already exists
    #[error("Resource already exists")]
    AlreadyExists,

    /// No available snapshot exists for the database
    #[error("No available snapshot found for database '{database}'")]
    NoSnapshotAvailable { database: String },

    /// Snapshot type outside the supported set
    #[error("Invalid snapshot type '{0}', must be one of: automated, manual")]
    InvalidSnapshotType(String),

    /// Destructive call refused because the marker tag is missing
    #[error("Refusing to delete {resource_type} '{resource_id}': missing tag {marker}")]
    SafetyRefusal {
        resource_type: &'static str,
        resource_id: String,
        marker: String,
    },

    /// Throttled by the provider; retried with backoff
    #[error("Rate limit exceeded")]
    Throttled,

    /// Resource is busy in a transitional state (retryable)
    #[error("Resource is in an invalid state for this operation: {message}")]
    InvalidState { message: String },

    /// Conditional write lost against a concurrent writer
    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    /// Any other provider error
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl RdsError {
    /// Whether the resource is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, RdsError::NotFound { .. })
    }

    /// Whether a retry could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RdsError::Throttled | RdsError::InvalidState { .. })
    }

    /// Check if a conditional write was rejected
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, RdsError::PreconditionFailed { .. })
    }

    /// Hint printed under the error in CLI output
    pub fn suggestion(&self) -> Option<String> {
        match self {
            RdsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            RdsError::SafetyRefusal { .. } => Some(
                "The resource was not created by dbsnap. Delete it manually if that is intended."
                    .to_string(),
            ),
            RdsError::NoSnapshotAvailable { .. } => {
                Some("Check that automated backups are enabled for the database.".to_string())
            }
            _ => None,
        }
    }
}

/// Codes RDS and S3 return for missing resources
const NOT_FOUND_CODES: &[&str] = &[
    "DBInstanceNotFound",
    "DBClusterNotFoundFault",
    "DBSubnetGroupNotFoundFault",
    "DBSnapshotNotFound",
    "DBClusterSnapshotNotFoundFault",
    "NoSuchBucket",
    "NoSuchKey",
];

/// Codes returned when an identifier is taken
const ALREADY_EXISTS_CODES: &[&str] = &[
    "DBInstanceAlreadyExists",
    "DBClusterAlreadyExistsFault",
    "DBSubnetGroupAlreadyExists",
    "DBSnapshotAlreadyExists",
    "DBClusterSnapshotAlreadyExistsFault",
];

/// Throttling codes
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for resources still transitioning
const INVALID_STATE_CODES: &[&str] = &[
    "InvalidDBSubnetGroupStateFault",
    "InvalidDBClusterStateFault",
    "InvalidDBInstanceState",
    "InvalidDBSnapshotState",
];

/// Known S3 error codes for rejected conditional writes
const PRECONDITION_CODES: &[&str] = &["PreconditionFailed", "ConditionalRequestConflict"];

/// Map a provider error code onto an [`RdsError`].
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> RdsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => RdsError::NotFound {
            resource_type: "resource",
            resource_id: message,
        },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => RdsError::AlreadyExists,
        Some(c) if THROTTLING_CODES.contains(&c) => RdsError::Throttled,
        Some(c) if INVALID_STATE_CODES.contains(&c) => RdsError::InvalidState { message },
        Some(c) if PRECONDITION_CODES.contains(&c) => RdsError::PreconditionFailed { message },
        _ => RdsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify a single link of an error chain if it is an SDK error of type `E`.
fn classify_sdk_cause<E>(cause: &(dyn std::error::Error + 'static)) -> Option<RdsError>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let err = cause.downcast_ref::<SdkError<E>>()?;
    let meta = ProvideErrorMetadata::meta(err);
    Some(classify_aws_error(meta.code(), meta.message()))
}

type Classifier = fn(&(dyn std::error::Error + 'static)) -> Option<RdsError>;

/// One entry per SDK operation the crate calls
const SDK_CLASSIFIERS: &[Classifier] = {
    use aws_sdk_rds::operation::{
        copy_db_snapshot::CopyDBSnapshotError, create_db_instance::CreateDBInstanceError,
        create_db_subnet_group::CreateDBSubnetGroupError, delete_db_cluster::DeleteDBClusterError,
        delete_db_instance::DeleteDBInstanceError, delete_db_snapshot::DeleteDBSnapshotError,
        delete_db_subnet_group::DeleteDBSubnetGroupError,
        describe_db_cluster_snapshots::DescribeDBClusterSnapshotsError,
        describe_db_clusters::DescribeDBClustersError,
        describe_db_instances::DescribeDBInstancesError,
        describe_db_snapshots::DescribeDBSnapshotsError, describe_events::DescribeEventsError,
        list_tags_for_resource::ListTagsForResourceError,
        modify_db_cluster::ModifyDBClusterError, modify_db_instance::ModifyDBInstanceError,
        restore_db_cluster_from_snapshot::RestoreDBClusterFromSnapshotError,
        restore_db_instance_from_db_snapshot::RestoreDBInstanceFromDBSnapshotError,
    };
    use aws_sdk_s3::operation::{get_object::GetObjectError, put_object::PutObjectError};

    &[
        classify_sdk_cause::<DescribeDBInstancesError> as Classifier,
        classify_sdk_cause::<DescribeDBClustersError>,
        classify_sdk_cause::<DescribeDBSnapshotsError>,
        classify_sdk_cause::<DescribeDBClusterSnapshotsError>,
        classify_sdk_cause::<DescribeEventsError>,
        classify_sdk_cause::<ListTagsForResourceError>,
        classify_sdk_cause::<RestoreDBInstanceFromDBSnapshotError>,
        classify_sdk_cause::<RestoreDBClusterFromSnapshotError>,
        classify_sdk_cause::<CreateDBInstanceError>,
        classify_sdk_cause::<ModifyDBInstanceError>,
        classify_sdk_cause::<ModifyDBClusterError>,
        classify_sdk_cause::<DeleteDBInstanceError>,
        classify_sdk_cause::<DeleteDBClusterError>,
        classify_sdk_cause::<CreateDBSubnetGroupError>,
        classify_sdk_cause::<DeleteDBSubnetGroupError>,
        classify_sdk_cause::<CopyDBSnapshotError>,
        classify_sdk_cause::<DeleteDBSnapshotError>,
        classify_sdk_cause::<GetObjectError>,
        classify_sdk_cause::<PutObjectError>,
    ]
};

/// Classify an `anyhow::Error` by the first provider code in its chain.
///
/// Walks the error chain looking for an [`RdsError`] raised directly, then
/// for any SDK operation error that implements `ProvideErrorMetadata`.
/// Falls back to string matching on the Debug representation if no typed
/// error is found.
pub fn classify_anyhow_error(error: &anyhow::Error) -> RdsError {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<RdsError>() {
            return e.clone();
        }
        if let Some(classified) = SDK_CLASSIFIERS.iter().find_map(|classify| classify(cause)) {
            return classified;
        }
    }

    // Wrapped SDK errors only expose the code through Debug
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&debug_str));
    }

    RdsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Treat a "not found" SDK error as an absent result.
///
/// Describe calls for a missing identifier fail with a not-found code
/// rather than returning an empty list; callers use this to turn that
/// into `Ok(None)` while keeping every other error.
pub fn ignore_not_found<T, E>(result: Result<T, SdkError<E>>) -> Result<Option<T>, SdkError<E>>
where
    E: ProvideErrorMetadata,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err)
            if ProvideErrorMetadata::code(&err).is_some_and(|c| NOT_FOUND_CODES.contains(&c)) =>
        {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Pull a provider error code out of a Debug rendering
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES
        .iter()
        .chain(ALREADY_EXISTS_CODES)
        .chain(INVALID_STATE_CODES)
        .chain(PRECONDITION_CODES)
        .chain(THROTTLING_CODES);
    for code in known {
        if debug_str.contains(&format!("\"{code}\"")) {
            return Some((*code).to_string());
        }
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to hint
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "DBSubnetGroupDoesNotCoverEnoughAZs",
        "Pass subnet ids from at least two availability zones.",
    ),
    (
        "InstanceQuotaExceeded",
        "Request an RDS instance quota increase via the Service Quotas console.",
    ),
    (
        "StorageQuotaExceeded",
        "Request an RDS storage quota increase via the Service Quotas console.",
    ),
    (
        "KMSKeyNotAccessibleFault",
        "Grant the caller access to the snapshot's KMS key.",
    ),
    (
        "SnapshotQuotaExceeded",
        "Prune old snapshot copies or request a manual snapshot quota increase.",
    ),
    (
        "Throttling",
        "AWS API rate limit hit. The operation will be retried automatically.",
    ),
];

/// Hint for a known error code
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_aws_error(Some(code), Some("some message"));
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
        }
    }

    #[test]
    fn already_exists_codes() {
        for code in ALREADY_EXISTS_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(
                matches!(err, RdsError::AlreadyExists),
                "Expected AlreadyExists for code: {code}"
            );
        }
    }

    #[test]
    fn throttling_codes() {
        for code in THROTTLING_CODES {
            let err = classify_aws_error(Some(code), Some("msg"));
            assert!(err.is_retryable(), "Expected retryable for code: {code}");
            assert!(matches!(err, RdsError::Throttled));
        }
    }

    #[test]
    fn invalid_state_is_retryable() {
        let err = classify_aws_error(
            Some("InvalidDBSubnetGroupStateFault"),
            Some("subnet group in use"),
        );
        assert!(err.is_retryable());
        assert!(matches!(err, RdsError::InvalidState { .. }));
    }

    #[test]
    fn precondition_codes() {
        for code in PRECONDITION_CODES {
            let err = classify_aws_error(Some(code), Some("etag mismatch"));
            assert!(err.is_precondition_failed());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn unknown_and_missing_codes() {
        let err = classify_aws_error(Some("SomeNewError"), Some("details"));
        assert!(matches!(err, RdsError::Sdk { .. }));

        let err2 = classify_aws_error(None, Some("something failed"));
        assert!(matches!(err2, RdsError::Sdk { code: None, .. }));
    }

    #[test]
    fn classify_typed_error_in_chain() {
        let err = anyhow::Error::new(RdsError::NoSnapshotAvailable {
            database: "prod".to_string(),
        })
        .context("Failed to find latest snapshot");
        assert!(matches!(
            classify_anyhow_error(&err),
            RdsError::NoSnapshotAvailable { .. }
        ));
    }

    #[test]
    fn classify_falls_back_to_debug_string() {
        let err = anyhow::anyhow!(r#"SdkError {{ code: Some("DBInstanceNotFound") }}"#);
        assert!(classify_anyhow_error(&err).is_not_found());

        let plain = anyhow::anyhow!("connection refused");
        assert!(matches!(
            classify_anyhow_error(&plain),
            RdsError::Sdk { code: None, .. }
        ));
    }

    #[test]
    fn extract_code_from_code_field() {
        let debug_str = r#"SdkError { code: Some("SomeRandomCode"), message: "fail" }"#;
        assert_eq!(
            extract_error_code(debug_str).as_deref(),
            Some("SomeRandomCode")
        );
        assert!(extract_error_code("connection refused").is_none());
    }

    #[test]
    fn suggestions_for_known_codes() {
        for (code, _) in SUGGESTIONS {
            assert!(
                suggestion_for_code(code).is_some(),
                "No suggestion for code: {code}"
            );
        }
        assert!(suggestion_for_code("SomeUnknownCode").is_none());

        let refusal = RdsError::SafetyRefusal {
            resource_type: "database",
            resource_id: "prod".to_string(),
            marker: "dbsnap-verify=true".to_string(),
        };
        assert!(refusal.suggestion().is_some());
    }
}
