//! Resource tag constants for dbsnap
//!
//! Every resource the tools create carries a marker tag. Destructive calls
//! re-read the tags from the provider and refuse to proceed when the marker
//! is missing, so production resources can never be deleted by mistake.
//!
//! ## Tag Schema
//!
//! | Tag Key | Value | Applied to |
//! |---------|-------|------------|
//! | `dbsnap-verify` | `true` | Temporary databases and subnet groups |
//! | `Name` | resource identifier | Temporary databases and subnet groups |
//! | `created_by` | `dbsnap-copy` | Snapshot copies |
//! | `source_snapshot_arn` | ARN of the copied snapshot | Snapshot copies |
//! | `source_region` | region of the copied snapshot | Snapshot copies |
//! | `source_db_identifier` | database the snapshot came from | Snapshot copies |

use std::collections::BTreeMap;

/// Tag map as read back from the provider
pub type Tags = BTreeMap<String, String>;

/// Tag key holding the resource's own identifier
pub const TAG_NAME: &str = "Name";

/// Tag key carrying the copied snapshot's ARN
pub const TAG_SOURCE_SNAPSHOT_ARN: &str = "source_snapshot_arn";

/// Tag key carrying the copied snapshot's region
pub const TAG_SOURCE_REGION: &str = "source_region";

/// Tag key carrying the database the copied snapshot belongs to
pub const TAG_SOURCE_DB_IDENTIFIER: &str = "source_db_identifier";

/// A key/value pair whose presence proves the tools created a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub key: &'static str,
    pub value: &'static str,
}

impl Marker {
    /// Marker on temporary databases and subnet groups created by the verifier
    pub const VERIFY: Marker = Marker {
        key: "dbsnap-verify",
        value: "true",
    };

    /// Provenance marker on snapshot copies created by the copy tool
    pub const COPY: Marker = Marker {
        key: "created_by",
        value: "dbsnap-copy",
    };

    /// Whether the tag map carries this marker with the exact value
    pub fn is_present(&self, tags: &Tags) -> bool {
        tags.get(self.key).is_some_and(|v| v == self.value)
    }

    /// The marker as an owned tag pair
    pub fn pair(&self) -> (String, String) {
        (self.key.to_string(), self.value.to_string())
    }
}

/// Tags applied to every temporary resource the verifier creates.
pub fn verify_resource_tags(name: &str) -> Vec<(String, String)> {
    vec![
        (TAG_NAME.to_string(), name.to_string()),
        Marker::VERIFY.pair(),
    ]
}
