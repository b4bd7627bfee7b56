//! Temporary identifier naming
//!
//! The verifier restores into a database whose identifier is derived from
//! the production one. The derivation must stay reversible by prefix so a
//! lifecycle event carrying only the temporary identifier can be routed
//! back to its state document.

/// Prefix marking every temporary identifier the verifier creates
pub const TEMP_PREFIX: &str = "dbsv-";

/// Provider limit on database identifier length
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Length cap on temporary identifiers.
///
/// Three short of the provider limit so the cluster member identifier
/// (`i-` + cluster identifier) still fits.
pub const MAX_TEMP_IDENTIFIER_LEN: usize = 60;

/// Prefix of the member instance created inside a restored cluster
pub const CLUSTER_MEMBER_PREFIX: &str = "i-";

/// Derive the temporary identifier for a production database.
///
/// The source part is truncated so the result never exceeds
/// [`MAX_TEMP_IDENTIFIER_LEN`] characters.
///
/// ```
/// use dbsnap_common::naming::temp_identifier;
/// assert_eq!(temp_identifier("prod-db"), "dbsv-prod-db");
/// ```
pub fn temp_identifier(database: &str) -> String {
    let room = MAX_TEMP_IDENTIFIER_LEN - TEMP_PREFIX.len();
    let source: String = database.chars().take(room).collect();
    format!("{TEMP_PREFIX}{source}")
}

/// Recover the (possibly truncated) source portion of a temporary identifier.
///
/// Returns `None` for identifiers the verifier did not create.
pub fn source_identifier(identifier: &str) -> Option<&str> {
    identifier
        .strip_prefix(TEMP_PREFIX)
        .filter(|rest| !rest.is_empty())
}

/// Whether an identifier belongs to a temporary verification resource
pub fn is_temp_identifier(identifier: &str) -> bool {
    source_identifier(identifier).is_some()
}

/// Identifier of the single member instance placed in a restored cluster
pub fn cluster_member_identifier(cluster: &str) -> String {
    format!("{CLUSTER_MEMBER_PREFIX}{cluster}")
}
