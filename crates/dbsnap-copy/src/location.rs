//! Source and destination arguments, and copy naming

use chrono::{DateTime, Utc};
use std::str::FromStr;
use thiserror::Error;

/// Timestamp suffix of generated copy names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Pass source like this <region>:<db-identifier> not `{0}`")]
    Source(String),

    #[error("Destination `{0}` not in [<region>]:[<snapshot-name>] form")]
    Destination(String),
}

/// Database whose snapshots are copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub region: String,
    pub id: String,
}

impl FromStr for Source {
    type Err = LocationError;

    /// Splits on the first `:`; the identifier keeps any further colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((region, id)) if !region.is_empty() && !id.is_empty() => Ok(Self {
                region: region.to_string(),
                id: id.to_string(),
            }),
            _ => Err(LocationError::Source(s.to_string())),
        }
    }
}

/// Where the copy goes. Both parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub region: Option<String>,
    pub name: Option<String>,
}

impl Destination {
    /// Destination region, falling back to the source's
    pub fn region_or<'a>(&'a self, source_region: &'a str) -> &'a str {
        self.region.as_deref().unwrap_or(source_region)
    }
}

impl FromStr for Destination {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (region, name) = s
            .split_once(':')
            .ok_or_else(|| LocationError::Destination(s.to_string()))?;
        let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
        Ok(Self {
            region: non_empty(region),
            name: non_empty(name),
        })
    }
}

/// Join `parts` with `-`, replace anything outside `[a-zA-Z0-9-]` with
/// `-` and collapse runs of `-`.
pub fn sanitize(parts: &[&str]) -> String {
    let mut out = String::new();
    for c in parts.join("-").chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '-' };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Name of the copy: the destination's name if given, otherwise one
/// derived from the source snapshot, its region and `now`.
pub fn target_name(
    destination: &Destination,
    snapshot_id: &str,
    source_region: &str,
    now: DateTime<Utc>,
) -> String {
    if let Some(name) = &destination.name {
        return name.clone();
    }
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    sanitize(&[snapshot_id, "copy", source_region, &stamp])
}
