//! Datadog-style monitoring lines
//!
//! Status is reported by writing a single line to the log stream, in the
//! format picked up by the Datadog log forwarder:
//!
//! ```text
//! MONITORING|<unix_ts>|<value>|<metric_type>|<metric_name>|#k:v,k2:v2
//! ```

use std::fmt;

/// Metric name used for the verifier's health check
pub const VERIFY_STATUS_METRIC: &str = "dbsnap-verify.status";

/// Datadog service check status values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::FromRepr,
    strum::AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum CheckStatus {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl CheckStatus {
    /// Numeric value written to the metric line
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Metric types accepted by the forwarder
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum MetricType {
    #[default]
    Count,
    Gauge,
    Histogram,
    Check,
}

/// Ordered `key:value` tags attached to a metric line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTags(Vec<String>);

impl MetricTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key:value` tag
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push(format!("{key}:{value}"));
        self
    }

    /// Parse a pre-formatted tag string, with or without the leading `#`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MetricTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, "#{}", self.0.join(","))
    }
}

/// A single monitoring line
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub timestamp: f64,
    pub value: f64,
    pub metric_type: MetricType,
    pub name: String,
    pub tags: MetricTags,
}

impl StatusLine {
    pub fn metric(name: &str, value: f64, metric_type: MetricType, tags: MetricTags) -> Self {
        Self {
            timestamp: crate::epoch_seconds(),
            value,
            metric_type,
            name: name.to_string(),
            tags,
        }
    }

    /// Service check line carrying a [`CheckStatus`]
    pub fn check(name: &str, status: CheckStatus, tags: MetricTags) -> Self {
        Self::metric(name, f64::from(status.value()), MetricType::Check, tags)
    }

    /// The check status this line reports, if it is a check line
    pub fn status(&self) -> Option<CheckStatus> {
        if self.metric_type != MetricType::Check {
            return None;
        }
        CheckStatus::from_repr(self.value as u8)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MONITORING|{}|{}|{}|{}|{}",
            self.timestamp, self.value, self.metric_type, self.name, self.tags
        )
    }
}
