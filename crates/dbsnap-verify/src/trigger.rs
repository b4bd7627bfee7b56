//! Trigger event parsing
//!
//! An invocation is started either by a schedule carrying a
//! [`VerifyConfig`], or by an RDS lifecycle notification about one of the
//! temporary databases. Notifications arrive wrapped in an SNS envelope or
//! as an EventBridge event.

use crate::config::VerifyConfig;
use crate::error::ConfigError;
use crate::state::PersistenceTarget;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Scheduled run with the full configuration
    Config(VerifyConfig),
    /// Provider notification naming a resource by identifier
    Lifecycle { source_id: String },
}

impl Trigger {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ConfigError::MalformedTrigger(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if let Some(message) = value
            .pointer("/Records/0/Sns/Message")
            .and_then(Value::as_str)
        {
            return sns_source_id(message).map(|source_id| Self::Lifecycle { source_id });
        }

        if let Some(source_id) = value
            .pointer("/detail/SourceIdentifier")
            .and_then(Value::as_str)
        {
            return Ok(Self::Lifecycle {
                source_id: source_id.to_string(),
            });
        }

        if value.get("database").is_some() {
            let config: VerifyConfig = serde_json::from_value(value)
                .map_err(|e| ConfigError::MalformedTrigger(e.to_string()))?;
            config.validate()?;
            return Ok(Self::Config(config));
        }

        Err(ConfigError::MalformedTrigger(
            "expected a config object, an SNS envelope or an EventBridge RDS event".to_string(),
        ))
    }

    /// Where the document for this trigger lives.
    ///
    /// Lifecycle notifications carry no configuration, so they use
    /// `default_bucket`.
    pub fn target(&self, default_bucket: Option<&str>) -> Result<PersistenceTarget, ConfigError> {
        match self {
            Self::Config(config) => config.validate(),
            Self::Lifecycle { .. } => default_bucket
                .filter(|b| !b.is_empty())
                .map(|b| PersistenceTarget::Bucket(b.to_string()))
                .ok_or(ConfigError::MissingBucket),
        }
    }
}

/// `Source ID` from an RDS notification published through SNS
fn sns_source_id(message: &str) -> Result<String, ConfigError> {
    let message: Value = serde_json::from_str(message)
        .map_err(|e| ConfigError::MalformedTrigger(format!("SNS message is not JSON: {e}")))?;
    message
        .get("Source ID")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MalformedTrigger("SNS message has no 'Source ID'".to_string()))
}
