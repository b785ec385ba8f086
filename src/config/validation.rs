//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every database must name a writer
//! - Node addresses must be usable and unique per database
//! - Probe timeout must fit inside the reconnect interval
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{NodeConfig, RouterConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `databases.admin.writer`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, replication) in &config.databases {
        let prefix = format!("databases.{}", name);
        let mut seen = HashSet::new();

        match &replication.writer {
            Some(writer) => check_node(&format!("{}.writer", prefix), writer, &mut seen, &mut errors),
            None => errors.push(ValidationError::new(
                format!("{}.writer", prefix),
                "no writer defined",
            )),
        }

        for (i, reader) in replication.readers.iter().enumerate() {
            check_node(&format!("{}.readers[{}]", prefix, i), reader, &mut seen, &mut errors);
        }
    }

    let health = &config.health_check;
    if health.reconnect_interval_ms == 0 {
        errors.push(ValidationError::new(
            "health_check.reconnect_interval_ms",
            "must be greater than 0",
        ));
    }
    if health.probe_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "health_check.probe_timeout_ms",
            "must be greater than 0",
        ));
    } else if health.probe_timeout_ms >= health.reconnect_interval_ms {
        errors.push(ValidationError::new(
            "health_check.probe_timeout_ms",
            "must be shorter than reconnect_interval_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_node(
    field: &str,
    node: &NodeConfig,
    seen: &mut HashSet<(String, u16)>,
    errors: &mut Vec<ValidationError>,
) {
    if node.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.host", field), "must not be empty"));
    }
    if node.port == 0 {
        errors.push(ValidationError::new(format!("{}.port", field), "must not be 0"));
    }
    if !seen.insert((node.host.clone(), node.port)) {
        errors.push(ValidationError::new(
            field,
            format!("duplicate node {}", node.address()),
        ));
    }
}
