//! Export and import of the registry as a flat JSON array.
//!
//! Import is all-or-nothing: the whole payload is validated before the
//! caller gets a single record back.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::ImportError;
use crate::types::Service;

/// Serialize services as a pretty-printed JSON array.
pub fn export_services(services: &[Service]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(services)
}

/// Parse and validate an import payload.
pub fn parse_import(payload: &str) -> Result<Vec<Service>, ImportError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ImportError::Parse(e.to_string()))?;
    validate_import(value)
}

/// Validate an already-decoded JSON value as a list of services.
pub fn validate_import(value: Value) -> Result<Vec<Service>, ImportError> {
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut services = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(ImportError::InvalidRecord {
                index,
                reason: "expected an object".to_string(),
            });
        }
        let service: Service =
            serde_json::from_value(item).map_err(|e| ImportError::InvalidRecord {
                index,
                reason: e.to_string(),
            })?;
        check_record(index, &service)?;

        if !seen.insert(service.id.clone()) {
            return Err(ImportError::DuplicateId(service.id));
        }
        services.push(service);
    }

    Ok(services)
}

fn check_record(index: usize, service: &Service) -> Result<(), ImportError> {
    let invalid = |reason: &str| ImportError::InvalidRecord {
        index,
        reason: reason.to_string(),
    };

    if service.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if service.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if !service.uptime.is_finite() || !(0.0..=100.0).contains(&service.uptime) {
        return Err(invalid("uptime must be within [0, 100]"));
    }
    Ok(())
}
