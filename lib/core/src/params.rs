//! Typed access to backend kwargs

use crate::backend::BackendError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Plain kwargs handed to a backend factory
pub type Params = BTreeMap<String, Value>;

/// Validating reader over a backend's kwargs
///
/// Construction rejects kwargs the backend does not accept, so a typo in a
/// schema surfaces on first use instead of being silently ignored.
#[derive(Debug, Clone, Copy)]
pub struct ParamReader<'a> {
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    pub fn new(params: &'a Params, accepted: &[&str]) -> Result<Self, BackendError> {
        if let Some(unknown) = params.keys().find(|k| !accepted.contains(&k.as_str())) {
            return Err(BackendError::InvalidParameter {
                name: unknown.clone(),
                message: format!("unknown kwarg; accepted: [{}]", accepted.join(", ")),
            });
        }
        Ok(Self { params })
    }

    fn invalid(name: &str, message: impl Into<String>) -> BackendError {
        BackendError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn usize(&self, name: &str, default: usize) -> Result<usize, BackendError> {
        Ok(self.optional_usize(name)?.unwrap_or(default))
    }

    /// A non-negative integer kwarg; `null` counts as absent
    pub fn optional_usize(&self, name: &str) -> Result<Option<usize>, BackendError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| Self::invalid(name, format!("expected a non-negative integer, got {}", v))),
        }
    }

    pub fn u64(&self, name: &str, default: u64) -> Result<u64, BackendError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_u64()
                .ok_or_else(|| Self::invalid(name, format!("expected a non-negative integer, got {}", v))),
        }
    }

    pub fn bool(&self, name: &str, default: bool) -> Result<bool, BackendError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| Self::invalid(name, format!("expected a boolean, got {}", v))),
        }
    }

    /// A string kwarg restricted to `options`
    pub fn choice(&self, name: &str, default: &'a str, options: &[&str]) -> Result<&'a str, BackendError> {
        let value = match self.params.get(name) {
            None | Some(Value::Null) => default,
            Some(Value::String(s)) => s.as_str(),
            Some(v) => return Err(Self::invalid(name, format!("expected a string, got {}", v))),
        };
        if options.contains(&value) {
            Ok(value)
        } else {
            Err(Self::invalid(
                name,
                format!("expected one of [{}], got '{}'", options.join(", "), value),
            ))
        }
    }
}
