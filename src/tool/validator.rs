use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tool::DispatchError;

/// Placeholder the router is told to emit when the user gave no employee ID.
pub const MISSING_EMPLOYEE_ID: &str = "MISSING_EMP_ID";

/// A pre-invocation check on a tool's arguments.
pub trait ArgumentCheck: Send + Sync {
    /// Returns a user-facing message when the arguments must not reach the tool.
    fn check(&self, args: &Map<String, Value>) -> Result<(), String>;
}

impl<F> ArgumentCheck for F
where
    F: Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync,
{
    fn check(&self, args: &Map<String, Value>) -> Result<(), String> {
        self(args)
    }
}

/// Rejects an identifier argument that is blank or a known placeholder.
#[derive(Debug, Clone)]
pub struct RequiredIdentifier {
    field: String,
    placeholders: Vec<String>,
    message: String,
}

impl RequiredIdentifier {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            placeholders: Vec::new(),
            message: message.into(),
        }
    }

    /// Adds a sentinel value that counts as missing.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholders.push(placeholder.into());
        self
    }

    /// The `employee_id` check used by `apply_leave`.
    pub fn employee_id() -> Self {
        Self::new(
            "employee_id",
            "Employee ID is required. Please provide your employee ID \
             (e.g., 'I am emp001, I want to apply leave...')",
        )
        .with_placeholder(MISSING_EMPLOYEE_ID)
    }
}

impl ArgumentCheck for RequiredIdentifier {
    fn check(&self, args: &Map<String, Value>) -> Result<(), String> {
        let value = match args.get(&self.field) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        if value.is_empty() || self.placeholders.iter().any(|p| *p == value) {
            return Err(self.message.clone());
        }
        Ok(())
    }
}

/// Per-tool argument checks. Tools without a check always pass.
#[derive(Clone, Default)]
pub struct ValidatorSet {
    checks: HashMap<String, Arc<dyn ArgumentCheck>>,
}

impl ValidatorSet {
    /// Creates a set with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// The checks installed by default.
    pub fn standard() -> Self {
        Self::new().with_check("apply_leave", RequiredIdentifier::employee_id())
    }

    /// Installs a check for a tool, replacing any existing one.
    pub fn with_check(mut self, tool_name: impl Into<String>, check: impl ArgumentCheck + 'static) -> Self {
        self.checks.insert(tool_name.into(), Arc::new(check));
        self
    }

    /// Runs the check registered for `tool_name`, if any.
    pub fn validate(&self, tool_name: &str, args: &Map<String, Value>) -> Result<(), DispatchError> {
        match self.checks.get(tool_name) {
            Some(check) => check.check(args).map_err(DispatchError::Validation),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorSet")
            .field("tools", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}
