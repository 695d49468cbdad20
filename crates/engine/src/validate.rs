//! Top-level request validation.
//!
//! Checks the contact/project details of a request and that at least one
//! service is selected. Errors come back as a field-keyed map and are
//! never raised. Required additional fields inside an instance are a
//! separate pass, run when an instance draft is saved (see
//! [`crate::draft`]).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::selection::SelectionState;

/// Error key used when no service is selected.
pub const SERVICES_KEY: &str = "services";

// ──────────────────────────────────────────────
// Inputs
// ──────────────────────────────────────────────

/// Contact and project details entered alongside the service selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDetails {
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub project_name: String,
    pub project_location: String,
    pub description: String,
}

/// Minimum lengths for free-text details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub min_name_length: usize,
    pub min_description_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            min_name_length: 2,
            min_description_length: 10,
        }
    }
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Field-keyed validation messages. A missing key means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(BTreeMap::new())
    }

    /// Record an error. The first message for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|s| s.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

// ──────────────────────────────────────────────
// Checks
// ──────────────────────────────────────────────

/// Validate request details and the selection.
pub fn validate_request(
    details: &RequestDetails,
    selection: &SelectionState,
    rules: &ValidationRules,
) -> ValidationErrors {
    let mut errors = validate_details(details, rules);
    if selection.is_empty() {
        errors.insert(SERVICES_KEY, "Select at least one service");
    }
    errors
}

/// Validate the contact and project details only.
pub fn validate_details(details: &RequestDetails, rules: &ValidationRules) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    check_min_length(
        &mut errors,
        "contactName",
        "Contact name",
        &details.contact_name,
        rules.min_name_length,
    );

    let email = details.email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.insert("email", "Enter a valid email address");
    }

    if details.phone.trim().is_empty() {
        errors.insert("phone", "Phone number is required");
    }
    if details.project_name.trim().is_empty() {
        errors.insert("projectName", "Project name is required");
    }

    check_min_length(
        &mut errors,
        "description",
        "Description",
        &details.description,
        rules.min_description_length,
    );

    errors
}

fn check_min_length(errors: &mut ValidationErrors, key: &str, label: &str, value: &str, min: usize) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.insert(key, format!("{} is required", label));
    } else if len < min {
        errors.insert(key, format!("{} must be at least {} characters", label, min));
    }
}

/// `local@label(.label)+`: dot-separated atoms on the left, at least two
/// hostname labels on the right. Labels may not start or end with `-`.
static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*",
        r"@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+",
        r"[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    ))
});

/// Check an address against the standard email shape.
pub fn is_valid_email(s: &str) -> bool {
    match &*EMAIL_PATTERN {
        Ok(pattern) => pattern.is_match(s),
        Err(e) => {
            tracing::error!("email pattern failed to compile: {}", e);
            false
        }
    }
}
