//! Field validation rules applied on every create and update.
//!
//! Each form declares a static schema of [`FieldRules`]; [`validate`] runs the
//! whole schema and collects one message per failing field, so a single
//! submission reports every problem at once.

use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Date pattern accepted on forms, digit for digit
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"));

/// A single rule attached to a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must be present and not blank
    Required,
    /// Value must parse as an integer
    Numeric,
    /// Value must be an integer of at least 1, as record ids are
    PositiveId,
    /// Value must be a real calendar date written as `YYYY-MM-DD`
    StrictDate,
}

/// Named failure produced by a [`Rule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("value is empty")]
    EmptyField,
    #[error("value is not a number")]
    NotNumeric,
    #[error("value is below 1")]
    NotPositive,
    #[error("value is not a YYYY-MM-DD date")]
    InvalidDateFormat,
}

impl RuleViolation {
    /// Human readable message for the field labelled `label`
    pub fn message(&self, label: &str) -> String {
        match self {
            RuleViolation::EmptyField => format!("{} is required", label),
            RuleViolation::NotNumeric => format!("{} must be a whole number", label),
            RuleViolation::NotPositive => format!("{} must be 1 or greater", label),
            RuleViolation::InvalidDateFormat => format!(
                "{} invalid format. Accepted format: YYYY-MM-DD (e.g., 2016-03-15)",
                label
            ),
        }
    }
}

/// Fails with `EmptyField` when the value is absent or only whitespace
pub fn required(value: Option<&str>) -> Result<(), RuleViolation> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(RuleViolation::EmptyField),
    }
}

/// Fails with `NotNumeric` unless the value is an integer
pub fn numeric(value: &str) -> Result<i32, RuleViolation> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| RuleViolation::NotNumeric)
}

/// Fails with `NotNumeric` unless the value is an integer, then `NotPositive` below 1
pub fn positive_id(value: &str) -> Result<i32, RuleViolation> {
    match numeric(value)? {
        id if id >= 1 => Ok(id),
        _ => Err(RuleViolation::NotPositive),
    }
}

/// Accepts exactly `YYYY-MM-DD` naming a date that exists on the calendar.
///
/// `2016-3-15` is rejected for its missing zero padding and `2016-02-30`
/// because February never has thirty days.
pub fn strict_date(value: &str) -> Result<NaiveDate, RuleViolation> {
    if !DATE_SHAPE.is_match(value) {
        return Err(RuleViolation::InvalidDateFormat);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| RuleViolation::InvalidDateFormat)
}

impl Rule {
    /// Check one value against this rule.
    ///
    /// Only `Required` rejects a blank value; format rules skip it so optional
    /// fields may be left empty.
    pub fn check(self, value: Option<&str>) -> Result<(), RuleViolation> {
        let present = value.filter(|v| !v.trim().is_empty());
        match (self, present) {
            (Rule::Required, _) => required(value),
            (_, None) => Ok(()),
            (Rule::Numeric, Some(v)) => numeric(v).map(|_| ()),
            (Rule::PositiveId, Some(v)) => positive_id(v).map(|_| ()),
            (Rule::StrictDate, Some(v)) => strict_date(v).map(|_| ()),
        }
    }
}

/// Rules declared for one form field
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub label: &'static str,
    pub rules: &'static [Rule],
}

impl FieldRules {
    pub const fn new(field: &'static str, label: &'static str, rules: &'static [Rule]) -> Self {
        Self { field, label, rules }
    }
}

/// Gives the validation engine access to raw submitted values by field name
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;
}

/// Aggregate failure report: field name to message, in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
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

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Run every rule in `schema` against `form`.
///
/// The first failing rule of a field produces that field's message; all
/// failing fields are reported together.
pub fn validate<F: FormFields + ?Sized>(form: &F, schema: &[FieldRules]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for spec in schema {
        let value = form.field(spec.field);
        if let Some(violation) = spec.rules.iter().find_map(|rule| rule.check(value).err()) {
            errors.add(spec.field, violation.message(spec.label));
        }
    }

    errors.into_result()
}

/// Parse an optional integer field already accepted by [`validate`]
pub fn parse_optional_number(value: Option<&str>) -> Option<i32> {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| numeric(v).ok())
}
