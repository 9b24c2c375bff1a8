//! Patron model and form

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::trimmed;
use crate::validation::{self, FieldRules, FormFields, Rule, ValidationErrors};

/// Patron record from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patron {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: String,
    /// Library card identifier
    pub library_id: String,
    pub zip_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatron {
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: String,
    pub library_id: String,
    pub zip_code: i32,
}

/// Patron create/update form as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatronForm {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub library_id: Option<String>,
    pub zip_code: Option<String>,
}

pub const PATRON_RULES: &[FieldRules] = &[
    FieldRules::new("id", "Id", &[Rule::PositiveId]),
    FieldRules::new("first_name", "First name", &[Rule::Required]),
    FieldRules::new("last_name", "Last name", &[Rule::Required]),
    FieldRules::new("address", "Address", &[Rule::Required]),
    FieldRules::new("email", "Email", &[Rule::Required]),
    FieldRules::new("library_id", "Library ID", &[Rule::Required]),
    FieldRules::new("zip_code", "Zip code", &[Rule::Required, Rule::Numeric]),
];

impl FormFields for PatronForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "first_name" => self.first_name.as_deref(),
            "last_name" => self.last_name.as_deref(),
            "address" => self.address.as_deref(),
            "email" => self.email.as_deref(),
            "library_id" => self.library_id.as_deref(),
            "zip_code" => self.zip_code.as_deref(),
            _ => None,
        }
    }
}

impl PatronForm {
    pub fn validate(&self) -> Result<NewPatron, ValidationErrors> {
        validation::validate(self, PATRON_RULES)?;

        let zip_code = validation::parse_optional_number(self.zip_code.as_deref()).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add("zip_code", validation::RuleViolation::NotNumeric.message("Zip code"));
            errors
        })?;

        Ok(NewPatron {
            id: validation::parse_optional_number(self.id.as_deref()),
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            address: trimmed(&self.address),
            email: trimmed(&self.email),
            library_id: trimmed(&self.library_id),
            zip_code,
        })
    }
}

impl From<&Patron> for PatronForm {
    fn from(patron: &Patron) -> Self {
        Self {
            id: Some(patron.id.to_string()),
            first_name: Some(patron.first_name.clone()),
            last_name: Some(patron.last_name.clone()),
            address: Some(patron.address.clone()),
            email: Some(patron.email.clone()),
            library_id: Some(patron.library_id.clone()),
            zip_code: Some(patron.zip_code.to_string()),
        }
    }
}

impl Patron {
    pub fn apply(&mut self, fields: NewPatron) {
        self.first_name = fields.first_name;
        self.last_name = fields.last_name;
        self.address = fields.address;
        self.email = fields.email;
        self.library_id = fields.library_id;
        self.zip_code = fields.zip_code;
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
