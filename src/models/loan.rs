//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{book::Book, patron::Patron};
use crate::validation::{self, FieldRules, FormFields, Rule, ValidationErrors, DATE_FORMAT};

/// Loan record from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub patron_id: i32,
    pub loaned_on: NaiveDate,
    pub return_by: NaiveDate,
    /// Absent while the book is still out
    pub returned_on: Option<NaiveDate>,
}

impl Loan {
    /// Book not returned yet, overdue or not
    pub fn is_checked_out(&self) -> bool {
        self.returned_on.is_none()
    }

    /// Not returned and due strictly before `today`; a loan due today is not overdue
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_checked_out() && self.return_by < today
    }
}

/// Loan joined with its book and patron, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub loan: Loan,
    pub book: Book,
    pub patron: Patron,
}

/// Validated loan fields ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub id: Option<i32>,
    pub book_id: i32,
    pub patron_id: i32,
    pub loaned_on: NaiveDate,
    pub return_by: NaiveDate,
    pub returned_on: Option<NaiveDate>,
}

/// New loan form as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanForm {
    pub id: Option<String>,
    pub book_id: Option<String>,
    pub patron_id: Option<String>,
    pub loaned_on: Option<String>,
    pub return_by: Option<String>,
    pub returned_on: Option<String>,
}

pub const LOAN_RULES: &[FieldRules] = &[
    FieldRules::new("id", "Id", &[Rule::PositiveId]),
    FieldRules::new("book_id", "Book", &[Rule::Required, Rule::Numeric]),
    FieldRules::new("patron_id", "Patron", &[Rule::Required, Rule::Numeric]),
    FieldRules::new("loaned_on", "Loaned On date", &[Rule::Required, Rule::StrictDate]),
    FieldRules::new("return_by", "Return by date", &[Rule::Required, Rule::StrictDate]),
    FieldRules::new("returned_on", "Returned On date", &[Rule::StrictDate]),
];

impl FormFields for LoanForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "book_id" => self.book_id.as_deref(),
            "patron_id" => self.patron_id.as_deref(),
            "loaned_on" => self.loaned_on.as_deref(),
            "return_by" => self.return_by.as_deref(),
            "returned_on" => self.returned_on.as_deref(),
            _ => None,
        }
    }
}

impl LoanForm {
    /// Blank checkout form: loaned today, due after the loan period
    pub fn prefilled(today: NaiveDate, loan_period_days: i64) -> Self {
        Self {
            loaned_on: Some(today.format(DATE_FORMAT).to_string()),
            return_by: Some(
                (today + chrono::Duration::days(loan_period_days))
                    .format(DATE_FORMAT)
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<NewLoan, ValidationErrors> {
        validation::validate(self, LOAN_RULES)?;

        let mut errors = ValidationErrors::new();
        let book_id = required_number(&mut errors, "book_id", "Book", self.book_id.as_deref());
        let patron_id =
            required_number(&mut errors, "patron_id", "Patron", self.patron_id.as_deref());
        let loaned_on =
            required_date(&mut errors, "loaned_on", "Loaned On date", self.loaned_on.as_deref());
        let return_by =
            required_date(&mut errors, "return_by", "Return by date", self.return_by.as_deref());

        match (book_id, patron_id, loaned_on, return_by) {
            (Some(book_id), Some(patron_id), Some(loaned_on), Some(return_by)) => Ok(NewLoan {
                id: validation::parse_optional_number(self.id.as_deref()),
                book_id,
                patron_id,
                loaned_on,
                return_by,
                returned_on: optional_date(self.returned_on.as_deref()),
            }),
            _ => Err(errors),
        }
    }
}

/// Return-book form: records the date the book came back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReturnLoanForm {
    pub returned_on: Option<String>,
}

pub const RETURN_RULES: &[FieldRules] = &[FieldRules::new(
    "returned_on",
    "Returned On date",
    &[Rule::Required, Rule::StrictDate],
)];

impl FormFields for ReturnLoanForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "returned_on" => self.returned_on.as_deref(),
            _ => None,
        }
    }
}

impl ReturnLoanForm {
    pub fn prefilled(today: NaiveDate) -> Self {
        Self {
            returned_on: Some(today.format(DATE_FORMAT).to_string()),
        }
    }

    pub fn validate(&self) -> Result<NaiveDate, ValidationErrors> {
        validation::validate(self, RETURN_RULES)?;

        let mut errors = ValidationErrors::new();
        required_date(&mut errors, "returned_on", "Returned On date", self.returned_on.as_deref())
            .ok_or(errors)
    }
}

fn required_number(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: Option<&str>,
) -> Option<i32> {
    let parsed = validation::parse_optional_number(value);
    if parsed.is_none() {
        errors.add(field, validation::RuleViolation::NotNumeric.message(label));
    }
    parsed
}

fn required_date(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: Option<&str>,
) -> Option<NaiveDate> {
    match value.map(validation::strict_date) {
        Some(Ok(date)) => Some(date),
        _ => {
            errors.add(field, validation::RuleViolation::InvalidDateFormat.message(label));
            None
        }
    }
}

fn optional_date(value: Option<&str>) -> Option<NaiveDate> {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| validation::strict_date(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn open_loan(return_by: &str) -> Loan {
        Loan {
            id: 1,
            book_id: 1,
            patron_id: 1,
            loaned_on: date("2019-12-25"),
            return_by: date(return_by),
            returned_on: None,
        }
    }

    #[test]
    fn test_overdue_is_strictly_before_today() {
        let loan = open_loan("2020-01-01");
        assert!(loan.is_overdue(date("2020-01-02")));
        assert!(!loan.is_overdue(date("2020-01-01")));
        assert!(!loan.is_overdue(date("2019-12-31")));
        assert!(loan.is_checked_out());
    }

    #[test]
    fn test_returned_loan_is_neither_checked_out_nor_overdue() {
        let mut loan = open_loan("2020-01-01");
        loan.returned_on = Some(date("2020-03-01"));
        assert!(!loan.is_checked_out());
        assert!(!loan.is_overdue(date("2021-01-01")));
    }

    #[test]
    fn test_prefilled_form_uses_loan_period() {
        let form = LoanForm::prefilled(date("2020-02-25"), 7);
        assert_eq!(form.loaned_on.as_deref(), Some("2020-02-25"));
        assert_eq!(form.return_by.as_deref(), Some("2020-03-03"));
        assert_eq!(form.returned_on, None);
    }

    #[test]
    fn test_validate_loan_form() {
        let mut form = LoanForm::prefilled(date("2020-02-25"), 7);
        form.book_id = Some("4".to_string());
        form.patron_id = Some("2".to_string());

        let loan = form.validate().unwrap();
        assert_eq!(loan.book_id, 4);
        assert_eq!(loan.patron_id, 2);
        assert_eq!(loan.return_by, date("2020-03-03"));
        assert_eq!(loan.returned_on, None);
    }

    #[test]
    fn test_invalid_loan_form_reports_each_field() {
        let form = LoanForm {
            loaned_on: Some("2020-2-25".to_string()),
            return_by: Some("2020-02-30".to_string()),
            ..Default::default()
        };

        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["book_id", "patron_id", "loaned_on", "return_by"]
        );
        assert_eq!(errors.get("book_id"), Some("Book is required"));
    }

    #[test]
    fn test_return_form_requires_strict_date() {
        assert_eq!(
            ReturnLoanForm::prefilled(date("2020-01-05")).validate(),
            Ok(date("2020-01-05"))
        );

        let errors = ReturnLoanForm::default().validate().unwrap_err();
        assert_eq!(errors.get("returned_on"), Some("Returned On date is required"));

        let errors = ReturnLoanForm { returned_on: Some("01/05/2020".to_string()) }
            .validate()
            .unwrap_err();
        assert!(errors.get("returned_on").unwrap().contains("YYYY-MM-DD"));
    }
}
