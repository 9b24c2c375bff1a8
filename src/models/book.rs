//! Book model and form

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{self, FieldRules, FormFields, Rule, ValidationErrors};

/// Book record from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Year of first publication
    pub first_published: Option<i32>,
}

/// Validated book fields ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    /// Externally assigned id; the store picks one when absent
    pub id: Option<i32>,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub first_published: Option<i32>,
}

/// Book create/update form as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookForm {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub first_published: Option<String>,
}

pub const BOOK_RULES: &[FieldRules] = &[
    FieldRules::new("id", "Id", &[Rule::PositiveId]),
    FieldRules::new("title", "Title", &[Rule::Required]),
    FieldRules::new("author", "Author", &[Rule::Required]),
    FieldRules::new("genre", "Genre", &[Rule::Required]),
    FieldRules::new("first_published", "First published", &[Rule::Numeric]),
];

impl FormFields for BookForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "title" => self.title.as_deref(),
            "author" => self.author.as_deref(),
            "genre" => self.genre.as_deref(),
            "first_published" => self.first_published.as_deref(),
            _ => None,
        }
    }
}

impl BookForm {
    /// Validate the submission and convert it into typed fields
    pub fn validate(&self) -> Result<NewBook, ValidationErrors> {
        validation::validate(self, BOOK_RULES)?;

        Ok(NewBook {
            id: validation::parse_optional_number(self.id.as_deref()),
            title: trimmed(&self.title),
            author: trimmed(&self.author),
            genre: trimmed(&self.genre),
            first_published: validation::parse_optional_number(self.first_published.as_deref()),
        })
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            id: Some(book.id.to_string()),
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            genre: Some(book.genre.clone()),
            first_published: book.first_published.map(|y| y.to_string()),
        }
    }
}

impl Book {
    /// Apply validated fields, keeping the record's own id
    pub fn apply(&mut self, fields: NewBook) {
        self.title = fields.title;
        self.author = fields.author;
        self.genre = fields.genre;
        self.first_published = fields.first_published;
    }
}

pub(crate) fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str) -> BookForm {
        BookForm {
            id: None,
            title: Some(title.to_string()),
            author: Some("J.R.R. Tolkien".to_string()),
            genre: Some("Fantasy".to_string()),
            first_published: Some("1937".to_string()),
        }
    }

    #[test]
    fn test_validate_book() {
        let book = form(" The Hobbit ").validate().unwrap();
        assert_eq!(book.title, "The Hobbit");
        assert_eq!(book.first_published, Some(1937));
        assert_eq!(book.id, None);
    }

    #[test]
    fn test_empty_title_fails_on_title_only() {
        let errors = form("").validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("title"), Some("Title is required"));
    }

    #[test]
    fn test_first_published_is_optional() {
        let mut f = form("The Hobbit");
        f.first_published = Some(String::new());
        assert_eq!(f.validate().unwrap().first_published, None);

        f.first_published = Some("long ago".to_string());
        assert!(f.validate().unwrap_err().contains("first_published"));
    }

    #[test]
    fn test_id_must_be_positive() {
        for bad in ["0", "-5"] {
            let mut f = form("The Hobbit");
            f.id = Some(bad.to_string());
            let errors = f.validate().unwrap_err();
            assert_eq!(errors.get("id"), Some("Id must be 1 or greater"), "id={}", bad);
        }

        let mut f = form("The Hobbit");
        f.id = Some("2147483647".to_string());
        assert_eq!(f.validate().unwrap().id, Some(i32::MAX));
    }

    #[test]
    fn test_form_round_trips_record() {
        let book = Book {
            id: 3,
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            genre: "Classic".to_string(),
            first_published: None,
        };
        let fields = BookForm::from(&book).validate().unwrap();
        assert_eq!(fields.id, Some(3));
        assert_eq!(fields.title, "Emma");
    }
}
