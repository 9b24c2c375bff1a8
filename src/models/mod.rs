//! Data models for Bookkeep

pub mod book;
pub mod loan;
pub mod patron;

// Re-export commonly used types
pub use book::{Book, BookForm, NewBook};
pub use loan::{Loan, LoanDetails, LoanForm, NewLoan, ReturnLoanForm};
pub use patron::{NewPatron, Patron, PatronForm};
