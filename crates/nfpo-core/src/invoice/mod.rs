//! Invoice field extraction and validation.

mod parser;
pub mod rules;
mod validator;

pub use parser::InvoiceParser;
pub use validator::{is_valid_invoice_number, reconcile};
