use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug)]
pub enum BooksError {
    // Input that breaks one of the bookkeeping rules (empty name, negative
    // amount, parent of another category,...)
    #[error("invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },

    #[error("no such {what}: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("{what} already exists: {key}")]
    Duplicate { what: &'static str, key: String },

    #[error("unbalanced entry: debits {debit} != credits {credit}")]
    Unbalanced { debit: Decimal, credit: Decimal },

    #[error("invalid user name or password")]
    Authentication,

    #[error("{0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl BooksError {
    pub fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        BooksError::Invalid {
            what,
            reason: reason.into(),
        }
    }

    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        BooksError::NotFound {
            what,
            key: key.to_string(),
        }
    }

    pub fn duplicate(what: &'static str, key: impl ToString) -> Self {
        BooksError::Duplicate {
            what,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BooksError>;
