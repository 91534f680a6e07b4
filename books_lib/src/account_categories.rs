/// A general categorization for accounts.
/// Every account of the chart belongs to exactly one of these, through its
/// kind.  The category decides on which side of the trial balance the
/// account normally sits, and in which statement it is reported.
use crate::errors::{BooksError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AccountCategory {
    // What the user owns: cash, receivables, equipment,...
    ASSET = 0,

    // What the user owes
    LIABILITY = 1,

    // Owner's capital and drawings.  Current earnings are not stored, but
    // computed from REVENUE and EXPENSE accounts.
    EQUITY = 2,

    REVENUE = 3,
    EXPENSE = 4,
}

/// The side on which an account's balance increases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl AccountCategory {
    pub const ALL: [AccountCategory; 5] = [
        AccountCategory::ASSET,
        AccountCategory::LIABILITY,
        AccountCategory::EQUITY,
        AccountCategory::REVENUE,
        AccountCategory::EXPENSE,
    ];

    pub fn normal_balance(&self) -> NormalBalance {
        match self {
            AccountCategory::ASSET | AccountCategory::EXPENSE => {
                NormalBalance::Debit
            }
            AccountCategory::LIABILITY
            | AccountCategory::EQUITY
            | AccountCategory::REVENUE => NormalBalance::Credit,
        }
    }

    /// Whether accounts of this category are reported in the balance sheet
    /// (as opposed to the income statement).
    pub fn is_balance_sheet(&self) -> bool {
        matches!(
            self,
            AccountCategory::ASSET
                | AccountCategory::LIABILITY
                | AccountCategory::EQUITY
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccountCategory::ASSET => "Assets",
            AccountCategory::LIABILITY => "Liabilities",
            AccountCategory::EQUITY => "Equity",
            AccountCategory::REVENUE => "Revenue",
            AccountCategory::EXPENSE => "Expenses",
        }
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccountCategory {
    type Err = BooksError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountCategory::ASSET),
            "liability" | "liabilities" => Ok(AccountCategory::LIABILITY),
            "equity" => Ok(AccountCategory::EQUITY),
            "revenue" | "revenues" | "income" => Ok(AccountCategory::REVENUE),
            "expense" | "expenses" => Ok(AccountCategory::EXPENSE),
            other => Err(BooksError::not_found("account category", other)),
        }
    }
}
