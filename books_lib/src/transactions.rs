use crate::accounts::{AccountCollection, AccountId};
use crate::amounts::{Operation, Totals};
use crate::errors::{BooksError, Result};
use crate::users::UserId;
use chrono::{DateTime, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Default, PartialOrd, Ord, Serialize)]
pub struct EntryId(pub i64);

/// One line of a journal entry.
/// GnuCash and Kmymoney call these splits.
/// Beancount and Ledger call these postings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalLine {
    // Which account is impacted by this line.
    pub account: AccountId,

    pub operation: Operation,

    // Optional line-specific description.  When missing, the entry's memo
    // applies.
    pub memo: Option<String>,
}

/// A balanced set of debit and credit lines, all effective on the same date.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub user: UserId,
    pub date: NaiveDate,

    // Invoice number, check number,...
    pub reference: Option<String>,
    pub memo: Option<String>,

    // When the entry was typed, which might be totally different from its
    // date.
    pub created_at: DateTime<Local>,

    // The sum of the lines must always be balanced.
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn totals(&self) -> Totals {
        self.lines.iter().map(|l| &l.operation).sum()
    }

    /// Check that the entry obeys the accounting equation, i.e. debits and
    /// credits are equal.
    pub fn is_balanced(&self) -> bool {
        let t = self.totals();
        t.debit == t.credit
    }

    /// The memo to display for a given line
    pub fn line_memo<'a>(&'a self, line: &'a JournalLine) -> Option<&'a str> {
        line.memo.as_deref().or(self.memo.as_deref())
    }
}

/// A line as typed by the user, before the account has been resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDetails<'a> {
    // Code or name of the account
    pub account: &'a str,
    pub operation: Operation,
    pub memo: Option<&'a str>,
}

impl<'a> LineDetails<'a> {
    /// Parse "ACCOUNT=AMOUNT" or "ACCOUNT=AMOUNT:memo".
    /// The account is either a code or a name.
    pub fn parse(text: &'a str, debit: bool) -> Result<Self> {
        let (account, rest) = text.split_once('=').ok_or_else(|| {
            BooksError::invalid(
                "line",
                format!("expected ACCOUNT=AMOUNT, got {text:?}"),
            )
        })?;
        let (amount, memo) = match rest.split_once(':') {
            None => (rest, None),
            Some((a, m)) => (a, Some(m.trim()).filter(|m| !m.is_empty())),
        };
        let amount = Decimal::from_str(amount.trim()).map_err(|e| {
            BooksError::invalid("amount", format!("{amount:?}: {e}"))
        })?;
        Ok(LineDetails {
            account: account.trim(),
            operation: if debit {
                Operation::Debit(amount)
            } else {
                Operation::Credit(amount)
            },
            memo,
        })
    }
}

/// Details used to post or edit an entry.
/// Such objects are short-lived.  All fields are public and with default,
/// so one can use
///     EntryDetails {
///         memo: Some("Office rent"),
///         ..Default::default()
///     }
#[derive(Debug, Default, Clone)]
pub struct EntryDetails<'a> {
    pub date: NaiveDate,
    pub reference: Option<&'a str>,
    pub memo: Option<&'a str>,
    pub lines: Vec<LineDetails<'a>>,
}

/// Changes to an existing entry.  When lines is Some, all lines of the entry
/// are replaced.
#[derive(Debug, Default, Clone)]
pub struct EntryChanges<'a> {
    pub date: Option<NaiveDate>,
    pub reference: Option<Option<&'a str>>,
    pub memo: Option<Option<&'a str>>,
    pub lines: Option<Vec<LineDetails<'a>>>,
}

/// Trim optional text, and drop it when empty
pub(crate) fn clean_text(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolve the accounts and check all the rules a journal entry must obey
/// before it is written to the database.
pub fn resolve_lines(
    lines: &[LineDetails],
    accounts: &AccountCollection,
) -> Result<Vec<JournalLine>> {
    if lines.len() < 2 {
        return Err(BooksError::invalid(
            "entry",
            "an entry needs at least two lines",
        ));
    }

    let mut totals = Totals::default();
    let mut resolved = Vec::with_capacity(lines.len());

    for line in lines {
        let acc = accounts
            .lookup(line.account)
            .ok_or_else(|| BooksError::not_found("account", line.account))?;
        if acc.closed {
            return Err(BooksError::invalid(
                "line",
                format!("account {} is closed", acc.code),
            ));
        }
        if line.operation.amount() <= Decimal::ZERO {
            return Err(BooksError::invalid(
                "amount",
                format!(
                    "{} for account {} must be positive",
                    line.operation.amount(),
                    acc.code
                ),
            ));
        }
        totals.apply(&line.operation);
        resolved.push(JournalLine {
            account: acc.id,
            operation: line.operation,
            memo: clean_text(line.memo),
        });
    }

    if totals.debit != totals.credit {
        return Err(BooksError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod test {
    use crate::accounts::test::build_account;
    use crate::accounts::{AccountCollection, AccountId};
    use crate::amounts::Operation;
    use crate::errors::BooksError;
    use crate::transactions::{resolve_lines, LineDetails};
    use rust_decimal_macros::dec;

    fn chart() -> AccountCollection {
        let mut coll = AccountCollection::default();
        coll.add(build_account(1, "1010", "Cash", None));
        coll.add(build_account(2, "4000", "Sales", None));
        let mut closed = build_account(3, "5000", "Old", None);
        closed.closed = true;
        coll.add(closed);
        coll
    }

    #[test]
    fn test_parse_line() {
        let l = LineDetails::parse("1010=125.50", true).unwrap();
        assert_eq!(l.account, "1010");
        assert_eq!(l.operation, Operation::Debit(dec!(125.50)));
        assert_eq!(l.memo, None);

        let l = LineDetails::parse(" Sales = 3 : cash sale ", false).unwrap();
        assert_eq!(l.account, "Sales");
        assert_eq!(l.operation, Operation::Credit(dec!(3)));
        assert_eq!(l.memo, Some("cash sale"));

        assert!(LineDetails::parse("1010", true).is_err());
        assert!(LineDetails::parse("1010=abc", true).is_err());
    }

    #[test]
    fn test_resolve() {
        let coll = chart();
        let lines = [
            LineDetails::parse("1010=100", true).unwrap(),
            LineDetails::parse("sales=100:march", false).unwrap(),
        ];
        let resolved = resolve_lines(&lines, &coll).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].account, AccountId(2));
        assert_eq!(resolved[1].memo.as_deref(), Some("march"));
    }

    #[test]
    fn test_resolve_errors() {
        let coll = chart();

        let single = [LineDetails::parse("1010=100", true).unwrap()];
        assert!(matches!(
            resolve_lines(&single, &coll),
            Err(BooksError::Invalid { .. })
        ));

        let unbalanced = [
            LineDetails::parse("1010=100", true).unwrap(),
            LineDetails::parse("4000=90", false).unwrap(),
        ];
        match resolve_lines(&unbalanced, &coll) {
            Err(BooksError::Unbalanced { debit, credit }) => {
                assert_eq!(debit, dec!(100));
                assert_eq!(credit, dec!(90));
            }
            _ => panic!("expected an unbalanced error"),
        }

        let negative = [
            LineDetails::parse("1010=-5", true).unwrap(),
            LineDetails::parse("4000=-5", false).unwrap(),
        ];
        assert!(resolve_lines(&negative, &coll).is_err());

        let closed = [
            LineDetails::parse("5000=5", true).unwrap(),
            LineDetails::parse("4000=5", false).unwrap(),
        ];
        assert!(resolve_lines(&closed, &coll).is_err());

        let unknown = [
            LineDetails::parse("9999=5", true).unwrap(),
            LineDetails::parse("4000=5", false).unwrap(),
        ];
        assert!(matches!(
            resolve_lines(&unknown, &coll),
            Err(BooksError::NotFound { .. })
        ));
    }
}
