use crate::account_categories::NormalBalance;
use crate::accounts::{AccountId, AccountNameDepth};
use crate::amounts::Totals;
use crate::errors::{BooksError, Result};
use crate::periods::Period;
use crate::repositories::Repository;
use crate::transactions::EntryId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Default)]
pub struct Settings {
    // Also show the lines of all the account's descendants
    pub include_subaccounts: bool,
}

/// One line of the ledger
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub entry: EntryId,
    pub position: usize,
    pub account: AccountId,
    pub reference: Option<String>,
    pub memo: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,

    // Balance after this line, positive when on the account's normal side
    pub balance: Decimal,
}

/// The history of one account over a period, with a running balance.
#[derive(Debug, Serialize)]
pub struct Ledger {
    pub account: AccountId,
    pub account_name: String,
    pub normal_balance: NormalBalance,
    pub period: Period,
    pub opening: Decimal,
    pub rows: Vec<LedgerRow>,
    pub totals: Totals,
    pub closing: Decimal,
}

impl Ledger {
    pub fn new(
        repo: &Repository,
        account: AccountId,
        period: Period,
        settings: &Settings,
    ) -> Result<Self> {
        let acc = repo
            .get_account(account)
            .ok_or_else(|| BooksError::not_found("account", account.0))?;
        let normal = repo
            .category_of(acc)
            .ok_or_else(|| BooksError::not_found("account kind", acc.kind.0))?
            .normal_balance();

        let applies = |id: AccountId| {
            id == account
                || (settings.include_subaccounts
                    && repo
                        .get_account(id)
                        .is_some_and(|a| repo.iter_parents(a).any(|p| p.id == account)))
        };

        let mut result = Ledger {
            account,
            account_name: repo
                .get_account_name(account, AccountNameDepth::unlimited()),
            normal_balance: normal,
            period,
            opening: Decimal::ZERO,
            rows: Vec::new(),
            totals: Totals::default(),
            closing: Decimal::ZERO,
        };

        // A single pass: lines before the period only contribute to the
        // opening balance.
        let mut balance = Decimal::ZERO;
        for e in repo.iter_entries() {
            if e.date > period.end {
                break;
            }
            let before = period.is_before(e.date);
            for (position, line) in e.lines.iter().enumerate() {
                if !applies(line.account) {
                    continue;
                }
                balance += line.operation.signed(normal);
                if before {
                    result.opening = balance;
                } else {
                    result.totals.apply(&line.operation);
                    result.rows.push(LedgerRow {
                        date: e.date,
                        entry: e.id,
                        position,
                        account: line.account,
                        reference: e.reference.clone(),
                        memo: e.line_memo(line).map(str::to_string),
                        debit: line.operation.debit(),
                        credit: line.operation.credit(),
                        balance,
                    });
                }
            }
        }
        result.closing = balance;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use crate::database::test::{day, post, setup};
    use crate::ledger::{Ledger, Settings};
    use crate::periods::Period;
    use crate::repositories::Repository;
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    #[test]
    fn test_running_balance() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(&mut db, &session, day(2024, 1, 5), &["1000=500"], &["3000=500"])
                .await;
            post(&mut db, &session, day(2024, 2, 1), &["6010=120"], &["1000=120"])
                .await;
            post(&mut db, &session, day(2024, 2, 10), &["1000=80"], &["4000=80"])
                .await;
            post(&mut db, &session, day(2024, 3, 1), &["6020=50"], &["1000=50"])
                .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();
            let cash = repo.find_account("1000").unwrap().id;

            let feb = Period::parse("2024-02", day(2024, 12, 31)).unwrap();
            let ledger =
                Ledger::new(&repo, cash, feb, &Settings::default()).unwrap();
            assert_eq!(ledger.opening, dec!(500));
            assert_eq!(ledger.rows.len(), 2);
            assert_eq!(ledger.rows[0].credit, dec!(120));
            assert_eq!(ledger.rows[0].balance, dec!(380));
            assert_eq!(ledger.rows[1].balance, dec!(460));
            assert_eq!(ledger.closing, dec!(460));
            assert_eq!(
                ledger.opening + ledger.totals.net_debit(),
                ledger.closing
            );

            // Revenue accounts grow with credits
            let sales = repo.find_account("4000").unwrap().id;
            let all = Period::up_to(day(2024, 12, 31));
            let ledger =
                Ledger::new(&repo, sales, all, &Settings::default()).unwrap();
            assert_eq!(ledger.opening, dec!(0));
            assert_eq!(ledger.closing, dec!(80));

            // Parent account, with and without its children
            let opex = repo.find_account("6000").unwrap().id;
            let ledger =
                Ledger::new(&repo, opex, all, &Settings::default()).unwrap();
            assert!(ledger.rows.is_empty());
            let ledger = Ledger::new(
                &repo,
                opex,
                all,
                &Settings {
                    include_subaccounts: true,
                },
            )
            .unwrap();
            assert_eq!(ledger.rows.len(), 2);
            assert_eq!(ledger.closing, dec!(170));
        });
    }
}
