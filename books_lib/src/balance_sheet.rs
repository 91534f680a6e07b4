use crate::account_categories::AccountCategory;
use crate::repositories::Repository;
use crate::statements::{Section, Settings, StatementRow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Assets, liabilities and equity as of a given day.
/// Revenues and expenses are not closed into equity by entries, so the
/// cumulated net income is shown as a computed equity row.
#[derive(Debug, Serialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: Section,
    pub liabilities: Section,
    pub equity: Section,

    // Net income of all entries up to as_of
    pub current_earnings: Decimal,
}

impl BalanceSheet {
    pub fn new(repo: &Repository, as_of: NaiveDate, settings: &Settings) -> Self {
        let balances = repo.balances_as_of(as_of);
        let section =
            |category| Section::new(repo, category, &balances, settings);
        let revenue = section(AccountCategory::REVENUE).total;
        let expenses = section(AccountCategory::EXPENSE).total;
        let current_earnings = revenue - expenses;

        let mut equity = section(AccountCategory::EQUITY);
        if !current_earnings.is_zero() || !settings.hide_zero_rows {
            equity.rows.push(StatementRow {
                account: None,
                code: String::new(),
                name: "Current earnings".into(),
                depth: 0,
                amount: current_earnings,
            });
        }
        equity.total += current_earnings;

        BalanceSheet {
            as_of,
            assets: section(AccountCategory::ASSET),
            liabilities: section(AccountCategory::LIABILITY),
            equity,
            current_earnings,
        }
    }

    /// Whether assets = liabilities + equity
    pub fn is_balanced(&self) -> bool {
        self.assets.total == self.liabilities.total + self.equity.total
    }
}

#[cfg(test)]
mod test {
    use crate::balance_sheet::BalanceSheet;
    use crate::database::test::{day, post, setup};
    use crate::repositories::Repository;
    use crate::statements::Settings;
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_sheet() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(&mut db, &session, day(2024, 1, 1), &["1010=5000"], &["3000=5000"])
                .await;
            post(&mut db, &session, day(2024, 1, 2), &["1500=3000"], &["1010=1000", "2500=2000"])
                .await;
            post(&mut db, &session, day(2024, 1, 3), &["1100=700"], &["4000=700"])
                .await;
            post(&mut db, &session, day(2024, 1, 4), &["6010=250"], &["2000=250"])
                .await;
            post(&mut db, &session, day(2024, 1, 5), &["3100=100"], &["1010=100"])
                .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();

            let bs = BalanceSheet::new(&repo, day(2024, 1, 31), &Settings::default());
            assert_eq!(bs.assets.total, dec!(7600));
            assert_eq!(bs.liabilities.total, dec!(2250));
            assert_eq!(bs.current_earnings, dec!(450));
            // capital 5000, drawings -100, earnings 450
            assert_eq!(bs.equity.total, dec!(5350));
            assert!(bs.is_balanced());
            let last = bs.equity.rows.last().unwrap();
            assert_eq!(last.name, "Current earnings");
            assert!(last.account.is_none());

            // Before any entry
            let bs = BalanceSheet::new(&repo, day(2023, 12, 31), &Settings::default());
            assert!(bs.assets.rows.is_empty());
            assert!(bs.equity.rows.is_empty());
            assert!(bs.is_balanced());
        });
    }
}
