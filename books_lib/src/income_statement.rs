use crate::account_categories::AccountCategory;
use crate::periods::Period;
use crate::repositories::Repository;
use crate::statements::{Section, Settings};
use rust_decimal::Decimal;
use serde::Serialize;

/// Revenues and expenses over a period.
#[derive(Debug, Serialize)]
pub struct IncomeStatement {
    pub period: Period,
    pub revenue: Section,
    pub expenses: Section,
    pub net_income: Decimal,
}

impl IncomeStatement {
    pub fn new(repo: &Repository, period: Period, settings: &Settings) -> Self {
        let balances = repo.balances(&period);
        let revenue =
            Section::new(repo, AccountCategory::REVENUE, &balances, settings);
        let expenses =
            Section::new(repo, AccountCategory::EXPENSE, &balances, settings);
        IncomeStatement {
            period,
            net_income: revenue.total - expenses.total,
            revenue,
            expenses,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::database::test::{day, post, setup};
    use crate::income_statement::IncomeStatement;
    use crate::periods::Period;
    use crate::repositories::Repository;
    use crate::statements::Settings;
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    #[test]
    fn test_income_statement() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(&mut db, &session, day(2023, 12, 20), &["1000=999"], &["4000=999"])
                .await;
            post(&mut db, &session, day(2024, 1, 5), &["1000=1200"], &["4000=1200"])
                .await;
            post(&mut db, &session, day(2024, 1, 6), &["1100=300"], &["4100=300"])
                .await;
            post(&mut db, &session, day(2024, 1, 31), &["6010=800"], &["1010=800"])
                .await;
            // A refund reduces revenue
            post(&mut db, &session, day(2024, 2, 2), &["4000=200"], &["1000=200"])
                .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();

            let period = Period::parse("2024", day(2024, 6, 1)).unwrap();
            let is = IncomeStatement::new(&repo, period, &Settings::default());
            assert_eq!(is.revenue.total, dec!(1300));
            assert_eq!(is.expenses.total, dec!(800));
            assert_eq!(is.net_income, dec!(500));
            assert_eq!(is.revenue.rows.len(), 2);

            // A loss
            let jan31 = Period::parse("2024-01-31", day(2024, 6, 1)).unwrap();
            let is = IncomeStatement::new(&repo, jan31, &Settings::default());
            assert!(is.revenue.rows.is_empty());
            assert_eq!(is.net_income, dec!(-800));
        });
    }
}
