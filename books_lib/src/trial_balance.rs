use crate::account_categories::AccountCategory;
use crate::accounts::{AccountId, AccountNameDepth};
use crate::amounts::Totals;
use crate::repositories::Repository;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Default)]
pub struct Settings {
    // Show all accounts, even those that never received a line
    pub include_empty: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceRow {
    pub account: AccountId,
    pub code: String,
    pub name: String,
    pub category: Option<AccountCategory>,

    // All debits and credits posted to the account
    pub totals: Totals,

    // The net balance, in exactly one of the two columns (or none when the
    // account is balanced)
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

impl TrialBalance {
    pub fn new(repo: &Repository, as_of: NaiveDate, settings: &Settings) -> Self {
        let balances = repo.balances_as_of(as_of);
        let mut result = TrialBalance {
            as_of,
            rows: Vec::new(),
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
        };

        for acc in repo.iter_accounts() {
            let totals = balances.get(&acc.id).copied();
            if totals.is_none() && !settings.include_empty {
                continue;
            }
            let totals = totals.unwrap_or_default();
            let net = totals.net_debit();
            let (debit, credit) = if net.is_sign_negative() {
                (Decimal::ZERO, -net)
            } else {
                (net, Decimal::ZERO)
            };
            result.total_debit += debit;
            result.total_credit += credit;
            result.rows.push(TrialBalanceRow {
                account: acc.id,
                code: acc.code.clone(),
                name: repo.get_account_name(acc.id, AccountNameDepth::unlimited()),
                category: repo.category_of(acc),
                totals,
                debit,
                credit,
            });
        }
        result.rows.sort_by(|r1, r2| r1.code.cmp(&r2.code));
        result
    }

    /// Whether total debits equal total credits.  This is always true when
    /// all entries were validated before posting.
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

#[cfg(test)]
mod test {
    use crate::chart::STANDARD_CHART;
    use crate::database::test::{day, post, setup};
    use crate::repositories::Repository;
    use crate::trial_balance::{Settings, TrialBalance};
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trial_balance() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(&mut db, &session, day(2024, 1, 1), &["1010=1000"], &["3000=1000"])
                .await;
            post(
                &mut db,
                &session,
                day(2024, 1, 10),
                &["6010=300", "6030=50"],
                &["1010=350"],
            )
            .await;
            post(&mut db, &session, day(2024, 2, 1), &["1100=400"], &["4100=400"])
                .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();

            let tb = TrialBalance::new(&repo, day(2024, 1, 31), &Settings::default());
            assert!(tb.is_balanced());
            assert_eq!(tb.total_debit, dec!(1000));
            let codes: Vec<&str> = tb.rows.iter().map(|r| r.code.as_str()).collect();
            assert_eq!(codes, ["1010", "3000", "6010", "6030"]);

            let bank = &tb.rows[0];
            assert_eq!(bank.totals.debit, dec!(1000));
            assert_eq!(bank.totals.credit, dec!(350));
            assert_eq!(bank.debit, dec!(650));
            assert_eq!(bank.credit, dec!(0));
            assert_eq!(tb.rows[1].credit, dec!(1000));

            let tb = TrialBalance::new(
                &repo,
                day(2024, 12, 31),
                &Settings {
                    include_empty: true,
                },
            );
            assert!(tb.is_balanced());
            assert_eq!(tb.rows.len(), STANDARD_CHART.len());
            assert_eq!(tb.total_credit, dec!(1400));
        });
    }
}
