use crate::account_categories::AccountCategory;
use crate::accounts::AccountId;
use crate::amounts::Totals;
use crate::repositories::Repository;
use crate::trees::Tree;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

pub struct Settings {
    // Do not show accounts whose amount is zero (unless they have children
    // with a non-zero amount)
    pub hide_zero_rows: bool,

    // If true, parents' amounts also include all their children
    pub subtotals: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hide_zero_rows: true,
            subtotals: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementRow {
    // None for computed rows, like current earnings
    pub account: Option<AccountId>,
    pub code: String,
    pub name: String,
    pub depth: usize,
    pub amount: Decimal,
}

/// All accounts of one category, organized as a tree and flattened for
/// display.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub category: AccountCategory,
    pub rows: Vec<StatementRow>,
    pub total: Decimal,
}

impl Section {
    /// Amounts are signed by the category's normal balance, so that
    /// revenues, liabilities and equity are positive when credited.
    pub fn new(
        repo: &Repository,
        category: AccountCategory,
        balances: &HashMap<AccountId, Totals>,
        settings: &Settings,
    ) -> Self {
        let normal = category.normal_balance();
        let mut tree: Tree<AccountId, Decimal> = Tree::default();
        let mut total = Decimal::ZERO;

        for acc in repo
            .iter_accounts()
            .filter(|acc| repo.category_of(acc) == Some(category))
        {
            let amount = balances
                .get(&acc.id)
                .map(|t| t.balance(normal))
                .unwrap_or_default();
            total += amount;
            *tree.get_or_create(
                &acc.id,
                repo.iter_parents(acc).map(|p| p.id),
                |_| Decimal::ZERO,
            ) += amount;
        }

        if settings.subtotals {
            tree.cumulate();
        }
        if settings.hide_zero_rows {
            tree.retain(|node| {
                node.has_children() || !node.data.data.is_zero()
            });
        }
        let code = |id: &AccountId| {
            repo.get_account(*id).map(|a| a.code.as_str()).unwrap_or_default()
        };
        tree.sort_by(|n1, n2| code(&n1.key).cmp(code(&n2.key)));

        let mut rows = Vec::new();
        tree.traverse(|node| {
            let acc = repo.get_account(node.data.key);
            rows.push(StatementRow {
                account: Some(node.data.key),
                code: acc.map(|a| a.code.clone()).unwrap_or_default(),
                name: acc.map(|a| a.name.clone()).unwrap_or_default(),
                depth: node.data.depth,
                amount: node.data.data,
            });
        });

        Section {
            category,
            rows,
            total,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::account_categories::AccountCategory;
    use crate::database::test::{day, post, setup};
    use crate::repositories::Repository;
    use crate::statements::{Section, Settings};
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    #[test]
    fn test_section_tree() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(
                &mut db,
                &session,
                day(2024, 1, 10),
                &["6010=300", "6030=50", "5000=25"],
                &["1010=375"],
            )
            .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();
            let balances = repo.balances_as_of(day(2024, 12, 31));

            let s = Section::new(
                &repo,
                AccountCategory::EXPENSE,
                &balances,
                &Settings::default(),
            );
            let rows: Vec<_> = s
                .rows
                .iter()
                .map(|r| (r.code.as_str(), r.depth, r.amount))
                .collect();
            assert_eq!(
                rows,
                [
                    ("5000", 0, dec!(25)),
                    ("6000", 0, dec!(350)),
                    ("6010", 1, dec!(300)),
                    ("6030", 1, dec!(50)),
                ]
            );
            assert_eq!(s.total, dec!(375));

            let s = Section::new(
                &repo,
                AccountCategory::EXPENSE,
                &balances,
                &Settings {
                    hide_zero_rows: false,
                    subtotals: false,
                },
            );
            assert_eq!(s.rows.len(), 7);
            assert_eq!(s.rows[1].amount, dec!(0));
            assert_eq!(s.total, dec!(375));
        });
    }
}
