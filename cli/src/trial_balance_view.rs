use crate::tables::{Column, Table, Width};
use books_lib::repositories::Repository;
use books_lib::trial_balance::{TrialBalance, TrialBalanceRow};
use console::Term;

enum Row<'a> {
    Account(&'a TrialBalanceRow),
    Total(&'a TrialBalance),
}

pub fn trial_balance_view(
    repo: &Repository,
    trial: &TrialBalance,
    table_settings: &crate::tables::Settings,
) -> String {
    let fmt = &repo.format;
    let code_image = |row: &Row, _: &()| match row {
        Row::Account(r) => r.code.clone(),
        Row::Total(_) => String::new(),
    };
    let name_image = |row: &Row, _: &()| match row {
        Row::Account(r) => r.name.clone(),
        Row::Total(_) => "Total".to_string(),
    };
    let category_image = |row: &Row, _: &()| match row {
        Row::Account(r) => {
            r.category.map(|c| c.to_string()).unwrap_or_default()
        }
        Row::Total(_) => String::new(),
    };
    let debit_image = |row: &Row, _: &()| match row {
        Row::Account(r) => fmt.display(r.debit),
        Row::Total(t) => fmt.display_total(t.total_debit),
    };
    let credit_image = |row: &Row, _: &()| match row {
        Row::Account(r) => fmt.display(r.credit),
        Row::Total(t) => fmt.display_total(t.total_credit),
    };

    let columns = vec![
        Column::new((), &code_image).with_title("Code"),
        Column::new((), &name_image)
            .with_title("Account")
            .with_width(Width::ExpandWithMin(8)),
        Column::new((), &category_image).with_title("Category"),
        Column::new((), &debit_image).amount("Debit"),
        Column::new((), &credit_image).amount("Credit"),
    ];
    let mut table = Table::new(columns, table_settings)
        .with_title(&format!("Trial balance as of {}", trial.as_of))
        .with_col_headers();
    for r in &trial.rows {
        table.add_row(&Row::Account(r), 0);
    }
    table.add_footer(&Row::Total(trial));

    let mut out = table.to_string(Term::stdout().size().1 as usize);
    if !trial.is_balanced() {
        out.push_str(&format!(
            "OUT OF BALANCE by {}\n",
            fmt.display_total(trial.total_debit - trial.total_credit)
        ));
    }
    out
}

#[cfg(test)]
mod test {
    use crate::trial_balance_view::trial_balance_view;
    use books_lib::account_categories::AccountCategory;
    use books_lib::account_kinds::AccountKindCollection;
    use books_lib::accounts::{AccountCollection, AccountId};
    use books_lib::amounts::Totals;
    use books_lib::repositories::Repository;
    use books_lib::trial_balance::{TrialBalance, TrialBalanceRow};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trial_balance_view() {
        let repo = Repository::new(
            AccountCollection::default(),
            AccountKindCollection::default(),
            Vec::new(),
        );
        let row = |id, code: &str, debit, credit| TrialBalanceRow {
            account: AccountId(id),
            code: code.into(),
            name: format!("Account {code}"),
            category: Some(AccountCategory::ASSET),
            totals: Totals { debit, credit },
            debit,
            credit,
        };
        let mut trial = TrialBalance {
            as_of: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            rows: vec![
                row(1, "1010", dec!(1000), Decimal::ZERO),
                row(2, "3000", Decimal::ZERO, dec!(1000)),
            ],
            total_debit: dec!(1000),
            total_credit: dec!(1000),
        };
        let settings = crate::tables::Settings::default();
        let out = trial_balance_view(&repo, &trial, &settings);
        assert!(out.contains("Trial balance as of 2024-12-31"));
        assert!(out.contains("Account 3000"));
        assert!(!out.contains("OUT OF BALANCE"));

        trial.total_credit = dec!(900);
        let out = trial_balance_view(&repo, &trial, &settings);
        assert!(out.ends_with("OUT OF BALANCE by $ 100.00\n"));
    }
}
