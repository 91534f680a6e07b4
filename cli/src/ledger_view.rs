use crate::tables::{Column, ColumnFooter, Table, Width};
use books_lib::accounts::AccountNameDepth;
use books_lib::ledger::{Ledger, LedgerRow};
use books_lib::repositories::Repository;
use console::Term;
use rust_decimal::Decimal;

pub struct Settings {
    // Show which account each line applies to, useful when the ledger
    // includes sub-accounts
    pub column_account: bool,

    pub table: crate::tables::Settings,
}

enum Row<'a> {
    Opening(Decimal),
    Line(&'a LedgerRow),
    Closing(&'a Ledger),
}

pub fn ledger_view(
    repo: &Repository,
    ledger: &Ledger,
    settings: &Settings,
) -> String {
    let fmt = &repo.format;
    let date_image = |row: &Row, _: &()| match row {
        Row::Line(r) => r.date.to_string(),
        Row::Opening(_) | Row::Closing(_) => String::new(),
    };
    let entry_image = |row: &Row, _: &()| match row {
        Row::Line(r) => r.entry.0.to_string(),
        Row::Opening(_) | Row::Closing(_) => String::new(),
    };
    let ref_image = |row: &Row, _: &()| match row {
        Row::Line(r) => r.reference.clone().unwrap_or_default(),
        Row::Opening(_) | Row::Closing(_) => String::new(),
    };
    let account_image = |row: &Row, _: &()| match row {
        Row::Line(r) => repo.get_account_name(r.account, AccountNameDepth(1)),
        Row::Opening(_) | Row::Closing(_) => String::new(),
    };
    let memo_image = |row: &Row, _: &()| match row {
        Row::Opening(_) => "Opening balance".to_string(),
        Row::Line(r) => r.memo.clone().unwrap_or_default(),
        Row::Closing(_) => "Total".to_string(),
    };
    let debit_image = |row: &Row, _: &()| match row {
        Row::Line(r) => fmt.display(r.debit),
        Row::Closing(l) => fmt.display_total(l.totals.debit),
        Row::Opening(_) => String::new(),
    };
    let credit_image = |row: &Row, _: &()| match row {
        Row::Line(r) => fmt.display(r.credit),
        Row::Closing(l) => fmt.display_total(l.totals.credit),
        Row::Opening(_) => String::new(),
    };
    let balance_image = |row: &Row, _: &()| match row {
        Row::Opening(b) => fmt.display_total(*b),
        Row::Line(r) => fmt.display_total(r.balance),
        Row::Closing(l) => fmt.display_total(l.closing),
    };

    let mut columns = vec![
        Column::new((), &date_image).with_title("Date"),
        Column::new((), &entry_image).with_title("Entry"),
        Column::new((), &ref_image).with_title("Ref"),
    ];
    if settings.column_account {
        columns.push(
            Column::new((), &account_image)
                .with_title("Account")
                .with_footer(ColumnFooter::Hide),
        );
    }
    columns.push(
        Column::new((), &memo_image)
            .with_title("Memo")
            .with_width(Width::ExpandWithMin(8)),
    );
    columns.push(Column::new((), &debit_image).amount("Debit"));
    columns.push(Column::new((), &credit_image).amount("Credit"));
    columns.push(Column::new((), &balance_image).amount("Balance"));

    let title = match ledger.period.start {
        None => format!("{} up to {}", ledger.account_name, ledger.period.end),
        Some(s) => format!(
            "{} from {} to {}",
            ledger.account_name, s, ledger.period.end
        ),
    };
    let mut table = Table::new(columns, &settings.table)
        .with_title(&title)
        .with_col_headers();
    table.add_row(&Row::Opening(ledger.opening), 0);
    for r in &ledger.rows {
        table.add_row(&Row::Line(r), 0);
    }
    table.add_footer(&Row::Closing(ledger));
    table.to_string(Term::stdout().size().1 as usize)
}

#[cfg(test)]
mod test {
    use crate::ledger_view::{Settings, ledger_view};
    use books_lib::account_categories::NormalBalance;
    use books_lib::account_kinds::AccountKindCollection;
    use books_lib::accounts::{AccountCollection, AccountId};
    use books_lib::amounts::Totals;
    use books_lib::ledger::{Ledger, LedgerRow};
    use books_lib::periods::Period;
    use books_lib::repositories::Repository;
    use books_lib::transactions::EntryId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ledger_view() {
        let repo = Repository::new(
            AccountCollection::default(),
            AccountKindCollection::default(),
            Vec::new(),
        );
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let row = |d, debit, credit, balance| LedgerRow {
            date: day(d),
            entry: EntryId(i64::from(d)),
            position: 0,
            account: AccountId(1),
            reference: None,
            memo: Some(format!("line {d}")),
            debit,
            credit,
            balance,
        };
        let ledger = Ledger {
            account: AccountId(1),
            account_name: "Checking Account".into(),
            normal_balance: NormalBalance::Debit,
            period: Period::new(Some(day(1)), day(31)).unwrap(),
            opening: dec!(100),
            rows: vec![
                row(3, dec!(50), dec!(0), dec!(150)),
                row(9, dec!(0), dec!(30), dec!(120)),
            ],
            totals: Totals { debit: dec!(50), credit: dec!(30) },
            closing: dec!(120),
        };
        let out = ledger_view(
            &repo,
            &ledger,
            &Settings {
                column_account: false,
                table: crate::tables::Settings::default(),
            },
        );
        let lines: Vec<&str> = out.lines().collect();
        // title, header, separator, opening, 2 rows, separator, footer
        assert_eq!(lines.len(), 8);
        assert!(lines.first().unwrap().contains(
            "Checking Account from 2024-01-01 to 2024-01-31"
        ));
        assert!(lines.get(3).unwrap().contains("Opening balance"));
        assert!(lines.get(3).unwrap().ends_with("$ 100.00"));
        assert!(lines.get(5).unwrap().ends_with("$ 120.00"));
        let footer = lines.last().unwrap();
        assert!(footer.contains("$ 50.00"));
        assert!(footer.contains("$ 30.00"));
        assert!(footer.ends_with("$ 120.00"));
    }
}
