use crate::tables::{Column, ColumnFooter, Table, Width};
use books_lib::accounts::AccountNameDepth;
use books_lib::repositories::Repository;
use books_lib::transactions::JournalEntry;
use console::Term;
use itertools::{Itertools, Position};
use rust_decimal::Decimal;

#[derive(Default)]
struct Row {
    id: String,
    date: String,
    reference: String,
    account: String,
    memo: String,
    debit: Decimal,
    credit: Decimal,
}

/// Entries, with one row for the header then one row per line
pub fn journal_view<'a>(
    repo: &Repository,
    entries: impl IntoIterator<Item = &'a JournalEntry>,
    table_settings: &crate::tables::Settings,
) -> String {
    let id_image = |row: &Row, _: &()| row.id.clone();
    let date_image = |row: &Row, _: &()| row.date.clone();
    let ref_image = |row: &Row, _: &()| row.reference.clone();
    let account_image = |row: &Row, _: &()| row.account.clone();
    let memo_image = |row: &Row, _: &()| row.memo.clone();
    let debit_image = |row: &Row, _: &()| repo.format.display(row.debit);
    let credit_image = |row: &Row, _: &()| repo.format.display(row.credit);

    let columns = vec![
        Column::new((), &id_image)
            .with_title("Id")
            .with_footer(ColumnFooter::Hide),
        Column::new((), &date_image)
            .with_title("Date")
            .with_footer(ColumnFooter::Hide),
        Column::new((), &ref_image)
            .with_title("Ref")
            .with_footer(ColumnFooter::Hide),
        Column::new((), &account_image)
            .show_indent()
            .with_title("Account")
            .with_width(Width::ExpandWithMin(8)),
        Column::new((), &memo_image)
            .with_title("Memo")
            .with_width(Width::ExpandWithMin(5))
            .with_footer(ColumnFooter::Hide),
        Column::new((), &debit_image).amount("Debit"),
        Column::new((), &credit_image).amount("Credit"),
    ];
    let mut table = Table::new(columns, table_settings).with_col_headers();
    let mut total = Row {
        account: "Total".into(),
        ..Row::default()
    };

    for (pos, e) in entries.into_iter().with_position() {
        if let Position::Middle | Position::Last = pos {
            table.add_separator();
        }
        table.add_row(
            &Row {
                id: e.id.0.to_string(),
                date: e.date.to_string(),
                reference: e.reference.clone().unwrap_or_default(),
                memo: e.memo.clone().unwrap_or_default(),
                ..Row::default()
            },
            0,
        );
        for line in &e.lines {
            let row = Row {
                account: repo.get_account_name(
                    line.account,
                    AccountNameDepth::unlimited(),
                ),
                memo: line.memo.clone().unwrap_or_default(),
                debit: line.operation.debit(),
                credit: line.operation.credit(),
                ..Row::default()
            };
            total.debit += row.debit;
            total.credit += row.credit;
            table.add_row(&row, 1);
        }
    }
    table.add_footer(&total);
    table.to_string(Term::stdout().size().1 as usize)
}
