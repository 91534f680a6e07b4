use crate::tables::{Column, Table, Width};
use books_lib::balance_sheet::BalanceSheet;
use books_lib::income_statement::IncomeStatement;
use books_lib::repositories::Repository;
use books_lib::statements::Section;
use console::Term;
use rust_decimal::Decimal;

struct Row {
    code: String,
    label: String,
    amount: Option<Decimal>,
}

type StatementTable<'a> = Table<'a, Row, ()>;

fn add_section(
    table: &mut StatementTable,
    section: &Section,
    total_label: &str,
) {
    table.add_row(
        &Row {
            code: String::new(),
            label: section.category.to_string(),
            amount: None,
        },
        0,
    );
    for r in &section.rows {
        table.add_row(
            &Row {
                code: r.code.clone(),
                label: r.name.clone(),
                amount: Some(r.amount),
            },
            r.depth + 1,
        );
    }
    add_total(table, total_label, section.total);
}

fn add_total(table: &mut StatementTable, label: &str, amount: Decimal) {
    table.add_separator();
    table.add_row(
        &Row {
            code: String::new(),
            label: label.to_string(),
            amount: Some(amount),
        },
        0,
    );
}

fn render<F>(
    repo: &Repository,
    settings: &crate::tables::Settings,
    title: &str,
    fill: F,
) -> String
where
    F: FnOnce(&mut StatementTable),
{
    let code_image = |row: &Row, _: &()| row.code.clone();
    let label_image = |row: &Row, _: &()| row.label.clone();
    let amount_image = |row: &Row, _: &()| match row.amount {
        None => String::new(),
        Some(a) => repo.format.display_total(a),
    };
    let columns = vec![
        Column::new((), &code_image).with_title("Code"),
        Column::new((), &label_image)
            .show_indent()
            .with_title("Account")
            .with_width(Width::ExpandWithMin(8)),
        Column::new((), &amount_image).amount("Amount"),
    ];
    let mut table = Table::new(columns, settings)
        .with_title(title)
        .with_col_headers();
    fill(&mut table);
    table.to_string(Term::stdout().size().1 as usize)
}

pub fn income_statement_view(
    repo: &Repository,
    statement: &IncomeStatement,
    settings: &crate::tables::Settings,
) -> String {
    let title = match statement.period.start {
        None => format!("Income statement up to {}", statement.period.end),
        Some(s) => format!(
            "Income statement from {} to {}",
            s, statement.period.end
        ),
    };
    render(repo, settings, &title, |table| {
        add_section(table, &statement.revenue, "Total revenue");
        table.add_separator();
        add_section(table, &statement.expenses, "Total expenses");
        add_total(table, "Net income", statement.net_income);
    })
}

pub fn balance_sheet_view(
    repo: &Repository,
    sheet: &BalanceSheet,
    settings: &crate::tables::Settings,
) -> String {
    let title = format!("Balance sheet as of {}", sheet.as_of);
    let mut out = render(repo, settings, &title, |table| {
        add_section(table, &sheet.assets, "Total assets");
        table.add_separator();
        add_section(table, &sheet.liabilities, "Total liabilities");
        table.add_separator();
        add_section(table, &sheet.equity, "Total equity");
        add_total(
            table,
            "Total liabilities and equity",
            sheet.liabilities.total + sheet.equity.total,
        );
    });
    if !sheet.is_balanced() {
        out.push_str(&format!(
            "OUT OF BALANCE by {}\n",
            repo.format.display_total(
                sheet.assets.total
                    - sheet.liabilities.total
                    - sheet.equity.total
            )
        ));
    }
    out
}
