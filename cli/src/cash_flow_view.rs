use crate::tables::{Column, Table, Width};
use books_lib::cash_flows::CashFlowStatement;
use books_lib::repositories::Repository;
use console::Term;
use rust_decimal::Decimal;

struct Row {
    code: String,
    label: String,
    amount: Option<Decimal>,
}

impl Row {
    fn header(label: String) -> Self {
        Row {
            code: String::new(),
            label,
            amount: None,
        }
    }

    fn total(label: &str, amount: Decimal) -> Self {
        Row {
            code: String::new(),
            label: label.to_string(),
            amount: Some(amount),
        }
    }
}

pub fn cash_flow_view(
    repo: &Repository,
    statement: &CashFlowStatement,
    table_settings: &crate::tables::Settings,
) -> String {
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

    let title = match statement.period.start {
        None => format!("Cash flows up to {}", statement.period.end),
        Some(s) => {
            format!("Cash flows from {} to {}", s, statement.period.end)
        }
    };
    let mut table = Table::new(columns, table_settings)
        .with_title(&title)
        .with_col_headers();

    for s in &statement.sections {
        table.add_row(&Row::header(s.section.to_string()), 0);
        for r in &s.rows {
            table.add_row(
                &Row {
                    code: r.code.clone(),
                    label: r.name.clone(),
                    amount: Some(r.amount),
                },
                1,
            );
        }
        table.add_row(
            &Row::total(&format!("Net cash from {}", s.section), s.total),
            0,
        );
        table.add_separator();
    }
    table.add_row(&Row::total("Net change in cash", statement.net_change), 0);
    table.add_row(&Row::total("Cash at beginning", statement.opening_cash), 0);
    table.add_row(&Row::total("Cash at end", statement.closing_cash), 0);
    table.to_string(Term::stdout().size().1 as usize)
}
