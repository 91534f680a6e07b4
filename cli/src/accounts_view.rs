use crate::tables::{Column, Table, Width};
use books_lib::account_kinds::{AccountKind, AccountKindCollection};
use books_lib::accounts::{Account, AccountCollection, AccountId};
use books_lib::trees::Tree;
use console::Term;

pub struct Settings {
    // Do not show closed accounts
    pub hide_closed: bool,

    pub table: crate::tables::Settings,
}

/// The chart of accounts, children below their parent
pub fn accounts_view(
    accounts: &AccountCollection,
    kinds: &AccountKindCollection,
    settings: &Settings,
) -> String {
    let kind = |acc: &Account| kinds.get(acc.kind);

    let mut tree: Tree<AccountId, ()> = Tree::default();
    for acc in accounts.iter() {
        tree.get_or_create(
            &acc.id,
            accounts.iter_parents(acc).map(|p| p.id),
            |_| (),
        );
    }
    if settings.hide_closed {
        tree.retain(|node| {
            node.has_children()
                || accounts.get(node.data.key).is_some_and(|a| !a.closed)
        });
    }
    let code = |id: &AccountId| {
        accounts.get(*id).map(|a| a.code.as_str()).unwrap_or_default()
    };
    tree.sort_by(|n1, n2| code(&n1.key).cmp(code(&n2.key)));

    let code_image = |acc: &Account, _: &()| acc.code.clone();
    let name_image = |acc: &Account, _: &()| acc.name.clone();
    let kind_image = |acc: &Account, _: &()| {
        kind(acc).map(|k| k.name.clone()).unwrap_or_default()
    };
    let category_image = |acc: &Account, _: &()| {
        kind(acc).map(|k| k.category.to_string()).unwrap_or_default()
    };
    let status_image = |acc: &Account, _: &()| {
        if acc.closed { "closed".to_string() } else { String::new() }
    };
    let descr_image = |acc: &Account, _: &()| {
        acc.description.clone().unwrap_or_default()
    };

    let columns = vec![
        Column::new((), &code_image).with_title("Code"),
        Column::new((), &name_image)
            .show_indent()
            .with_title("Account")
            .with_width(Width::ExpandWithMin(8)),
        Column::new((), &kind_image).with_title("Kind"),
        Column::new((), &category_image).with_title("Category"),
        Column::new((), &status_image).with_title("Status"),
        Column::new((), &descr_image)
            .with_title("Description")
            .with_width(Width::ExpandWithMin(5)),
    ];
    let mut table = Table::new(columns, &settings.table).with_col_headers();
    tree.traverse(|node| {
        if let Some(acc) = accounts.get(node.data.key) {
            table.add_row(acc, node.data.depth);
        }
    });
    table.to_string(Term::stdout().size().1 as usize)
}

/// The kinds that can be given to accounts
pub fn kinds_view(
    kinds: &AccountKindCollection,
    settings: &crate::tables::Settings,
) -> String {
    let name_image = |k: &AccountKind, _: &()| k.name.clone();
    let category_image = |k: &AccountKind, _: &()| k.category.to_string();
    let cash_image = |k: &AccountKind, _: &()| {
        if k.is_cash { "cash".to_string() } else { String::new() }
    };
    let flow_image = |k: &AccountKind, _: &()| {
        if k.is_cash { String::new() } else { k.cash_flow.to_string() }
    };
    let columns = vec![
        Column::new((), &name_image).with_title("Kind"),
        Column::new((), &category_image).with_title("Category"),
        Column::new((), &cash_image).with_title("Cash"),
        Column::new((), &flow_image).with_title("Cash flow"),
    ];
    let mut table = Table::new(columns, settings).with_col_headers();
    for (_, k) in kinds.iter() {
        table.add_row(k, 0);
    }
    table.to_string(Term::stdout().size().1 as usize)
}
