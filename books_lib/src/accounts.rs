use crate::account_kinds::AccountKindId;
use crate::users::UserId;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;

/// How many levels of parents to show in account names.
/// With a depth of 1, only the account's own name is displayed.
#[derive(Clone, Copy, Debug)]
pub struct AccountNameDepth(pub usize);

impl AccountNameDepth {
    pub fn unlimited() -> Self {
        AccountNameDepth(usize::MAX)
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Default, PartialOrd, Ord, Serialize)]
pub struct AccountId(pub i64);

/// One account of the chart.
/// All accounts must have a kind, which gives them one of the five
/// categories:
///    - Assets:    what the user owns
///    - Liability: what the user owes
///    - Equity:    the owner's stake (capital, drawings,...)
///    - Revenue
///    - Expenses
///
/// Accounts can be organized in a tree (for instance "Bank:Checking"), but a
/// child always has the same category as its parent.  Both parents and
/// children can receive journal lines.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub user: UserId,

    // Short code used to refer to the account when typing entries, e.g. "1010"
    pub code: String,

    // Short name as displayed to users
    pub name: String,

    pub kind: AccountKindId,
    pub parent: Option<AccountId>,
    pub description: Option<String>,

    // A closed account can no longer receive new lines, but is still shown
    // in reports
    pub closed: bool,

    pub created_on: DateTime<Local>,
}

/// Details used to create a new account.
/// The kind and parent are given as they are typed by the user: the kind name
/// and the parent's code.
#[derive(Default, Clone, Copy)]
pub struct AccountDetails<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub kind: &'a str,
    pub parent: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Changes to an existing account.  Fields left to None are not modified.
/// For the parent, Some(None) detaches the account from its parent.
#[derive(Default, Clone, Copy)]
pub struct AccountChanges<'a> {
    pub code: Option<&'a str>,
    pub name: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub parent: Option<Option<&'a str>>,
    pub description: Option<Option<&'a str>>,
}

#[derive(Default)]
pub struct AccountCollection {
    accounts: Vec<Account>,
    index: HashMap<AccountId, usize>,
}

impl AccountCollection {
    pub fn add(&mut self, account: Account) -> AccountId {
        let id = account.id;
        self.index.insert(id, self.accounts.len());
        self.accounts.push(account);
        id
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(*self.index.get(&id)?)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Account> {
        let code = code.trim();
        self.accounts.iter().find(|a| a.code == code)
    }

    /// Case-insensitive lookup of the account's short name
    pub fn find_by_name(&self, name: &str) -> Option<&Account> {
        let name = name.trim().to_lowercase();
        self.accounts.iter().find(|a| a.name.to_lowercase() == name)
    }

    /// Lookup either by code or by name, codes first
    pub fn lookup(&self, code_or_name: &str) -> Option<&Account> {
        self.find_by_code(code_or_name)
            .or_else(|| self.find_by_name(code_or_name))
    }

    /// Iterate over all parents, immediate parent first
    pub fn iter_parents<'a>(
        &'a self,
        account: &'a Account,
    ) -> impl Iterator<Item = &'a Account> + 'a {
        // Bounded by the number of accounts, in case the database somehow
        // contains a cycle
        let mut current = account.parent;
        (0..self.accounts.len()).map_while(move |_| {
            let p = self.get(current?)?;
            current = p.parent;
            Some(p)
        })
    }

    pub fn iter_children(
        &self,
        id: AccountId,
    ) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(move |a| a.parent == Some(id))
    }

    /// Whether making `parent` the parent of `id` would create a cycle
    pub fn creates_cycle(&self, id: AccountId, parent: AccountId) -> bool {
        if id == parent {
            return true;
        }
        match self.get(parent) {
            None => false,
            Some(p) => self.iter_parents(p).any(|a| a.id == id),
        }
    }

    /// The name of the account, with up to depth-1 parents, separated by ':'
    pub fn name(&self, id: AccountId, depth: AccountNameDepth) -> String {
        match self.get(id) {
            None => format!("#{}", id.0),
            Some(acc) => {
                let mut parts: Vec<&str> = self
                    .iter_parents(acc)
                    .take(depth.0.saturating_sub(1))
                    .map(|p| p.name.as_str())
                    .collect();
                parts.reverse();
                parts.push(&acc.name);
                parts.join(":")
            }
        }
    }
}
