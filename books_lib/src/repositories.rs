use crate::account_categories::AccountCategory;
use crate::account_kinds::{AccountKind, AccountKindCollection};
use crate::accounts::{Account, AccountCollection, AccountId, AccountNameDepth};
use crate::amounts::Totals;
use crate::database::Database;
use crate::errors::Result;
use crate::formatters::Formatter;
use crate::periods::Period;
use crate::transactions::{JournalEntry, JournalLine};
use crate::users::Session;
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;

/// An in-memory snapshot of the books of one user.
/// All reports are computed from such a snapshot, rather than by querying
/// the database directly.
pub struct Repository {
    accounts: AccountCollection,
    account_kinds: AccountKindCollection,

    // Sorted by date, then by id (i.e. the order in which they were typed)
    entries: Vec<JournalEntry>,

    pub format: Formatter,
}

impl Repository {
    pub fn new(
        accounts: AccountCollection,
        account_kinds: AccountKindCollection,
        mut entries: Vec<JournalEntry>,
    ) -> Self {
        entries.sort_by_key(|e| (e.date, e.id));
        Repository {
            accounts,
            account_kinds,
            entries,
            format: Formatter::default(),
        }
    }

    /// Load all accounts and entries of the session's user.
    pub async fn load(
        db: &mut Database,
        session: &Session,
        report_progress: impl Fn(u64, u64),
    ) -> Result<Self> {
        let accounts = db.load_accounts(session).await?;
        let entries =
            db.list_entries(session, None, None, report_progress).await?;
        debug!(
            "Snapshot for {}: {} accounts, {} entries",
            session.user.username,
            accounts.len(),
            entries.len()
        );
        Ok(Repository::new(accounts, db.account_kinds().clone(), entries))
    }

    pub fn get_account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }
    pub fn get_account_name(
        &self,
        id: AccountId,
        depth: AccountNameDepth,
    ) -> String {
        self.accounts.name(id, depth)
    }
    pub fn find_account(&self, code_or_name: &str) -> Option<&Account> {
        self.accounts.lookup(code_or_name)
    }
    pub fn iter_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }
    pub fn iter_parents<'a>(
        &'a self,
        account: &'a Account,
    ) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts.iter_parents(account)
    }

    pub fn get_account_kinds(&self) -> &AccountKindCollection {
        &self.account_kinds
    }
    pub fn kind_of(&self, account: &Account) -> Option<&AccountKind> {
        self.account_kinds.get(account.kind)
    }
    pub fn category_of(&self, account: &Account) -> Option<AccountCategory> {
        self.kind_of(account).map(|k| k.category)
    }

    /// Whether the account holds cash or cash equivalents
    pub fn is_cash(&self, id: AccountId) -> bool {
        self.get_account(id)
            .and_then(|acc| self.kind_of(acc))
            .is_some_and(|k| k.is_cash)
    }

    pub fn iter_entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// The entries within the period, in chronological order
    pub fn iter_entries_in<'a>(
        &'a self,
        period: &'a Period,
    ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.entries
            .iter()
            .skip_while(move |e| period.is_before(e.date))
            .take_while(move |e| e.date <= period.end)
    }

    /// All lines applied to one account, in chronological order.  The line
    /// is returned with its entry and its position in the entry.
    pub fn iter_lines(
        &self,
        account: AccountId,
    ) -> impl Iterator<Item = (&JournalEntry, usize, &JournalLine)> {
        self.entries.iter().flat_map(move |e| {
            e.lines
                .iter()
                .enumerate()
                .filter(move |(_, l)| l.account == account)
                .map(move |(pos, l)| (e, pos, l))
        })
    }

    /// Cumulated debits and credits of each account, for the lines within
    /// the period.  Accounts with no lines are not in the result.
    pub fn balances(&self, period: &Period) -> HashMap<AccountId, Totals> {
        let mut result: HashMap<AccountId, Totals> = HashMap::new();
        for e in self.iter_entries_in(period) {
            for line in &e.lines {
                result.entry(line.account).or_default().apply(&line.operation);
            }
        }
        result
    }

    /// Balances of all accounts for all lines up to, and including, a day
    pub fn balances_as_of(&self, as_of: NaiveDate) -> HashMap<AccountId, Totals> {
        self.balances(&Period::up_to(as_of))
    }
}
