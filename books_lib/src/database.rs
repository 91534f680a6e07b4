use crate::account_kinds::{AccountKind, AccountKindCollection, AccountKindId};
use crate::accounts::{
    Account, AccountChanges, AccountCollection, AccountDetails, AccountId,
};
use crate::activity::{Action, ActivityRecord};
use crate::amounts::Operation;
use crate::chart::STANDARD_CHART;
use crate::errors::{BooksError, Result};
use crate::notifications::{Notification, NotificationId, NotificationKind};
use crate::periods::Period;
use crate::transactions::{
    clean_text, resolve_lines, EntryChanges, EntryDetails, EntryId,
    JournalEntry, JournalLine,
};
use crate::users::{
    hash_password, new_salt, Session, User, UserId, MIN_PASSWORD_LEN,
};
use ::{
    chrono::Local,
    futures::TryStreamExt, //  make try_next visible
    log::{debug, info, warn},
    rust_decimal::Decimal,
    serde_json::json,
    sqlx::query::Query,
    sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow},
    sqlx::{query, Connection, Row, Sqlite, SqliteConnection},
    std::collections::HashMap,
    std::str::FromStr,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
        full_name     TEXT,
        salt          TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS accounts (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        code        TEXT NOT NULL,
        name        TEXT NOT NULL COLLATE NOCASE,
        kind        TEXT NOT NULL,
        parent_id   INTEGER REFERENCES accounts(id),
        description TEXT,
        closed      INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL,
        UNIQUE (user_id, code),
        UNIQUE (user_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS journal_entry_headers (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        entry_date TEXT NOT NULL,
        reference  TEXT,
        memo       TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS journal_entry_headers_date
        ON journal_entry_headers(user_id, entry_date)",
    "CREATE TABLE IF NOT EXISTS journal_entry_lines (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        header_id  INTEGER NOT NULL
                   REFERENCES journal_entry_headers(id) ON DELETE CASCADE,
        position   INTEGER NOT NULL,
        account_id INTEGER NOT NULL REFERENCES accounts(id),
        debit      TEXT NOT NULL DEFAULT '0',
        credit     TEXT NOT NULL DEFAULT '0',
        memo       TEXT
    )",
    "CREATE INDEX IF NOT EXISTS journal_entry_lines_header
        ON journal_entry_lines(header_id)",
    "CREATE INDEX IF NOT EXISTS journal_entry_lines_account
        ON journal_entry_lines(account_id)",
    "CREATE TABLE IF NOT EXISTS notifications (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind       TEXT NOT NULL,
        message    TEXT NOT NULL,
        is_read    INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS activity_log (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        action     TEXT NOT NULL,
        details    TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
];

// Shared by the queries that list entries.  Parameters are the user, the
// optional start and end of the period, and an optional account.
const ENTRY_FILTER: &str = "h.user_id = ?1
    AND (?2 IS NULL OR h.entry_date >= ?2)
    AND (?3 IS NULL OR h.entry_date <= ?3)
    AND (?4 IS NULL OR h.id IN
         (SELECT header_id FROM journal_entry_lines WHERE account_id = ?4))";

/// The books of all users, stored in a single SQLite file.
/// Every operation that reads or modifies the books takes a Session, and is
/// restricted to the rows of the session's user.
pub struct Database {
    conn: SqliteConnection,
    kinds: AccountKindCollection,
}

impl Database {
    /// Open (and create if needed) the database.  The special names
    /// ":memory:" and "sqlite::memory:" give a transient database.
    pub async fn open(path: &str) -> Result<Self> {
        let options = match path {
            ":memory:" | "sqlite::memory:" => {
                SqliteConnectOptions::from_str("sqlite::memory:")?
            }
            _ => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        };
        let options = options.foreign_keys(true);
        let conn = SqliteConnection::connect_with(&options).await?;
        let mut db = Database {
            conn,
            kinds: AccountKindCollection::default(),
        };
        for stmt in SCHEMA {
            query(stmt).execute(&mut db.conn).await?;
        }
        info!("Opened database {path}");
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self> {
        Database::open(":memory:").await
    }

    pub fn account_kinds(&self) -> &AccountKindCollection {
        &self.kinds
    }

    // ---------------------------------------------------------------------
    // Users

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BooksError::invalid("user name", "must not be empty"));
        }
        check_password(password)?;

        let existing = query("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut self.conn)
            .await?;
        if existing.is_some() {
            warn!("Cannot register {username}, name already taken");
            return Err(BooksError::duplicate("user", username));
        }

        let salt = new_salt();
        let full_name = clean_text(full_name);
        let now = Local::now();
        let mut tx = self.conn.begin().await?;
        let id = query(
            "INSERT INTO users
             (username, full_name, salt, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(&full_name)
        .bind(&salt)
        .bind(hash_password(&salt, password))
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let user = User {
            id: UserId(id),
            username: username.to_string(),
            full_name,
            created_at: now,
        };
        notify(
            &mut tx,
            user.id,
            NotificationKind::Welcome,
            &format!(
                "Welcome, {}! Start by creating your chart of accounts.",
                user.full_name.as_deref().unwrap_or(&user.username)
            ),
        )
        .await?;
        record(&mut tx, user.id, Action::Register, json!({"username": username}))
            .await?;
        tx.commit().await?;
        info!("Registered user {username}");
        Ok(user)
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let row = query("SELECT * FROM users WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(&mut self.conn)
            .await?;
        let Some(row) = row else {
            warn!("Login failed, unknown user {username}");
            return Err(BooksError::Authentication);
        };
        let salt: String = row.try_get("salt")?;
        let digest: String = row.try_get("password_hash")?;
        if hash_password(&salt, password) != digest {
            warn!("Login failed for {username}");
            return Err(BooksError::Authentication);
        }
        let user = user_from_row(&row)?;
        record(&mut self.conn, user.id, Action::Login, json!({})).await?;
        info!("User {} logged in", user.username);
        Ok(Session::new(user))
    }

    pub async fn change_password(
        &mut self,
        session: &Session,
        current: &str,
        new: &str,
    ) -> Result<()> {
        let user = session.user_id();
        let row = query("SELECT salt, password_hash FROM users WHERE id = ?")
            .bind(user.0)
            .fetch_optional(&mut self.conn)
            .await?
            .ok_or_else(|| BooksError::not_found("user", &session.user.username))?;
        let salt: String = row.try_get("salt")?;
        let digest: String = row.try_get("password_hash")?;
        if hash_password(&salt, current) != digest {
            warn!("Wrong current password for {}", session.user.username);
            return Err(BooksError::Authentication);
        }
        check_password(new)?;

        let salt = new_salt();
        let mut tx = self.conn.begin().await?;
        query("UPDATE users SET salt = ?, password_hash = ? WHERE id = ?")
            .bind(&salt)
            .bind(hash_password(&salt, new))
            .bind(user.0)
            .execute(&mut *tx)
            .await?;
        record(&mut tx, user, Action::PasswordChange, json!({})).await?;
        tx.commit().await?;
        info!("Password changed for {}", session.user.username);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Chart of accounts

    pub async fn load_accounts(
        &mut self,
        session: &Session,
    ) -> Result<AccountCollection> {
        load_accounts(&mut self.conn, &self.kinds, session.user_id()).await
    }

    pub async fn create_account(
        &mut self,
        session: &Session,
        details: &AccountDetails<'_>,
    ) -> Result<Account> {
        let user = session.user_id();
        let accounts = load_accounts(&mut self.conn, &self.kinds, user).await?;
        let kind = self.kinds.find(details.kind).ok_or_else(|| {
            BooksError::not_found("account kind", details.kind)
        })?;
        let parent = resolve_parent(&accounts, details.parent)?;
        let code = details.code.trim();
        let name = details.name.trim();
        validate_account(&accounts, &self.kinds, None, code, name, kind, parent)
            .inspect_err(|e| warn!("Cannot create account {code}: {e}"))?;
        let kind_name = kind_of(&self.kinds, kind)?.name.clone();
        let description = clean_text(details.description);
        let now = Local::now();

        let mut tx = self.conn.begin().await?;
        let id = query(
            "INSERT INTO accounts
             (user_id, code, name, kind, parent_id, description, closed,
              created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(user.0)
        .bind(code)
        .bind(name)
        .bind(&kind_name)
        .bind(parent.map(|p| p.0))
        .bind(&description)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        record(
            &mut tx,
            user,
            Action::AccountCreate,
            json!({"code": code, "name": name, "kind": kind_name}),
        )
        .await?;
        tx.commit().await?;
        info!("Created account {code} {name}");

        Ok(Account {
            id: AccountId(id),
            user,
            code: code.to_string(),
            name: name.to_string(),
            kind,
            parent,
            description,
            closed: false,
            created_on: now,
        })
    }

    /// Modify an account, given by code or name
    pub async fn update_account(
        &mut self,
        session: &Session,
        account: &str,
        changes: &AccountChanges<'_>,
    ) -> Result<Account> {
        let user = session.user_id();
        let accounts = load_accounts(&mut self.conn, &self.kinds, user).await?;
        let current = accounts
            .lookup(account)
            .ok_or_else(|| BooksError::not_found("account", account))?;

        let code = changes.code.map(str::trim).unwrap_or(&current.code);
        let name = changes.name.map(str::trim).unwrap_or(&current.name);
        let kind = match changes.kind {
            None => current.kind,
            Some(k) => self
                .kinds
                .find(k)
                .ok_or_else(|| BooksError::not_found("account kind", k))?,
        };
        let parent = match changes.parent {
            None => current.parent,
            Some(p) => resolve_parent(&accounts, p)?,
        };
        let description = match changes.description {
            None => current.description.clone(),
            Some(d) => clean_text(d),
        };
        validate_account(
            &accounts,
            &self.kinds,
            Some(current.id),
            code,
            name,
            kind,
            parent,
        )
        .inspect_err(|e| warn!("Cannot update account {account}: {e}"))?;

        let category_changed = kind_of(&self.kinds, kind)?.category
            != kind_of(&self.kinds, current.kind)?.category;
        if category_changed
            && count_lines(&mut self.conn, current.id).await? > 0
        {
            warn!("Cannot change category of {}", current.code);
            return Err(BooksError::invalid(
                "account",
                format!(
                    "{} has posted lines, its category cannot change",
                    current.code
                ),
            ));
        }

        let updated = Account {
            code: code.to_string(),
            name: name.to_string(),
            kind,
            parent,
            description,
            ..current.clone()
        };
        let kind_name = kind_of(&self.kinds, kind)?.name.clone();

        let mut tx = self.conn.begin().await?;
        query(
            "UPDATE accounts SET code = ?, name = ?, kind = ?, parent_id = ?,
             description = ? WHERE id = ? AND user_id = ?",
        )
        .bind(&updated.code)
        .bind(&updated.name)
        .bind(&kind_name)
        .bind(updated.parent.map(|p| p.0))
        .bind(&updated.description)
        .bind(updated.id.0)
        .bind(user.0)
        .execute(&mut *tx)
        .await?;
        record(
            &mut tx,
            user,
            Action::AccountUpdate,
            json!({"code": updated.code, "name": updated.name}),
        )
        .await?;
        tx.commit().await?;
        info!("Updated account {}", updated.code);
        Ok(updated)
    }

    pub async fn close_account(
        &mut self,
        session: &Session,
        account: &str,
    ) -> Result<Account> {
        self.set_closed(session, account, true).await
    }

    pub async fn reopen_account(
        &mut self,
        session: &Session,
        account: &str,
    ) -> Result<Account> {
        self.set_closed(session, account, false).await
    }

    async fn set_closed(
        &mut self,
        session: &Session,
        account: &str,
        closed: bool,
    ) -> Result<Account> {
        let user = session.user_id();
        let accounts = load_accounts(&mut self.conn, &self.kinds, user).await?;
        let mut acc = accounts
            .lookup(account)
            .ok_or_else(|| BooksError::not_found("account", account))?
            .clone();
        if acc.closed == closed {
            return Ok(acc);
        }
        acc.closed = closed;

        let mut tx = self.conn.begin().await?;
        query("UPDATE accounts SET closed = ? WHERE id = ? AND user_id = ?")
            .bind(closed)
            .bind(acc.id.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await?;
        let details = json!({"code": acc.code, "name": acc.name});
        if closed {
            notify(
                &mut tx,
                user,
                NotificationKind::AccountClosed,
                &format!("Account {} {} was closed", acc.code, acc.name),
            )
            .await?;
            record(&mut tx, user, Action::AccountClose, details).await?;
        } else {
            record(&mut tx, user, Action::AccountReopen, details).await?;
        }
        tx.commit().await?;
        info!(
            "{} account {}",
            if closed { "Closed" } else { "Reopened" },
            acc.code
        );
        Ok(acc)
    }

    /// Delete an account.  Only accounts that were never used can be
    /// deleted, others should be closed instead.
    pub async fn delete_account(
        &mut self,
        session: &Session,
        account: &str,
    ) -> Result<()> {
        let user = session.user_id();
        let accounts = load_accounts(&mut self.conn, &self.kinds, user).await?;
        let acc = accounts
            .lookup(account)
            .ok_or_else(|| BooksError::not_found("account", account))?;
        if accounts.iter_children(acc.id).next().is_some() {
            warn!("Cannot delete {}, it has children", acc.code);
            return Err(BooksError::invalid(
                "account",
                format!("{} has child accounts", acc.code),
            ));
        }
        if count_lines(&mut self.conn, acc.id).await? > 0 {
            warn!("Cannot delete {}, it has lines", acc.code);
            return Err(BooksError::invalid(
                "account",
                format!("{} has posted lines, close it instead", acc.code),
            ));
        }

        let mut tx = self.conn.begin().await?;
        query("DELETE FROM accounts WHERE id = ? AND user_id = ?")
            .bind(acc.id.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await?;
        record(
            &mut tx,
            user,
            Action::AccountDelete,
            json!({"code": acc.code, "name": acc.name}),
        )
        .await?;
        tx.commit().await?;
        info!("Deleted account {}", acc.code);
        Ok(())
    }

    /// Create the accounts of the standard chart.  Codes that already exist
    /// are left untouched.  Returns the number of accounts created.
    pub async fn create_standard_chart(
        &mut self,
        session: &Session,
    ) -> Result<usize> {
        let existing = self.load_accounts(session).await?;
        let mut created = 0;
        for (code, name, kind, parent) in STANDARD_CHART {
            if existing.find_by_code(code).is_some() {
                continue;
            }
            self.create_account(
                session,
                &AccountDetails {
                    code,
                    name,
                    kind,
                    parent: *parent,
                    description: None,
                },
            )
            .await?;
            created += 1;
        }
        Ok(created)
    }

    // ---------------------------------------------------------------------
    // Journal

    pub async fn post_entry(
        &mut self,
        session: &Session,
        details: &EntryDetails<'_>,
    ) -> Result<JournalEntry> {
        let user = session.user_id();
        let accounts = load_accounts(&mut self.conn, &self.kinds, user).await?;
        let lines = resolve_lines(&details.lines, &accounts)
            .inspect_err(|e| warn!("Entry rejected: {e}"))?;
        let reference = clean_text(details.reference);
        let memo = clean_text(details.memo);
        let now = Local::now();

        let mut tx = self.conn.begin().await?;
        let id = query(
            "INSERT INTO journal_entry_headers
             (user_id, entry_date, reference, memo, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.0)
        .bind(details.date)
        .bind(&reference)
        .bind(&memo)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let entry = JournalEntry {
            id: EntryId(id),
            user,
            date: details.date,
            reference,
            memo,
            created_at: now,
            lines,
        };
        insert_lines(&mut tx, entry.id, &entry.lines).await?;
        notify(
            &mut tx,
            user,
            NotificationKind::EntryPosted,
            &format!("Entry #{} posted: {}", id, describe(&entry)),
        )
        .await?;
        record(&mut tx, user, Action::EntryPost, entry_details(&entry)).await?;
        tx.commit().await?;
        info!("Posted entry #{id}");
        Ok(entry)
    }

    pub async fn edit_entry(
        &mut self,
        session: &Session,
        id: EntryId,
        changes: &EntryChanges<'_>,
    ) -> Result<JournalEntry> {
        let user = session.user_id();
        let current = load_entry(&mut self.conn, user, id).await?;
        let lines = match &changes.lines {
            None => None,
            Some(lines) => {
                let accounts =
                    load_accounts(&mut self.conn, &self.kinds, user).await?;
                Some(
                    resolve_lines(lines, &accounts)
                        .inspect_err(|e| warn!("Edit of #{} rejected: {e}", id.0))?,
                )
            }
        };
        let replace_lines = lines.is_some();
        let entry = JournalEntry {
            id: current.id,
            user: current.user,
            date: changes.date.unwrap_or(current.date),
            reference: match changes.reference {
                None => current.reference,
                Some(r) => clean_text(r),
            },
            memo: match changes.memo {
                None => current.memo,
                Some(m) => clean_text(m),
            },
            created_at: current.created_at,
            lines: lines.unwrap_or(current.lines),
        };

        let mut tx = self.conn.begin().await?;
        query(
            "UPDATE journal_entry_headers
             SET entry_date = ?, reference = ?, memo = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(entry.date)
        .bind(&entry.reference)
        .bind(&entry.memo)
        .bind(id.0)
        .bind(user.0)
        .execute(&mut *tx)
        .await?;
        if replace_lines {
            query("DELETE FROM journal_entry_lines WHERE header_id = ?")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
            insert_lines(&mut tx, id, &entry.lines).await?;
        }
        notify(
            &mut tx,
            user,
            NotificationKind::EntryEdited,
            &format!("Entry #{} edited: {}", id.0, describe(&entry)),
        )
        .await?;
        record(&mut tx, user, Action::EntryEdit, entry_details(&entry)).await?;
        tx.commit().await?;
        info!("Edited entry #{}", id.0);
        Ok(entry)
    }

    pub async fn delete_entry(
        &mut self,
        session: &Session,
        id: EntryId,
    ) -> Result<()> {
        let user = session.user_id();
        let entry = load_entry(&mut self.conn, user, id).await?;

        let mut tx = self.conn.begin().await?;
        query("DELETE FROM journal_entry_lines WHERE header_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        query("DELETE FROM journal_entry_headers WHERE id = ? AND user_id = ?")
            .bind(id.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await?;
        notify(
            &mut tx,
            user,
            NotificationKind::EntryDeleted,
            &format!("Entry #{} deleted: {}", id.0, describe(&entry)),
        )
        .await?;
        record(&mut tx, user, Action::EntryDelete, entry_details(&entry))
            .await?;
        tx.commit().await?;
        info!("Deleted entry #{}", id.0);
        Ok(())
    }

    pub async fn get_entry(
        &mut self,
        session: &Session,
        id: EntryId,
    ) -> Result<JournalEntry> {
        load_entry(&mut self.conn, session.user_id(), id).await
    }

    /// The entries of the user, ordered by date then id.  The list can be
    /// restricted to a period, and to the entries that have at least one
    /// line on a given account.
    pub async fn list_entries(
        &mut self,
        session: &Session,
        period: Option<&Period>,
        account: Option<AccountId>,
        report_progress: impl Fn(u64, u64),
    ) -> Result<Vec<JournalEntry>> {
        let user = session.user_id();

        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM journal_entry_headers h
             WHERE {ENTRY_FILTER}"
        );
        let count: i64 =
            bind_entry_filter(query(&count_sql), user, period, account)
                .fetch_one(&mut self.conn)
                .await?
                .try_get("count")?;
        let max = count as u64 * 2;
        report_progress(0, max);

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        let headers_sql = format!(
            "SELECT h.* FROM journal_entry_headers h WHERE {ENTRY_FILTER}
             ORDER BY h.entry_date, h.id"
        );
        {
            let mut stream =
                bind_entry_filter(query(&headers_sql), user, period, account)
                    .fetch(&mut self.conn);
            while let Some(row) = stream.try_next().await? {
                let entry = entry_from_row(&row)?;
                index.insert(entry.id, entries.len());
                entries.push(entry);
                report_progress(entries.len() as u64, max);
            }
        }

        let lines_sql = format!(
            "SELECT l.* FROM journal_entry_lines l
             JOIN journal_entry_headers h ON h.id = l.header_id
             WHERE {ENTRY_FILTER}
             ORDER BY l.header_id, l.position"
        );
        let mut current: Option<EntryId> = None;
        let mut done = entries.len() as u64;
        let mut stream =
            bind_entry_filter(query(&lines_sql), user, period, account)
                .fetch(&mut self.conn);
        while let Some(row) = stream.try_next().await? {
            let header = EntryId(row.try_get("header_id")?);
            if current != Some(header) {
                current = Some(header);
                done += 1;
                report_progress(done, max);
            }
            let entry = index
                .get(&header)
                .and_then(|idx| entries.get_mut(*idx))
                .ok_or_else(|| BooksError::not_found("entry", header.0))?;
            entry.lines.push(line_from_row(&row)?);
        }
        report_progress(max, max);
        debug!("Loaded {} entries for user {}", entries.len(), user.0);
        Ok(entries)
    }

    // ---------------------------------------------------------------------
    // Notifications

    /// Newest first
    pub async fn list_notifications(
        &mut self,
        session: &Session,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut result = Vec::new();
        let mut stream = query(
            "SELECT * FROM notifications
             WHERE user_id = ? AND (is_read = 0 OR ? = 0)
             ORDER BY id DESC",
        )
        .bind(session.user_id().0)
        .bind(unread_only)
        .fetch(&mut self.conn);
        while let Some(row) = stream.try_next().await? {
            result.push(Notification {
                id: NotificationId(row.try_get("id")?),
                user: UserId(row.try_get("user_id")?),
                kind: row.try_get::<String, _>("kind")?.parse()?,
                message: row.try_get("message")?,
                is_read: row.try_get("is_read")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(result)
    }

    /// Mark one notification, or all of them when id is None, as read.
    /// Returns the number of notifications that were modified.
    pub async fn mark_read(
        &mut self,
        session: &Session,
        id: Option<NotificationId>,
    ) -> Result<u64> {
        let user = session.user_id();
        let done = match id {
            None => {
                query(
                    "UPDATE notifications SET is_read = 1
                     WHERE user_id = ? AND is_read = 0",
                )
                .bind(user.0)
                .execute(&mut self.conn)
                .await?
            }
            Some(id) => {
                let done = query(
                    "UPDATE notifications SET is_read = 1
                     WHERE user_id = ? AND id = ?",
                )
                .bind(user.0)
                .bind(id.0)
                .execute(&mut self.conn)
                .await?;
                if done.rows_affected() == 0 {
                    return Err(BooksError::not_found("notification", id.0));
                }
                done
            }
        };
        Ok(done.rows_affected())
    }

    pub async fn delete_notification(
        &mut self,
        session: &Session,
        id: NotificationId,
    ) -> Result<()> {
        let done = query("DELETE FROM notifications WHERE user_id = ? AND id = ?")
            .bind(session.user_id().0)
            .bind(id.0)
            .execute(&mut self.conn)
            .await?;
        if done.rows_affected() == 0 {
            return Err(BooksError::not_found("notification", id.0));
        }
        Ok(())
    }

    pub async fn count_unread(&mut self, session: &Session) -> Result<i64> {
        let row = query(
            "SELECT COUNT(*) AS count FROM notifications
             WHERE user_id = ? AND is_read = 0",
        )
        .bind(session.user_id().0)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(row.try_get("count")?)
    }

    // ---------------------------------------------------------------------
    // Activity log

    /// The most recent actions, newest first
    pub async fn list_activity(
        &mut self,
        session: &Session,
        limit: u32,
    ) -> Result<Vec<ActivityRecord>> {
        let mut result = Vec::new();
        let mut stream = query(
            "SELECT * FROM activity_log WHERE user_id = ?
             ORDER BY id DESC LIMIT ?",
        )
        .bind(session.user_id().0)
        .bind(limit)
        .fetch(&mut self.conn);
        while let Some(row) = stream.try_next().await? {
            let details: String = row.try_get("details")?;
            result.push(ActivityRecord {
                id: row.try_get("id")?,
                user: UserId(row.try_get("user_id")?),
                action: row.try_get::<String, _>("action")?.parse()?,
                details: serde_json::from_str(&details)?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(result)
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BooksError::invalid(
            "password",
            format!("must have at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn kind_of(
    kinds: &AccountKindCollection,
    kind: AccountKindId,
) -> Result<&AccountKind> {
    kinds
        .get(kind)
        .ok_or_else(|| BooksError::not_found("account kind", kind.0))
}

fn resolve_parent(
    accounts: &AccountCollection,
    parent: Option<&str>,
) -> Result<Option<AccountId>> {
    match parent.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => Ok(Some(
            accounts
                .lookup(p)
                .ok_or_else(|| BooksError::not_found("parent account", p))?
                .id,
        )),
    }
}

/// Check the rules of the chart of accounts, for a new account (id is None)
/// or an existing one.
fn validate_account(
    accounts: &AccountCollection,
    kinds: &AccountKindCollection,
    id: Option<AccountId>,
    code: &str,
    name: &str,
    kind: AccountKindId,
    parent: Option<AccountId>,
) -> Result<()> {
    if code.is_empty() {
        return Err(BooksError::invalid("account code", "must not be empty"));
    }
    if name.is_empty() {
        return Err(BooksError::invalid("account name", "must not be empty"));
    }
    // ':' separates parents in full names
    if name.contains(':') {
        return Err(BooksError::invalid(
            "account name",
            format!("{name:?} must not contain ':'"),
        ));
    }
    // '=' separates the account from the amount in entry lines
    for (what, text) in [("account code", code), ("account name", name)] {
        if text.contains('=') {
            return Err(BooksError::invalid(
                what,
                format!("{text:?} must not contain '='"),
            ));
        }
    }
    if accounts.find_by_code(code).is_some_and(|a| Some(a.id) != id) {
        return Err(BooksError::duplicate("account code", code));
    }
    if accounts.find_by_name(name).is_some_and(|a| Some(a.id) != id) {
        return Err(BooksError::duplicate("account name", name));
    }

    let category = kind_of(kinds, kind)?.category;
    if let Some(p) = parent {
        let parent_acc = accounts
            .get(p)
            .ok_or_else(|| BooksError::not_found("parent account", p.0))?;
        let parent_category = kind_of(kinds, parent_acc.kind)?.category;
        if parent_category != category {
            return Err(BooksError::invalid(
                "parent",
                format!(
                    "{} is in {parent_category}, not in {category}",
                    parent_acc.code
                ),
            ));
        }
        if id.is_some_and(|id| accounts.creates_cycle(id, p)) {
            return Err(BooksError::invalid(
                "parent",
                format!("{} would create a cycle", parent_acc.code),
            ));
        }
    }
    if let Some(id) = id {
        for child in accounts.iter_children(id) {
            if kind_of(kinds, child.kind)?.category != category {
                return Err(BooksError::invalid(
                    "kind",
                    format!("child account {} is not in {category}", child.code),
                ));
            }
        }
    }
    Ok(())
}

fn bind_entry_filter<'q>(
    q: Query<'q, Sqlite, SqliteArguments<'q>>,
    user: UserId,
    period: Option<&Period>,
    account: Option<AccountId>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    q.bind(user.0)
        .bind(period.and_then(|p| p.start))
        .bind(period.map(|p| p.end))
        .bind(account.map(|a| a.0))
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let text: String = row.try_get(column)?;
    Ok(Decimal::from_str(&text)?)
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        full_name: row.try_get("full_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn account_from_row(
    row: &SqliteRow,
    kinds: &AccountKindCollection,
) -> Result<Account> {
    let kind: String = row.try_get("kind")?;
    Ok(Account {
        id: AccountId(row.try_get("id")?),
        user: UserId(row.try_get("user_id")?),
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        kind: kinds
            .find(&kind)
            .ok_or_else(|| BooksError::not_found("account kind", &kind))?,
        parent: row.try_get::<Option<i64>, _>("parent_id")?.map(AccountId),
        description: row.try_get("description")?,
        closed: row.try_get("closed")?,
        created_on: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<JournalEntry> {
    Ok(JournalEntry {
        id: EntryId(row.try_get("id")?),
        user: UserId(row.try_get("user_id")?),
        date: row.try_get("entry_date")?,
        reference: row.try_get("reference")?,
        memo: row.try_get("memo")?,
        created_at: row.try_get("created_at")?,
        lines: Vec::new(),
    })
}

fn line_from_row(row: &SqliteRow) -> Result<JournalLine> {
    let debit = decimal_column(row, "debit")?;
    let credit = decimal_column(row, "credit")?;
    let operation = Operation::from_columns(debit, credit).ok_or_else(|| {
        BooksError::invalid(
            "line",
            format!("debit={debit} and credit={credit}, expected exactly one"),
        )
    })?;
    Ok(JournalLine {
        account: AccountId(row.try_get("account_id")?),
        operation,
        memo: row.try_get("memo")?,
    })
}

async fn load_accounts(
    conn: &mut SqliteConnection,
    kinds: &AccountKindCollection,
    user: UserId,
) -> Result<AccountCollection> {
    let mut accounts = AccountCollection::default();
    let mut stream =
        query("SELECT * FROM accounts WHERE user_id = ? ORDER BY code")
            .bind(user.0)
            .fetch(&mut *conn);
    while let Some(row) = stream.try_next().await? {
        accounts.add(account_from_row(&row, kinds)?);
    }
    debug!("Loaded {} accounts for user {}", accounts.len(), user.0);
    Ok(accounts)
}

async fn load_entry(
    conn: &mut SqliteConnection,
    user: UserId,
    id: EntryId,
) -> Result<JournalEntry> {
    let row = query(
        "SELECT * FROM journal_entry_headers WHERE id = ? AND user_id = ?",
    )
    .bind(id.0)
    .bind(user.0)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| BooksError::not_found("entry", id.0))?;
    let mut entry = entry_from_row(&row)?;

    let mut stream = query(
        "SELECT * FROM journal_entry_lines WHERE header_id = ?
         ORDER BY position",
    )
    .bind(id.0)
    .fetch(&mut *conn);
    while let Some(row) = stream.try_next().await? {
        entry.lines.push(line_from_row(&row)?);
    }
    Ok(entry)
}

async fn count_lines(
    conn: &mut SqliteConnection,
    account: AccountId,
) -> Result<i64> {
    let row = query(
        "SELECT COUNT(*) AS count FROM journal_entry_lines
         WHERE account_id = ?",
    )
    .bind(account.0)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.try_get("count")?)
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    id: EntryId,
    lines: &[JournalLine],
) -> Result<()> {
    for (position, line) in lines.iter().enumerate() {
        query(
            "INSERT INTO journal_entry_lines
             (header_id, position, account_id, debit, credit, memo)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(position as i64)
        .bind(line.account.0)
        .bind(line.operation.debit().to_string())
        .bind(line.operation.credit().to_string())
        .bind(&line.memo)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn notify(
    conn: &mut SqliteConnection,
    user: UserId,
    kind: NotificationKind,
    message: &str,
) -> Result<()> {
    query(
        "INSERT INTO notifications (user_id, kind, message, is_read, created_at)
         VALUES (?, ?, ?, 0, ?)",
    )
    .bind(user.0)
    .bind(kind.as_str())
    .bind(message)
    .bind(Local::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn record(
    conn: &mut SqliteConnection,
    user: UserId,
    action: Action,
    details: serde_json::Value,
) -> Result<()> {
    debug!("Activity {action} {details}");
    query(
        "INSERT INTO activity_log (user_id, action, details, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(user.0)
    .bind(action.as_str())
    .bind(details.to_string())
    .bind(Local::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn describe(entry: &JournalEntry) -> String {
    let mut text = format!("{} for {}", entry.date, entry.totals().debit);
    if let Some(memo) = &entry.memo {
        text.push_str(", ");
        text.push_str(memo);
    }
    text
}

fn entry_details(entry: &JournalEntry) -> serde_json::Value {
    json!({
        "entry": entry.id.0,
        "date": entry.date.to_string(),
        "reference": entry.reference,
        "amount": entry.totals().debit.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test {
    use crate::accounts::{AccountChanges, AccountDetails};
    use crate::chart::STANDARD_CHART;
    use crate::database::Database;
    use crate::errors::BooksError;
    use crate::periods::Period;
    use crate::transactions::{
        EntryChanges, EntryDetails, EntryId, JournalEntry, LineDetails,
    };
    use crate::users::Session;
    use chrono::NaiveDate;
    use futures::executor::block_on;
    use rust_decimal_macros::dec;

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A database with one user, whose books use the standard chart
    pub async fn setup() -> (Database, Session) {
        let mut db = Database::open_in_memory().await.unwrap();
        db.register("alice", "secret1", Some("Alice")).await.unwrap();
        let session = db.login("alice", "secret1").await.unwrap();
        db.create_standard_chart(&session).await.unwrap();
        (db, session)
    }

    /// Post an entry from "CODE=AMOUNT" descriptions
    pub async fn post(
        db: &mut Database,
        session: &Session,
        date: NaiveDate,
        debits: &[&str],
        credits: &[&str],
    ) -> JournalEntry {
        let mut lines = Vec::new();
        for d in debits {
            lines.push(LineDetails::parse(d, true).unwrap());
        }
        for c in credits {
            lines.push(LineDetails::parse(c, false).unwrap());
        }
        db.post_entry(
            session,
            &EntryDetails {
                date,
                lines,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_users() {
        block_on(async {
            let mut db = Database::open_in_memory().await.unwrap();
            let user = db.register(" bob ", "secret1", None).await.unwrap();
            assert_eq!(user.username, "bob");

            assert!(matches!(
                db.register("BOB", "secret2", None).await,
                Err(BooksError::Duplicate { .. })
            ));
            assert!(matches!(
                db.register("carol", "short", None).await,
                Err(BooksError::Invalid { .. })
            ));
            assert!(db.register("  ", "secret1", None).await.is_err());
            assert!(matches!(
                db.login("bob", "wrong!").await,
                Err(BooksError::Authentication)
            ));
            assert!(matches!(
                db.login("nobody", "secret1").await,
                Err(BooksError::Authentication)
            ));

            let session = db.login("Bob", "secret1").await.unwrap();
            assert_eq!(session.user_id(), user.id);
            assert!(db
                .change_password(&session, "wrong!", "secret3")
                .await
                .is_err());
            db.change_password(&session, "secret1", "secret3")
                .await
                .unwrap();
            assert!(db.login("bob", "secret1").await.is_err());
            let session = db.login("bob", "secret3").await.unwrap();

            // Welcome message
            assert_eq!(db.count_unread(&session).await.unwrap(), 1);

            let actions: Vec<String> = db
                .list_activity(&session, 10)
                .await
                .unwrap()
                .iter()
                .map(|a| a.action.to_string())
                .collect();
            assert_eq!(
                actions,
                ["login", "password.change", "login", "register"]
            );
        });
    }

    #[test]
    fn test_accounts() {
        block_on(async {
            let (mut db, session) = setup().await;
            let accounts = db.load_accounts(&session).await.unwrap();
            assert_eq!(accounts.len(), STANDARD_CHART.len());

            // Seeding twice does nothing
            assert_eq!(db.create_standard_chart(&session).await.unwrap(), 0);

            let petty = db
                .create_account(
                    &session,
                    &AccountDetails {
                        code: "1001",
                        name: "Petty Cash",
                        kind: "cash",
                        parent: Some("1000"),
                        description: Some("  "),
                    },
                )
                .await
                .unwrap();
            assert_eq!(petty.description, None);

            let dup_code = AccountDetails {
                code: "1001",
                name: "Other",
                kind: "Cash",
                ..Default::default()
            };
            assert!(matches!(
                db.create_account(&session, &dup_code).await,
                Err(BooksError::Duplicate { .. })
            ));
            let dup_name = AccountDetails {
                code: "1002",
                name: "petty cash",
                kind: "Cash",
                ..Default::default()
            };
            assert!(db.create_account(&session, &dup_name).await.is_err());
            let wrong_parent = AccountDetails {
                code: "1003",
                name: "Wrong",
                kind: "Cash",
                parent: Some("6000"),
                ..Default::default()
            };
            assert!(db.create_account(&session, &wrong_parent).await.is_err());
            let unknown_kind = AccountDetails {
                code: "1004",
                name: "Stocks",
                kind: "Stock",
                ..Default::default()
            };
            assert!(matches!(
                db.create_account(&session, &unknown_kind).await,
                Err(BooksError::NotFound { .. })
            ));

            // Rename, then try to create a cycle
            let renamed = db
                .update_account(
                    &session,
                    "1001",
                    &AccountChanges {
                        name: Some("Petty"),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(renamed.name, "Petty");
            assert!(db
                .update_account(
                    &session,
                    "1000",
                    &AccountChanges {
                        parent: Some(Some("1001")),
                        ..Default::default()
                    },
                )
                .await
                .is_err());

            // Cannot delete a parent, nor a used account
            assert!(db.delete_account(&session, "1000").await.is_err());
            post(&mut db, &session, day(2024, 1, 2), &["1001=10"], &["3000=10"])
                .await;
            assert!(db.delete_account(&session, "1001").await.is_err());
            assert!(db
                .update_account(
                    &session,
                    "1001",
                    &AccountChanges {
                        kind: Some("Expense"),
                        parent: Some(None),
                        ..Default::default()
                    },
                )
                .await
                .is_err());
            db.delete_account(&session, "1200").await.unwrap();
            assert!(db.load_accounts(&session).await.unwrap().lookup("1200").is_none());

            // Closed accounts cannot receive lines
            let closed = db.close_account(&session, "Petty").await.unwrap();
            assert!(closed.closed);
            let lines = vec![
                LineDetails::parse("1001=5", true).unwrap(),
                LineDetails::parse("3000=5", false).unwrap(),
            ];
            let details = EntryDetails {
                date: day(2024, 1, 3),
                lines,
                ..Default::default()
            };
            assert!(db.post_entry(&session, &details).await.is_err());
            db.reopen_account(&session, "1001").await.unwrap();
            db.post_entry(&session, &details).await.unwrap();

            // welcome, account closed, two entries posted
            assert_eq!(db.count_unread(&session).await.unwrap(), 4);
        });
    }

    #[test]
    fn test_account_separators() {
        block_on(async {
            let (mut db, session) = setup().await;
            for (code, name) in [
                ("1020", "Bank:Savings"),
                ("1020", "Cash=Bank"),
                ("10=20", "Savings"),
            ] {
                let details = AccountDetails {
                    code,
                    name,
                    kind: "Bank",
                    ..Default::default()
                };
                assert!(matches!(
                    db.create_account(&session, &details).await,
                    Err(BooksError::Invalid { .. })
                ));
            }
            assert!(matches!(
                db.update_account(
                    &session,
                    "1010",
                    &AccountChanges {
                        code: Some("1010=1"),
                        ..Default::default()
                    },
                )
                .await,
                Err(BooksError::Invalid { .. })
            ));
        });
    }

    #[test]
    fn test_entries() {
        block_on(async {
            let (mut db, session) = setup().await;
            let cash = db.load_accounts(&session).await.unwrap();
            let cash = cash.find_by_code("1000").unwrap().id;

            let e1 = post(
                &mut db,
                &session,
                day(2024, 2, 1),
                &["1000=100"],
                &["3000=100"],
            )
            .await;
            let e2 = post(
                &mut db,
                &session,
                day(2024, 1, 15),
                &["6010=40"],
                &["1010=40"],
            )
            .await;

            // Rejected entries leave nothing behind
            let unbalanced = EntryDetails {
                date: day(2024, 1, 1),
                lines: vec![
                    LineDetails::parse("1000=10", true).unwrap(),
                    LineDetails::parse("3000=9", false).unwrap(),
                ],
                ..Default::default()
            };
            assert!(matches!(
                db.post_entry(&session, &unbalanced).await,
                Err(BooksError::Unbalanced { .. })
            ));

            let all = db.list_entries(&session, None, None, |_, _| {}).await.unwrap();
            assert_eq!(
                all.iter().map(|e| e.id).collect::<Vec<_>>(),
                vec![e2.id, e1.id]
            );
            assert_eq!(all[0].lines.len(), 2);
            assert!(all.iter().all(|e| e.is_balanced()));

            let january = Period::parse("2024-01", day(2024, 3, 1)).unwrap();
            let jan = db
                .list_entries(&session, Some(&january), None, |_, _| {})
                .await
                .unwrap();
            assert_eq!(jan.len(), 1);
            assert_eq!(jan[0].id, e2.id);

            let on_cash = db
                .list_entries(&session, None, Some(cash), |_, _| {})
                .await
                .unwrap();
            assert_eq!(on_cash.len(), 1);
            assert_eq!(on_cash[0].id, e1.id);

            // Replace the lines of the first entry
            let edited = db
                .edit_entry(
                    &session,
                    e1.id,
                    &EntryChanges {
                        memo: Some(Some("Capital")),
                        lines: Some(vec![
                            LineDetails::parse("1010=250", true).unwrap(),
                            LineDetails::parse("3000=250", false).unwrap(),
                        ]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(edited.date, day(2024, 2, 1));
            let reloaded = db.get_entry(&session, e1.id).await.unwrap();
            assert_eq!(reloaded.memo.as_deref(), Some("Capital"));
            assert_eq!(reloaded.totals().debit, dec!(250));
            assert_eq!(reloaded.lines.len(), 2);

            db.delete_entry(&session, e2.id).await.unwrap();
            assert!(matches!(
                db.get_entry(&session, e2.id).await,
                Err(BooksError::NotFound { .. })
            ));
            assert!(db.delete_entry(&session, EntryId(999)).await.is_err());

            // welcome, 2 posted, 1 edited, 1 deleted
            let notes = db.list_notifications(&session, false).await.unwrap();
            assert_eq!(notes.len(), 5);
            assert!(notes[0].message.starts_with("Entry #"));

            db.mark_read(&session, Some(notes[0].id)).await.unwrap();
            assert_eq!(db.count_unread(&session).await.unwrap(), 4);
            assert_eq!(db.mark_read(&session, None).await.unwrap(), 4);
            assert!(db
                .list_notifications(&session, true)
                .await
                .unwrap()
                .is_empty());
            db.delete_notification(&session, notes[1].id).await.unwrap();
            assert!(db.delete_notification(&session, notes[1].id).await.is_err());
        });
    }

    #[test]
    fn test_users_are_isolated() {
        block_on(async {
            let (mut db, alice) = setup().await;
            let entry = post(
                &mut db,
                &alice,
                day(2024, 1, 1),
                &["1000=10"],
                &["3000=10"],
            )
            .await;

            db.register("bob", "secret2", None).await.unwrap();
            let bob = db.login("bob", "secret2").await.unwrap();
            assert!(db.load_accounts(&bob).await.unwrap().is_empty());
            assert!(db.get_entry(&bob, entry.id).await.is_err());
            assert!(db.delete_entry(&bob, entry.id).await.is_err());

            // Bob can reuse the same codes
            assert_eq!(
                db.create_standard_chart(&bob).await.unwrap(),
                STANDARD_CHART.len()
            );
        });
    }
}
