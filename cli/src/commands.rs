use crate::accounts_view::{accounts_view, kinds_view};
use crate::cash_flow_view::cash_flow_view;
use crate::global_settings::GlobalSettings;
use crate::journal_view::journal_view;
use crate::ledger_view::ledger_view;
use crate::notifications_view::{activity_view, notifications_view};
use crate::statements_view::{balance_sheet_view, income_statement_view};
use crate::trial_balance_view::trial_balance_view;
use anyhow::{Context, Result, bail};
use books_lib::accounts::{AccountChanges, AccountDetails};
use books_lib::balance_sheet::BalanceSheet;
use books_lib::cash_flows::CashFlowStatement;
use books_lib::database::Database;
use books_lib::exporters::Exporter;
use books_lib::hledger::Hledger;
use books_lib::income_statement::IncomeStatement;
use books_lib::ledger::Ledger;
use books_lib::notifications::NotificationId;
use books_lib::periods::Period;
use books_lib::repositories::Repository;
use books_lib::transactions::{
    EntryChanges, EntryDetails, EntryId, JournalEntry, LineDetails,
};
use books_lib::trial_balance::TrialBalance;
use books_lib::users::Session;
use chrono::NaiveDate;
use clap::ArgMatches;
use console::Term;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;
use std::path::Path;

/// The state shared by all commands: the open database, and the session of
/// the logged-in user if any.
pub struct App {
    pub db: Database,
    pub settings: GlobalSettings,
    pub session: Option<Session>,
    progress: MultiProgress,
}

fn logged_in(session: &Option<Session>) -> Result<&Session> {
    session
        .as_ref()
        .context("Not logged in, use --user or the 'login' command")
}

fn read_password(prompt: &str) -> Result<String> {
    let term = Term::stderr();
    term.write_str(prompt)?;
    Ok(term.read_secure_line()?)
}

/// Ask twice for a new password
fn read_new_password() -> Result<String> {
    let pwd = read_password("New password: ")?;
    if read_password("Confirm password: ")? != pwd {
        bail!("Passwords do not match");
    }
    Ok(pwd)
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {text:?}, expected YYYY-MM-DD"))
}

/// The debit lines (first) then the credit lines given on the command line
pub(crate) fn parse_lines(args: &ArgMatches) -> Result<Vec<LineDetails<'_>>> {
    let mut lines = Vec::new();
    for (id, debit) in [("debit", true), ("credit", false)] {
        for text in args.get_many::<String>(id).into_iter().flatten() {
            lines.push(LineDetails::parse(text, debit)?);
        }
    }
    Ok(lines)
}

fn flag(args: &ArgMatches, id: &str) -> bool {
    args.get_flag(id)
}

fn opt_str<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a str> {
    args.get_one::<String>(id).map(String::as_str)
}

fn required_str<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    opt_str(args, id).with_context(|| format!("Missing argument {id}"))
}

impl App {
    pub async fn open(
        settings: GlobalSettings,
        progress: MultiProgress,
    ) -> Result<Self> {
        let db = Database::open(&settings.database)
            .await
            .with_context(|| format!("Cannot open {}", settings.database))?;
        Ok(App {
            db,
            settings,
            session: None,
            progress,
        })
    }

    /// Open a session.  The password is asked on the terminal when not
    /// given.
    pub async fn login(
        &mut self,
        username: &str,
        password: Option<&str>,
    ) -> Result<String> {
        let password = match password {
            Some(p) => p.to_string(),
            None => read_password(&format!("Password for {username}: "))?,
        };
        let session = self.db.login(username, &password).await?;
        let unread = self.db.count_unread(&session).await?;
        let msg = format!(
            "Logged in as {}, {unread} unread notification(s)",
            session.user.username
        );
        self.session = Some(session);
        Ok(msg)
    }

    pub fn logout(&mut self) -> String {
        match self.session.take() {
            None => "Not logged in".to_string(),
            Some(s) => format!("Logged out {}", s.user.username),
        }
    }

    fn progress_bar(&self, msg: &'static str) -> Result<ProgressBar> {
        Ok(self.progress.add(
            ProgressBar::new(1) //  we do not know the length
                .with_style(ProgressStyle::with_template(
                    "[{pos:2}/{len:2}] {msg} {wide_bar} {elapsed_precise}",
                )?)
                .with_message(msg),
        ))
    }

    /// Load a snapshot of the user's books, on which reports are computed
    async fn repository(&mut self) -> Result<Repository> {
        let session = logged_in(&self.session)?;
        let progress = self.progress_bar("loading")?;
        let mut repo =
            Repository::load(&mut self.db, session, |current, max| {
                progress.set_length(max);
                progress.set_position(current);
            })
            .await?;
        progress.finish_and_clear();
        repo.format = self.settings.format.clone();
        Ok(repo)
    }

    fn output<T: Serialize>(
        &self,
        value: &T,
        view: impl FnOnce() -> String,
    ) -> Result<String> {
        if self.settings.json {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(view())
        }
    }

    fn period(&self, args: &ArgMatches) -> Result<Period> {
        let text = required_str(args, "period")?;
        Ok(Period::parse(text, self.settings.today)?)
    }

    /// The last day of the period given by --as-of
    fn as_of(&self, args: &ArgMatches) -> Result<NaiveDate> {
        Ok(match opt_str(args, "as-of") {
            None => self.settings.today,
            Some(text) => Period::parse(text, self.settings.today)?.end,
        })
    }

    /// Display entries, with the names of their accounts
    async fn show_entries(
        &mut self,
        entries: Vec<JournalEntry>,
    ) -> Result<String> {
        if self.settings.json {
            return Ok(serde_json::to_string_pretty(&entries)?);
        }
        let session = logged_in(&self.session)?;
        let accounts = self.db.load_accounts(session).await?;
        let mut repo = Repository::new(
            accounts,
            self.db.account_kinds().clone(),
            entries,
        );
        repo.format = self.settings.format.clone();
        Ok(journal_view(&repo, repo.iter_entries(), &self.settings.table))
    }

    /// Run one command, and return what should be displayed
    pub async fn execute(&mut self, args: &ArgMatches) -> Result<String> {
        match args.subcommand() {
            Some(("user", sub)) => self.user(sub).await,
            Some(("accounts", sub)) => self.accounts(sub).await,
            Some(("journal", sub)) => self.journal(sub).await,
            Some(("notifications", sub)) => self.notifications(sub).await,
            Some(("ledger", sub)) => {
                let repo = self.repository().await?;
                let name = required_str(sub, "ACCOUNT")?;
                let account = repo
                    .find_account(name)
                    .with_context(|| format!("No such account: {name}"))?;
                let include_subaccounts = flag(sub, "subaccounts");
                let ledger = Ledger::new(
                    &repo,
                    account.id,
                    self.period(sub)?,
                    &books_lib::ledger::Settings {
                        include_subaccounts,
                    },
                )?;
                self.output(&ledger, || {
                    ledger_view(
                        &repo,
                        &ledger,
                        &crate::ledger_view::Settings {
                            column_account: include_subaccounts,
                            table: self.settings.table.clone(),
                        },
                    )
                })
            }
            Some(("trial-balance", sub)) => {
                let repo = self.repository().await?;
                let trial = TrialBalance::new(
                    &repo,
                    self.as_of(sub)?,
                    &books_lib::trial_balance::Settings {
                        include_empty: flag(sub, "empty"),
                    },
                );
                self.output(&trial, || {
                    trial_balance_view(&repo, &trial, &self.settings.table)
                })
            }
            Some(("income-statement", sub)) => {
                let repo = self.repository().await?;
                let statement = IncomeStatement::new(
                    &repo,
                    self.period(sub)?,
                    &statement_settings(sub),
                );
                self.output(&statement, || {
                    income_statement_view(&repo, &statement, &self.settings.table)
                })
            }
            Some(("balance-sheet", sub)) => {
                let repo = self.repository().await?;
                let sheet = BalanceSheet::new(
                    &repo,
                    self.as_of(sub)?,
                    &statement_settings(sub),
                );
                self.output(&sheet, || {
                    balance_sheet_view(&repo, &sheet, &self.settings.table)
                })
            }
            Some(("cash-flow", sub)) => {
                let repo = self.repository().await?;
                let statement = CashFlowStatement::new(&repo, self.period(sub)?);
                self.output(&statement, || {
                    cash_flow_view(&repo, &statement, &self.settings.table)
                })
            }
            Some(("activity", sub)) => {
                let session = logged_in(&self.session)?;
                let limit = sub.get_one::<u32>("limit").copied().unwrap_or(20);
                let records = self.db.list_activity(session, limit).await?;
                self.output(&records, || {
                    activity_view(&records, &self.settings.table)
                })
            }
            Some(("export", sub)) => match sub.subcommand() {
                Some(("hledger", args)) => {
                    let repo = self.repository().await?;
                    let output = required_str(args, "output")?;
                    let period = opt_str(args, "period")
                        .map(|p| Period::parse(p, self.settings.today))
                        .transpose()?;
                    let progress = self.progress_bar("exporting")?;
                    Hledger { period }.export_file(
                        &repo,
                        Path::new(output),
                        |current, max| {
                            progress.set_length(max);
                            progress.set_position(current);
                        },
                    )?;
                    progress.finish_and_clear();
                    info!("Exported to {output}");
                    Ok(format!("Exported to {output}"))
                }
                Some((name, _)) => bail!("Unknown export format {name}"),
                None => bail!("Missing export format"),
            },
            Some((name, _)) => bail!("Unknown command {name}"),
            None => bail!("Missing command"),
        }
    }

    async fn user(&mut self, args: &ArgMatches) -> Result<String> {
        match args.subcommand() {
            Some(("register", sub)) => {
                let username = required_str(sub, "USERNAME")?;
                let password = match &self.settings.password {
                    Some(p) => p.clone(),
                    None => read_new_password()?,
                };
                let user = self
                    .db
                    .register(username, &password, opt_str(sub, "full-name"))
                    .await?;
                Ok(format!("Registered user {}", user.username))
            }
            Some(("passwd", _)) => {
                let session = logged_in(&self.session)?;
                let current = read_password("Current password: ")?;
                let new = read_new_password()?;
                self.db.change_password(session, &current, &new).await?;
                Ok("Password changed".to_string())
            }
            Some(("whoami", _)) => {
                let session = logged_in(&self.session)?;
                let user = &session.user;
                Ok(match &user.full_name {
                    None => user.username.clone(),
                    Some(full) => format!("{} ({full})", user.username),
                })
            }
            Some((name, _)) => bail!("Unknown command user {name}"),
            None => bail!("Missing command"),
        }
    }

    async fn accounts(&mut self, args: &ArgMatches) -> Result<String> {
        let session = logged_in(&self.session)?;
        match args.subcommand() {
            Some(("list", sub)) => {
                let accounts = self.db.load_accounts(session).await?;
                self.output(&accounts.iter().collect::<Vec<_>>(), || {
                    accounts_view(
                        &accounts,
                        self.db.account_kinds(),
                        &crate::accounts_view::Settings {
                            hide_closed: flag(sub, "hide-closed"),
                            table: self.settings.table.clone(),
                        },
                    )
                })
            }
            Some(("kinds", _)) => {
                let kinds = self.db.account_kinds();
                let list: Vec<_> = kinds.iter().map(|(_, k)| k).collect();
                self.output(&list, || kinds_view(kinds, &self.settings.table))
            }
            Some(("add", sub)) => {
                let acc = self
                    .db
                    .create_account(
                        session,
                        &AccountDetails {
                            code: required_str(sub, "CODE")?,
                            name: required_str(sub, "NAME")?,
                            kind: required_str(sub, "kind")?,
                            parent: opt_str(sub, "parent"),
                            description: opt_str(sub, "description"),
                        },
                    )
                    .await?;
                self.output(&acc, || {
                    format!("Created account {} {}", acc.code, acc.name)
                })
            }
            Some(("edit", sub)) => {
                let parent = if flag(sub, "no-parent") {
                    Some(None)
                } else {
                    opt_str(sub, "parent").map(Some)
                };
                let acc = self
                    .db
                    .update_account(
                        session,
                        required_str(sub, "ACCOUNT")?,
                        &AccountChanges {
                            code: opt_str(sub, "code"),
                            name: opt_str(sub, "name"),
                            kind: opt_str(sub, "kind"),
                            parent,
                            description: opt_str(sub, "description").map(Some),
                        },
                    )
                    .await?;
                self.output(&acc, || {
                    format!("Updated account {} {}", acc.code, acc.name)
                })
            }
            Some(("close", sub)) => {
                let acc = self
                    .db
                    .close_account(session, required_str(sub, "ACCOUNT")?)
                    .await?;
                Ok(format!("Closed account {} {}", acc.code, acc.name))
            }
            Some(("reopen", sub)) => {
                let acc = self
                    .db
                    .reopen_account(session, required_str(sub, "ACCOUNT")?)
                    .await?;
                Ok(format!("Reopened account {} {}", acc.code, acc.name))
            }
            Some(("delete", sub)) => {
                let name = required_str(sub, "ACCOUNT")?;
                self.db.delete_account(session, name).await?;
                Ok(format!("Deleted account {name}"))
            }
            Some(("seed", _)) => {
                let count = self.db.create_standard_chart(session).await?;
                Ok(format!("Created {count} account(s)"))
            }
            Some((name, _)) => bail!("Unknown command accounts {name}"),
            None => bail!("Missing command"),
        }
    }

    async fn journal(&mut self, args: &ArgMatches) -> Result<String> {
        let session = logged_in(&self.session)?;
        match args.subcommand() {
            Some(("add", sub)) => {
                let date = match opt_str(sub, "date") {
                    None => self.settings.today,
                    Some(d) => parse_date(d)?,
                };
                let entry = self
                    .db
                    .post_entry(
                        session,
                        &EntryDetails {
                            date,
                            reference: opt_str(sub, "reference"),
                            memo: opt_str(sub, "memo"),
                            lines: parse_lines(sub)?,
                        },
                    )
                    .await?;
                self.show_entries(vec![entry]).await
            }
            Some(("list", sub)) => {
                let period = self.period(sub)?;
                let account = match opt_str(sub, "account") {
                    None => None,
                    Some(name) => Some(
                        self.db
                            .load_accounts(session)
                            .await?
                            .lookup(name)
                            .with_context(|| format!("No such account: {name}"))?
                            .id,
                    ),
                };
                let progress = self.progress_bar("loading")?;
                let entries = self
                    .db
                    .list_entries(session, Some(&period), account, |current, max| {
                        progress.set_length(max);
                        progress.set_position(current);
                    })
                    .await?;
                progress.finish_and_clear();
                self.show_entries(entries).await
            }
            Some(("show", sub)) => {
                let id = entry_id(sub)?;
                let entry = self.db.get_entry(session, id).await?;
                self.show_entries(vec![entry]).await
            }
            Some(("edit", sub)) => {
                let id = entry_id(sub)?;
                let lines = parse_lines(sub)?;
                let entry = self
                    .db
                    .edit_entry(
                        session,
                        id,
                        &EntryChanges {
                            date: opt_str(sub, "date").map(parse_date).transpose()?,
                            reference: opt_str(sub, "reference").map(Some),
                            memo: opt_str(sub, "memo").map(Some),
                            lines: if lines.is_empty() { None } else { Some(lines) },
                        },
                    )
                    .await?;
                self.show_entries(vec![entry]).await
            }
            Some(("delete", sub)) => {
                let id = entry_id(sub)?;
                self.db.delete_entry(session, id).await?;
                Ok(format!("Deleted entry #{}", id.0))
            }
            Some((name, _)) => bail!("Unknown command journal {name}"),
            None => bail!("Missing command"),
        }
    }

    async fn notifications(&mut self, args: &ArgMatches) -> Result<String> {
        let session = logged_in(&self.session)?;
        match args.subcommand() {
            Some(("list", sub)) => {
                let list = self
                    .db
                    .list_notifications(session, flag(sub, "unread"))
                    .await?;
                self.output(&list, || {
                    notifications_view(&list, &self.settings.table)
                })
            }
            Some(("read", sub)) => {
                let id = sub.get_one::<i64>("ID").copied().map(NotificationId);
                let count = self.db.mark_read(session, id).await?;
                Ok(format!("Marked {count} notification(s) as read"))
            }
            Some(("delete", sub)) => {
                let id = sub
                    .get_one::<i64>("ID")
                    .copied()
                    .context("Missing notification id")?;
                self.db.delete_notification(session, NotificationId(id)).await?;
                Ok(format!("Deleted notification {id}"))
            }
            Some((name, _)) => bail!("Unknown command notifications {name}"),
            None => bail!("Missing command"),
        }
    }
}

fn entry_id(args: &ArgMatches) -> Result<EntryId> {
    args.get_one::<i64>("ID")
        .copied()
        .map(EntryId)
        .context("Missing entry id")
}

fn statement_settings(args: &ArgMatches) -> books_lib::statements::Settings {
    books_lib::statements::Settings {
        hide_zero_rows: !flag(args, "zero"),
        subtotals: !flag(args, "no-subtotals"),
    }
}
