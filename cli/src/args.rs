use crate::global_settings::GlobalSettings;
use clap::{Arg, ArgAction, Command, arg};

fn period_arg(default: &'static str) -> Arg {
    arg!(-p --period <PERIOD> "all, ytd, mtd, last-month, last-year, \
          last-N-days, YYYY, YYYY-MM, YYYY-MM-DD or START..END")
    .default_value(default)
}

fn as_of_arg() -> Arg {
    arg!(--"as-of" <PERIOD> "Report balances at the end of this period \
          (a day, a month, a year,...).  Defaults to today")
}

fn line_args() -> [Arg; 2] {
    [
        arg!(-d --debit <LINE> "Debit line, as ACCOUNT=AMOUNT[:memo]")
            .action(ArgAction::Append),
        arg!(-c --credit <LINE> "Credit line, as ACCOUNT=AMOUNT[:memo]")
            .action(ArgAction::Append),
    ]
}

fn user_commands() -> Command {
    Command::new("user")
        .about("Manage users")
        .subcommand_required(true)
        .subcommand(
            Command::new("register")
                .about("Create a new user")
                .arg(arg!(<USERNAME> "Name used to log in"))
                .arg(arg!(--"full-name" <NAME> "Name to display")),
        )
        .subcommand(
            Command::new("passwd").about("Change the password of the user"),
        )
        .subcommand(Command::new("whoami").about("Show the logged-in user"))
}

fn account_commands() -> Command {
    Command::new("accounts")
        .about("Manage the chart of accounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List accounts")
                .arg(arg!(--"hide-closed" "Do not show closed accounts")),
        )
        .subcommand(
            Command::new("add")
                .about("Create an account")
                .arg(arg!(<CODE> "Short code, e.g. 1010"))
                .arg(arg!(<NAME> "Name of the account"))
                .arg(arg!(-k --kind <KIND> "Kind of account (see 'kinds')")
                    .required(true))
                .arg(arg!(--parent <ACCOUNT> "Code or name of the parent"))
                .arg(arg!(--description <TEXT> "Free-form description")),
        )
        .subcommand(
            Command::new("edit")
                .about("Modify an account")
                .arg(arg!(<ACCOUNT> "Code or name of the account"))
                .arg(arg!(--code <CODE> "New code"))
                .arg(arg!(--name <NAME> "New name"))
                .arg(arg!(-k --kind <KIND> "New kind"))
                .arg(arg!(--parent <ACCOUNT> "New parent")
                    .conflicts_with("no-parent"))
                .arg(arg!(--"no-parent" "Move the account to the top level"))
                .arg(arg!(--description <TEXT> "New description, empty \
                          to remove it")),
        )
        .subcommand(
            Command::new("close")
                .about("Close an account, it no longer accepts new lines")
                .arg(arg!(<ACCOUNT> "Code or name of the account")),
        )
        .subcommand(
            Command::new("reopen")
                .about("Reopen a closed account")
                .arg(arg!(<ACCOUNT> "Code or name of the account")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete an unused account")
                .arg(arg!(<ACCOUNT> "Code or name of the account")),
        )
        .subcommand(Command::new("kinds").about("List the kinds of accounts"))
        .subcommand(
            Command::new("seed")
                .about("Create the accounts of the standard chart"),
        )
}

fn journal_commands() -> Command {
    Command::new("journal")
        .about("Manage journal entries")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Post a new entry")
                .arg(arg!(--date <DATE> "Date of the entry, defaults to today"))
                .arg(arg!(-r --reference <REF> "Invoice or check number"))
                .arg(arg!(-m --memo <TEXT> "Description of the entry"))
                .args(line_args()),
        )
        .subcommand(
            Command::new("list")
                .about("List entries")
                .arg(period_arg("all"))
                .arg(arg!(-a --account <ACCOUNT> "Only entries with a line \
                          on this account")),
        )
        .subcommand(
            Command::new("show")
                .about("Show one entry")
                .arg(arg!(<ID> "Id of the entry").value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            Command::new("edit")
                .about("Modify an entry.  Lines, when given, replace all \
                        existing lines")
                .arg(arg!(<ID> "Id of the entry").value_parser(clap::value_parser!(i64)))
                .arg(arg!(--date <DATE> "New date"))
                .arg(arg!(-r --reference <REF> "New reference, empty to \
                          remove it"))
                .arg(arg!(-m --memo <TEXT> "New memo, empty to remove it"))
                .args(line_args()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete an entry")
                .arg(arg!(<ID> "Id of the entry").value_parser(clap::value_parser!(i64))),
        )
}

fn notification_commands() -> Command {
    Command::new("notifications")
        .about("Show and manage notifications")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List notifications, newest first")
                .arg(arg!(--unread "Only show unread notifications")),
        )
        .subcommand(
            Command::new("read")
                .about("Mark a notification, or all of them, as read")
                .arg(arg!([ID] "Id of the notification")
                    .value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a notification")
                .arg(arg!(<ID> "Id of the notification")
                    .value_parser(clap::value_parser!(i64))),
        )
}

/// The commands available both from the command line and in the shell
pub(crate) fn commands() -> Vec<Command> {
    vec![
        user_commands(),
        account_commands(),
        journal_commands(),
        Command::new("ledger")
            .about("Show the running balance of an account")
            .arg(arg!(<ACCOUNT> "Code or name of the account"))
            .arg(period_arg("all"))
            .arg(arg!(-s --subaccounts "Include lines of child accounts")),
        Command::new("trial-balance")
            .about("Show all balances, and check debits equal credits")
            .arg(as_of_arg())
            .arg(arg!(--empty "Also show accounts with no lines")),
        Command::new("income-statement")
            .about("Show revenue, expenses and net income")
            .arg(period_arg("ytd"))
            .arg(arg!(--zero "Also show accounts with a zero amount"))
            .arg(arg!(--"no-subtotals" "Parents only show their own amount")),
        Command::new("balance-sheet")
            .about("Show assets, liabilities and equity")
            .arg(as_of_arg())
            .arg(arg!(--zero "Also show accounts with a zero amount"))
            .arg(arg!(--"no-subtotals" "Parents only show their own amount")),
        Command::new("cash-flow")
            .about("Show cash movements by activity")
            .arg(period_arg("ytd")),
        notification_commands(),
        Command::new("activity")
            .about("Show the most recent actions")
            .arg(
                arg!(-n --limit <COUNT> "Number of actions to show")
                    .value_parser(clap::value_parser!(u32))
                    .default_value("20"),
            ),
        Command::new("export")
            .about("Export data to other formats")
            .subcommand_required(true)
            .flatten_help(true)
            .subcommand(
                Command::new("hledger")
                    .arg(
                        arg!(-o --output [FILE] "Name of output file")
                            .default_value("hledger.journal"),
                    )
                    .arg(arg!(-p --period <PERIOD> "Only export entries \
                              within this period")),
            ),
    ]
}

pub(crate) fn build_cli() -> Command {
    Command::new("books")
        .version("0.1")
        .about("Keep the books of a small business")
        .subcommand_required(true)
        .subcommand_precedence_over_arg(true) // --x val1 val2 subcommand
        .arg_required_else_help(true) // show full help if nothing given
        .args(GlobalSettings::cli())
        .subcommands(commands())
        .subcommand(
            // Use    eval "$(books completions zsh)"
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .value_name("SHELL")
                        .help("The shell to generate the completions for")
                        .required(true)
                        .value_parser(clap::builder::EnumValueParser::<
                            clap_complete_command::Shell,
                        >::new()),
                ),
        )
        .subcommand(
            Command::new("shell")
                .about("Interactive shell, keeping the session open"),
        )
}

/// The parser used for each line typed in the shell.  Global settings are
/// fixed when the shell starts.
pub(crate) fn build_shell() -> Command {
    Command::new("")
        .multicall(true)
        .subcommand_required(true)
        .subcommands(commands())
        .subcommand(
            Command::new("login")
                .about("Open a session")
                .arg(arg!(<USERNAME> "Name of the user")),
        )
        .subcommand(Command::new("logout").about("Close the session"))
        .subcommand(
            Command::new("quit").alias("exit").about("Leave the shell"),
        )
}

#[cfg(test)]
mod test {
    use crate::args::{build_cli, build_shell};

    #[test]
    fn test_cli() {
        build_cli().debug_assert();
        build_shell().debug_assert();
    }

    #[test]
    fn test_journal_add() {
        let m = build_cli()
            .try_get_matches_from([
                "books", "--user", "alice", "journal", "add", "--date",
                "2024-01-05", "-d", "6010=500", "-c", "1010=500:check 12",
            ])
            .unwrap();
        assert_eq!(m.get_one::<String>("user").unwrap(), "alice");
        let (name, journal) = m.subcommand().unwrap();
        assert_eq!(name, "journal");
        let (name, add) = journal.subcommand().unwrap();
        assert_eq!(name, "add");
        let debits: Vec<&String> =
            add.get_many::<String>("debit").unwrap().collect();
        assert_eq!(debits, ["6010=500"]);
        let credits: Vec<&String> =
            add.get_many::<String>("credit").unwrap().collect();
        assert_eq!(credits, ["1010=500:check 12"]);
    }

    #[test]
    fn test_defaults() {
        let m = build_cli()
            .try_get_matches_from(["books", "income-statement"])
            .unwrap();
        let (_, sub) = m.subcommand().unwrap();
        assert_eq!(sub.get_one::<String>("period").unwrap(), "ytd");
        assert!(!m.get_flag("json"));

        assert!(build_cli()
            .try_get_matches_from(["books", "ledger"])
            .is_err());
    }

    #[test]
    fn test_shell() {
        let m = build_shell()
            .try_get_matches_from(["trial-balance", "--as-of", "2024"])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "trial-balance");
        assert_eq!(sub.get_one::<String>("as-of").unwrap(), "2024");

        let m = build_shell().try_get_matches_from(["exit"]).unwrap();
        assert_eq!(m.subcommand_name(), Some("quit"));
    }
}
