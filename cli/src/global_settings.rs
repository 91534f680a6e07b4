use anyhow::{Context, Result};
use books_lib::formatters::{Currency, Formatter, Negative};
use chrono::{Local, NaiveDate};
use clap::{Arg, ArgAction, ArgMatches, arg};

pub struct GlobalSettings {
    // Path to the SQLite file
    pub database: String,

    // Credentials used to open a session.  When the password is not given,
    // it is asked on the terminal.
    pub user: Option<String>,
    pub password: Option<String>,

    pub table: crate::tables::Settings,

    // How to display numbers
    pub format: Formatter,

    // Reference day for all relative dates ("ytd", "last-month",...)
    pub today: NaiveDate,

    // Output reports as JSON rather than tables
    pub json: bool,
}

impl GlobalSettings {
    /// Return the command line switches to configure the global settings
    pub fn cli() -> impl IntoIterator<Item = Arg> {
        [
            arg!(--database <FILE> "SQLite file holding the books")
                .env("BOOKS_DATABASE")
                .default_value("books.db")
                .global(true),
            arg!(-u --user <NAME> "Log in as this user")
                .env("BOOKS_USER")
                .global(true),
            arg!(--password <PASSWORD> "Password of the user")
                .env("BOOKS_PASSWORD")
                .hide_env_values(true)
                .global(true),
            arg!(--currency <SYMBOL> "Currency symbol used to display amounts")
                .default_value("$")
                .global(true),
            arg!(--"symbol-after" "Show the currency symbol after amounts")
                .global(true),
            arg!(--parenthesis "Show negative amounts within parenthesis")
                .global(true),
            arg!(--today <DATE> "Reference day for relative dates (YYYY-MM-DD)")
                .global(true),
            arg!(--json "Output as JSON").global(true),
            arg!(-v --verbose "Show more log messages")
                .action(ArgAction::Count)
                .global(true),
        ]
    }

    /// Create the settings from the command line arguments.
    pub fn new(args: &ArgMatches) -> Result<Self> {
        let today = match args.get_one::<String>("today") {
            None => Local::now().date_naive(),
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("Invalid --today {d:?}"))?,
        };
        let symbol = args
            .get_one::<String>("currency")
            .map_or("$", String::as_str);

        Ok(GlobalSettings {
            database: args
                .get_one::<String>("database")
                .cloned()
                .unwrap_or_else(|| "books.db".to_string()),
            user: args.get_one::<String>("user").cloned(),
            password: args.get_one::<String>("password").cloned(),
            today,
            json: args.get_flag("json"),
            format: Formatter {
                currency: Currency::new(
                    symbol,
                    args.get_flag("symbol-after"),
                    2,
                ),
                negative: if args.get_flag("parenthesis") {
                    Negative::Parenthesis
                } else {
                    Negative::MinusSign
                },
                ..Formatter::default()
            },
            table: crate::tables::Settings {
                colsep: "│".to_string(),
                indent_size: 2,
            },
        })
    }

    /// Log level requested on the command line
    pub fn log_level(args: &ArgMatches) -> log::LevelFilter {
        match args.get_count("verbose") {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
