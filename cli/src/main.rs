mod accounts_view;
mod args;
mod cash_flow_view;
mod commands;
mod global_settings;
mod journal_view;
mod ledger_view;
mod notifications_view;
mod shell;
mod statements_view;
pub mod tables;
mod trial_balance_view;

use crate::args::build_cli;
use crate::commands::App;
use crate::global_settings::GlobalSettings;
use crate::shell::shell;
use anyhow::Result;
use futures::executor::block_on;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::info;

fn main() -> Result<()> {
    let args = build_cli().get_matches();

    // RUST_LOG applies unless -v was given
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    if args.get_count("verbose") > 0 {
        builder.filter_level(GlobalSettings::log_level(&args));
    }
    let logger = builder.build();
    let level = logger.filter();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    log::set_max_level(level);

    if let Some(("completions", sub)) = args.subcommand() {
        if let Some(s) = sub.get_one::<clap_complete_command::Shell>("shell") {
            s.generate(&mut build_cli(), &mut std::io::stdout());
        }
        return Ok(());
    }

    let settings = GlobalSettings::new(&args)?;
    let user = settings.user.clone();
    let password = settings.password.clone();
    let mut app = block_on(App::open(settings, progress))?;

    // The user does not exist yet when registering
    let registering = matches!(
        args.subcommand(),
        Some(("user", sub)) if sub.subcommand_name() == Some("register")
    );
    if let Some(u) = user.as_deref().filter(|_| !registering) {
        let msg = block_on(app.login(u, password.as_deref()))?;
        info!("{msg}");
    }

    match args.subcommand_name() {
        Some("shell") => shell(&mut app),
        Some(_) | None => {
            let output = block_on(app.execute(&args))?;
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
            Ok(())
        }
    }
}
