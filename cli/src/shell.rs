use crate::args::build_shell;
use crate::commands::App;
use anyhow::{Context, Result};
use console::Term;
use futures::executor::block_on;

enum Outcome {
    Continue(String),
    Quit,
}

/// Split a line the way a POSIX shell would, so that names with spaces can
/// be quoted.
pub(crate) fn split_line(line: &str) -> Result<Vec<String>> {
    shlex::split(line).context("Invalid quoting")
}

fn respond(app: &mut App, line: &str) -> Result<Outcome> {
    let words = split_line(line)?;
    if words.is_empty() {
        return Ok(Outcome::Continue(String::new()));
    }
    let matches = match build_shell().try_get_matches_from(words) {
        Ok(m) => m,
        // Also used for --help
        Err(e) => return Ok(Outcome::Continue(e.render().to_string())),
    };
    Ok(match matches.subcommand() {
        Some(("quit", _)) => Outcome::Quit,
        Some(("logout", _)) => Outcome::Continue(app.logout()),
        Some(("login", sub)) => {
            let username = sub
                .get_one::<String>("USERNAME")
                .context("Missing user name")?;
            // --password, when given, also applies in the shell
            let password = app.settings.password.clone();
            Outcome::Continue(block_on(app.login(username, password.as_deref()))?)
        }
        Some(_) | None => Outcome::Continue(block_on(app.execute(&matches))?),
    })
}

/// An interactive loop, which keeps the session open between commands.
/// Errors are displayed, and do not stop the shell.
pub fn shell(app: &mut App) -> Result<()> {
    let term = Term::stdout();
    loop {
        let prompt = match &app.session {
            None => "books> ".to_string(),
            Some(s) => format!("{}@books> ", s.user.username),
        };
        term.write_str(&prompt)?;
        term.flush()?;

        let mut line = String::new();
        // Do not keep stdin locked, passwords are also read from it
        if std::io::stdin().read_line(&mut line)? == 0 {
            term.write_line("")?;
            return Ok(());
        }
        match respond(app, &line) {
            Ok(Outcome::Quit) => return Ok(()),
            Ok(Outcome::Continue(out)) => {
                if !out.is_empty() {
                    term.write_line(out.trim_end())?;
                }
            }
            Err(e) => term.write_line(&format!("Error: {e:#}"))?,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::args::build_cli;
    use crate::commands::App;
    use crate::global_settings::GlobalSettings;
    use crate::shell::{Outcome, respond, split_line};
    use futures::executor::block_on;
    use indicatif::MultiProgress;

    fn output(app: &mut App, line: &str) -> String {
        match respond(app, line).unwrap() {
            Outcome::Continue(out) => out,
            Outcome::Quit => panic!("{line:?} should not quit"),
        }
    }

    #[test]
    fn test_split_line() {
        assert_eq!(
            split_line(r#"accounts add 1020 "Savings Account" -k Bank"#)
                .unwrap(),
            ["accounts", "add", "1020", "Savings Account", "-k", "Bank"],
        );
        assert_eq!(
            split_line("journal add -d 6010=500:'office rent'").unwrap(),
            ["journal", "add", "-d", "6010=500:office rent"],
        );
        assert!(split_line("  ").unwrap().is_empty());
        assert!(split_line(r#"ledger "Cash"#).is_err());
    }

    #[test]
    fn test_respond() {
        let args = build_cli()
            .try_get_matches_from([
                "books", "--database", ":memory:", "--password", "secret1",
                "shell",
            ])
            .unwrap();
        let settings = GlobalSettings::new(&args).unwrap();
        let mut app =
            block_on(App::open(settings, MultiProgress::new())).unwrap();

        assert_eq!(output(&mut app, "   "), "");
        output(&mut app, "user register carol");
        assert!(output(&mut app, "login carol").starts_with("Logged in as carol"));
        assert!(app.session.is_some());
        assert!(output(&mut app, "accounts seed").contains("21"));

        // Parse errors and failed commands are reported, the shell goes on
        assert!(output(&mut app, "ledger").contains("ACCOUNT"));
        assert!(respond(&mut app, "ledger 9999").is_err());
        assert!(respond(&mut app, "journal show 'x").is_err());

        assert_eq!(output(&mut app, "logout"), "Logged out carol");
        assert!(app.session.is_none());
        assert!(respond(&mut app, "accounts list").is_err());
        assert_eq!(output(&mut app, "logout"), "Not logged in");

        assert!(matches!(respond(&mut app, "quit"), Ok(Outcome::Quit)));
        assert!(matches!(respond(&mut app, "exit"), Ok(Outcome::Quit)));
    }
}
