use crate::accounts::{AccountId, AccountNameDepth};
use crate::exporters::Exporter;
use crate::formatters::{Currency, Formatter, Negative, Separators, Zero};
use crate::periods::Period;
use crate::repositories::Repository;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Export to the hledger (or ledger) journal format, so that the books can
/// be checked with those tools.
#[derive(Default)]
pub struct Hledger {
    // Only export entries within that period
    pub period: Option<Period>,
}

impl Hledger {
    /// The full name of the account, with the category as the root, e.g.
    /// "Expenses:Operating Expenses:Rent Expense"
    fn account_name(repo: &Repository, id: AccountId) -> String {
        let name = repo.get_account_name(id, AccountNameDepth::unlimited());
        match repo.get_account(id).and_then(|a| repo.category_of(a)) {
            None => name,
            Some(cat) => format!("{}:{}", cat.name(), name),
        }
    }

    /// A formatter that does not round the amount, so that exported
    /// entries stay balanced when lines are finer than the currency.
    fn exact(format: &Formatter, amount: Decimal) -> Formatter {
        let scale = u8::try_from(amount.scale()).unwrap_or(u8::MAX);
        Formatter {
            currency: Currency {
                precision: format.currency.precision.max(scale),
                ..format.currency.clone()
            },
            ..format.clone()
        }
    }

    pub fn export(
        &self,
        repo: &Repository,
        out: &mut impl Write,
        report_progress: impl Fn(u64, u64),
    ) -> Result<()> {
        // hledger does not accept thousands separators by default, and
        // needs a minus sign
        let format = Formatter {
            negative: Negative::MinusSign,
            separators: Separators::None,
            zero: Zero::Replace("0"),
            comma: '.',
            ..repo.format.clone()
        };
        let max = repo.iter_entries().count() as u64;

        for (idx, e) in repo.iter_entries().enumerate() {
            report_progress(idx as u64, max);
            if self.period.is_some_and(|p| !p.contains(e.date)) {
                continue;
            }

            write!(out, "{} *", e.date)?;
            if let Some(r) = &e.reference {
                write!(out, " ({r})")?;
            }
            if let Some(m) = &e.memo {
                write!(out, " {m}")?;
            }
            writeln!(out, "  ; entry:{}", e.id.0)?;

            for line in &e.lines {
                let amount = line.operation.net_debit();
                write!(
                    out,
                    "    {}  {}",
                    Hledger::account_name(repo, line.account),
                    Hledger::exact(&format, amount).display(amount),
                )?;
                if let Some(m) = &line.memo {
                    write!(out, "  ; {m}")?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }
        report_progress(max, max);
        Ok(())
    }
}

impl Exporter for Hledger {
    fn export_file(
        &mut self,
        repo: &Repository,
        export_to: &Path,
        report_progress: impl Fn(u64, u64),
    ) -> Result<()> {
        let file = File::create(export_to).with_context(|| {
            format!("Cannot create {}", export_to.display())
        })?;
        let mut buf = BufWriter::new(file);
        self.export(repo, &mut buf, report_progress)?;
        buf.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::database::test::{day, post, setup};
    use crate::hledger::Hledger;
    use crate::periods::Period;
    use crate::repositories::Repository;
    use crate::transactions::{EntryDetails, LineDetails};
    use futures::executor::block_on;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_export() {
        block_on(async {
            let (mut db, session) = setup().await;
            db.post_entry(
                &session,
                &EntryDetails {
                    date: day(2024, 1, 31),
                    reference: Some("CHK-12"),
                    memo: Some("January rent"),
                    lines: vec![
                        LineDetails::parse("6010=1250", true).unwrap(),
                        LineDetails::parse("1010=1250:paid by check", false)
                            .unwrap(),
                    ],
                },
            )
            .await
            .unwrap();
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();

            let mut out = Vec::new();
            Hledger::default().export(&repo, &mut out, |_, _| {}).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert_eq!(
                text,
                "2024-01-31 * (CHK-12) January rent  ; entry:1\n\
                 \x20   Expenses:Operating Expenses:Rent Expense  $ 1250.00\n\
                 \x20   Assets:Checking Account  $ -1250.00  ; paid by check\n\
                 \n"
            );

            let mut out = Vec::new();
            Hledger {
                period: Some(Period::parse("2024-02", day(2024, 6, 1)).unwrap()),
            }
            .export(&repo, &mut out, |_, _| {})
            .unwrap();
            assert!(out.is_empty());
        });
    }

    #[test]
    fn test_export_keeps_fractions() {
        block_on(async {
            let (mut db, session) = setup().await;
            post(
                &mut db,
                &session,
                day(2024, 3, 1),
                &["6010=0.015"],
                &["1010=0.005", "1000=0.01"],
            )
            .await;
            let repo = Repository::load(&mut db, &session, |_, _| {})
                .await
                .unwrap();

            let mut out = Vec::new();
            Hledger::default().export(&repo, &mut out, |_, _| {}).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("Rent Expense  $ 0.015"));
            assert!(text.contains("Checking Account  $ -0.005"));
            assert!(text.contains("$ -0.01\n"));

            let total: Decimal = text
                .lines()
                .filter(|l| l.starts_with("    "))
                .map(|l| {
                    let (_, amount) = l.split_once("$ ").unwrap();
                    Decimal::from_str(amount.trim()).unwrap()
                })
                .sum();
            assert_eq!(total, Decimal::ZERO);
        });
    }
}
