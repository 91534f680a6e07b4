use crate::account_kinds::CashFlowSection;
use crate::accounts::AccountId;
use crate::formatters::Currency;
use crate::periods::Period;
use crate::repositories::Repository;
use crate::transactions::JournalLine;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Split `total` proportionally to the weights.  Each share is rounded to
/// the currency's precision, and the rounding remainder goes to the
/// heaviest weight (the first one in case of ties), so that the shares
/// always add up to `total`.
pub fn allocate(
    total: Decimal,
    weights: &[Decimal],
    currency: &Currency,
) -> Vec<Decimal> {
    let sum: Decimal = weights.iter().sum();
    if sum.is_zero() {
        return vec![Decimal::ZERO; weights.len()];
    }
    let mut shares: Vec<Decimal> = weights
        .iter()
        // The ratio is at most 1, so the product cannot overflow
        .map(|w| currency.round(total * (*w / sum)))
        .collect();
    let remainder = total - shares.iter().sum::<Decimal>();
    if !remainder.is_zero() {
        let heaviest = weights.iter().enumerate().fold(
            None,
            |best: Option<(usize, &Decimal)>, (idx, w)| match best {
                Some((_, b)) if b >= w => best,
                Some(_) | None => Some((idx, w)),
            },
        );
        if let Some(share) = heaviest.and_then(|(idx, _)| shares.get_mut(idx))
        {
            *share += remainder;
        }
    }
    shares
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowRow {
    pub account: AccountId,
    pub code: String,
    pub name: String,

    // Positive when cash came in from this account
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowSectionReport {
    pub section: CashFlowSection,
    pub rows: Vec<CashFlowRow>,
    pub total: Decimal,
}

/// Where the cash came from, and where it went, during a period.
/// Every entry that moves cash is attributed to its non-cash lines, in
/// proportion of their amounts.  Each of these counterpart accounts then
/// belongs to one of the sections, via its kind.
#[derive(Debug, Serialize)]
pub struct CashFlowStatement {
    pub period: Period,
    pub sections: Vec<CashFlowSectionReport>,
    pub net_change: Decimal,
    pub opening_cash: Decimal,
    pub closing_cash: Decimal,
}

impl CashFlowStatement {
    pub fn new(repo: &Repository, period: Period) -> Self {
        let currency = &repo.format.currency;
        let mut per_account: HashMap<AccountId, Decimal> = HashMap::new();

        for e in repo.iter_entries_in(&period) {
            let (cash, others): (Vec<&JournalLine>, Vec<&JournalLine>) =
                e.lines.iter().partition(|l| repo.is_cash(l.account));
            let delta: Decimal =
                cash.iter().map(|l| l.operation.net_debit()).sum();

            // Transfers between cash accounts do not change the total cash
            if delta.is_zero() || others.is_empty() {
                continue;
            }

            let weights: Vec<Decimal> = others
                .iter()
                .map(|l| l.operation.net_debit().abs())
                .collect();
            for (line, share) in
                others.iter().zip(allocate(delta, &weights, currency))
            {
                *per_account.entry(line.account).or_default() += share;
            }
        }

        let mut sections = Vec::new();
        for section in CashFlowSection::ALL {
            let mut rows: Vec<CashFlowRow> = per_account
                .iter()
                .filter(|(_, amount)| !amount.is_zero())
                .filter_map(|(id, amount)| {
                    let acc = repo.get_account(*id)?;
                    if repo.kind_of(acc)?.cash_flow != section {
                        return None;
                    }
                    Some(CashFlowRow {
                        account: *id,
                        code: acc.code.clone(),
                        name: acc.name.clone(),
                        amount: *amount,
                    })
                })
                .collect();
            rows.sort_by(|r1, r2| r1.code.cmp(&r2.code));
            sections.push(CashFlowSectionReport {
                section,
                total: rows.iter().map(|r| r.amount).sum(),
                rows,
            });
        }

        let net_change = sections.iter().map(|s| s.total).sum();
        let opening_cash = match period.day_before_start() {
            None => Decimal::ZERO,
            Some(d) => cash_balance(repo, d),
        };
        CashFlowStatement {
            period,
            sections,
            net_change,
            opening_cash,
            closing_cash: cash_balance(repo, period.end),
        }
    }

    pub fn section(&self, section: CashFlowSection) -> Option<&CashFlowSectionReport> {
        self.sections.iter().find(|s| s.section == section)
    }
}

/// Total of all cash accounts at the end of the given day
fn cash_balance(repo: &Repository, as_of: NaiveDate) -> Decimal {
    repo.balances_as_of(as_of)
        .iter()
        .filter(|(id, _)| repo.is_cash(**id))
        .map(|(_, totals)| totals.net_debit())
        .sum()
}
