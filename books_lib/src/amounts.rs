use crate::account_categories::NormalBalance;
use rust_decimal::Decimal;
use serde::Serialize;

/// What a journal line does to its account.
/// The amount is always given as a positive number, the variant says on which
/// side it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    Debit(Decimal),
    Credit(Decimal),
}

impl Operation {
    /// Build an operation from the two columns stored in the database, where
    /// exactly one of them is non-zero.
    pub fn from_columns(debit: Decimal, credit: Decimal) -> Option<Self> {
        match (debit.is_zero(), credit.is_zero()) {
            (false, true) => Some(Operation::Debit(debit)),
            (true, false) => Some(Operation::Credit(credit)),
            (true, true) | (false, false) => None,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Operation::Debit(v) | Operation::Credit(v) => *v,
        }
    }

    pub fn debit(&self) -> Decimal {
        match self {
            Operation::Debit(v) => *v,
            Operation::Credit(_) => Decimal::ZERO,
        }
    }

    pub fn credit(&self) -> Decimal {
        match self {
            Operation::Debit(_) => Decimal::ZERO,
            Operation::Credit(v) => *v,
        }
    }

    /// Debit minus credit
    pub fn net_debit(&self) -> Decimal {
        self.debit() - self.credit()
    }

    /// The effect on the balance of an account with the given normal side
    pub fn signed(&self, normal: NormalBalance) -> Decimal {
        match normal {
            NormalBalance::Debit => self.net_debit(),
            NormalBalance::Credit => -self.net_debit(),
        }
    }
}

/// Cumulated debits and credits for an account (or a set of accounts).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl Totals {
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Debit(v) => self.debit += *v,
            Operation::Credit(v) => self.credit += *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }

    pub fn net_debit(&self) -> Decimal {
        self.debit - self.credit
    }

    /// The balance, positive when it sits on the normal side of the account
    pub fn balance(&self, normal: NormalBalance) -> Decimal {
        match normal {
            NormalBalance::Debit => self.net_debit(),
            NormalBalance::Credit => -self.net_debit(),
        }
    }
}

impl core::ops::AddAssign<&Totals> for Totals {
    fn add_assign(&mut self, rhs: &Totals) {
        self.debit += rhs.debit;
        self.credit += rhs.credit;
    }
}

impl core::ops::Add<&Totals> for Totals {
    type Output = Self;

    fn add(self, rhs: &Totals) -> Self::Output {
        let mut result = self;
        result += rhs;
        result
    }
}

impl<'a> core::iter::Sum<&'a Operation> for Totals {
    fn sum<I: Iterator<Item = &'a Operation>>(iter: I) -> Self {
        let mut result = Totals::default();
        iter.for_each(|op| result.apply(op));
        result
    }
}
