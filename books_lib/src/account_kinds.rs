/// Fine-grained properties for accounts. Thanks to these flags, we can make
/// various computations, in particular decide which accounts hold cash and
/// how cash movements are categorized in the cash flow statement.
use crate::account_categories::AccountCategory;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CashFlowSection {
    Operating,
    Investing,
    Financing,
}

impl CashFlowSection {
    pub const ALL: [CashFlowSection; 3] = [
        CashFlowSection::Operating,
        CashFlowSection::Investing,
        CashFlowSection::Financing,
    ];
}

impl fmt::Display for CashFlowSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CashFlowSection::Operating => "Operating activities",
            CashFlowSection::Investing => "Investing activities",
            CashFlowSection::Financing => "Financing activities",
        })
    }
}

#[derive(Clone)]
pub struct AccountKindCollection(Vec<AccountKind>);

impl AccountKindCollection {
    pub fn add(&mut self, kind: AccountKind) -> AccountKindId {
        self.0.push(kind);
        AccountKindId(self.0.len() as u32)
    }

    pub fn get(&self, id: AccountKindId) -> Option<&AccountKind> {
        self.0.get((id.0 as usize).checked_sub(1)?)
    }

    /// Case-insensitive lookup by name
    pub fn find(&self, name: &str) -> Option<AccountKindId> {
        let name = name.trim().to_lowercase();
        self.0
            .iter()
            .position(|k| k.name.to_lowercase() == name)
            .map(|idx| AccountKindId(idx as u32 + 1))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccountKindId, &AccountKind)> {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, k)| (AccountKindId(idx as u32 + 1), k))
    }
}

impl Default for AccountKindCollection {
    fn default() -> Self {
        let mut a = Self(Vec::new());

        a.add(AccountKind::new("Cash", AccountCategory::ASSET).set_is_cash(true));
        a.add(AccountKind::new("Bank", AccountCategory::ASSET).set_is_cash(true));
        a.add(AccountKind::new("Receivable", AccountCategory::ASSET));
        a.add(AccountKind::new("Inventory", AccountCategory::ASSET));
        a.add(AccountKind::new("Prepaid Expense", AccountCategory::ASSET));
        a.add(
            AccountKind::new("Fixed Asset", AccountCategory::ASSET)
                .set_cash_flow(CashFlowSection::Investing),
        );
        a.add(
            AccountKind::new("Investment", AccountCategory::ASSET)
                .set_cash_flow(CashFlowSection::Investing),
        );
        a.add(AccountKind::new("Payable", AccountCategory::LIABILITY));
        a.add(AccountKind::new("Accrued Liability", AccountCategory::LIABILITY));
        a.add(
            AccountKind::new("Loan", AccountCategory::LIABILITY)
                .set_cash_flow(CashFlowSection::Financing),
        );
        a.add(
            AccountKind::new("Equity", AccountCategory::EQUITY)
                .set_cash_flow(CashFlowSection::Financing),
        );
        a.add(
            AccountKind::new("Drawings", AccountCategory::EQUITY)
                .set_cash_flow(CashFlowSection::Financing),
        );
        a.add(AccountKind::new("Revenue", AccountCategory::REVENUE));
        a.add(AccountKind::new("Other Income", AccountCategory::REVENUE));
        a.add(AccountKind::new("Expense", AccountCategory::EXPENSE));
        a.add(AccountKind::new("Cost of Goods Sold", AccountCategory::EXPENSE));
        a.add(AccountKind::new("Tax", AccountCategory::EXPENSE));
        a
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize)]
pub struct AccountKindId(pub u32);

#[derive(Debug, Clone, Serialize)]
pub struct AccountKind {
    // The name, used for display purposes and stored in the database
    pub name: String,

    pub category: AccountCategory,

    // Whether the account holds cash or cash equivalents (petty cash, bank
    // accounts,...).  Those are the accounts whose movements the cash flow
    // statement explains.
    pub is_cash: bool,

    // When an account of this kind is the counterpart of a cash movement,
    // in which section of the cash flow statement the movement is shown.
    pub cash_flow: CashFlowSection,
}

impl AccountKind {
    pub fn new(name: &str, category: AccountCategory) -> Self {
        AccountKind {
            name: name.into(),
            category,
            is_cash: false,
            cash_flow: CashFlowSection::Operating,
        }
    }

    pub fn set_is_cash(mut self, is_cash: bool) -> Self {
        self.is_cash = is_cash;
        self
    }
    pub fn set_cash_flow(mut self, section: CashFlowSection) -> Self {
        self.cash_flow = section;
        self
    }

    pub fn is_expense(&self) -> bool {
        matches!(self.category, AccountCategory::EXPENSE)
    }
    pub fn is_revenue(&self) -> bool {
        matches!(self.category, AccountCategory::REVENUE)
    }
}

#[cfg(test)]
mod test {
    use crate::account_categories::AccountCategory;
    use crate::account_kinds::{AccountKindCollection, CashFlowSection};

    #[test]
    fn test_default_kinds() {
        let kinds = AccountKindCollection::default();
        let bank = kinds.find("bank").unwrap();
        assert!(kinds.get(bank).unwrap().is_cash);

        let loan = kinds.get(kinds.find(" LOAN ").unwrap()).unwrap();
        assert_eq!(loan.category, AccountCategory::LIABILITY);
        assert_eq!(loan.cash_flow, CashFlowSection::Financing);

        let fixed = kinds.get(kinds.find("Fixed Asset").unwrap()).unwrap();
        assert_eq!(fixed.cash_flow, CashFlowSection::Investing);
        assert!(!fixed.is_cash);

        assert!(kinds.find("Stock").is_none());
        assert_eq!(
            kinds.iter().filter(|(_, k)| k.is_cash).count(),
            2
        );
    }
}
