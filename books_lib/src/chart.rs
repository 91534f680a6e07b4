/// The chart of accounts a new user starts with, unless they prefer to build
/// their own.  Each row is (code, name, kind, parent code).
pub const STANDARD_CHART: &[(&str, &str, &str, Option<&str>)] = &[
    ("1000", "Cash on Hand", "Cash", None),
    ("1010", "Checking Account", "Bank", None),
    ("1100", "Accounts Receivable", "Receivable", None),
    ("1200", "Inventory", "Inventory", None),
    ("1300", "Prepaid Expenses", "Prepaid Expense", None),
    ("1500", "Equipment", "Fixed Asset", None),
    ("2000", "Accounts Payable", "Payable", None),
    ("2100", "Accrued Liabilities", "Accrued Liability", None),
    ("2500", "Loans Payable", "Loan", None),
    ("3000", "Owner's Capital", "Equity", None),
    ("3100", "Owner's Drawings", "Drawings", None),
    ("4000", "Sales Revenue", "Revenue", None),
    ("4100", "Service Revenue", "Revenue", None),
    ("4900", "Interest Income", "Other Income", None),
    ("5000", "Cost of Goods Sold", "Cost of Goods Sold", None),
    ("6000", "Operating Expenses", "Expense", None),
    ("6010", "Rent Expense", "Expense", Some("6000")),
    ("6020", "Salaries Expense", "Expense", Some("6000")),
    ("6030", "Utilities Expense", "Expense", Some("6000")),
    ("6040", "Supplies Expense", "Expense", Some("6000")),
    ("6900", "Income Taxes", "Tax", None),
];
