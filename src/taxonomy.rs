//! Fixed transaction type / category taxonomy
//!
//! A posted transaction must carry a category that belongs to its type.
//! The lists are a business constant, not configuration.

use crate::types::TransactionType;

/// Categories valid for `TransactionType::Income`
pub const INCOME_CATEGORIES: [&str; 4] = ["Rent", "Security Deposit", "Late Fee", "Lease Fee"];

/// Categories valid for `TransactionType::Expense`
pub const EXPENSE_CATEGORIES: [&str; 9] = [
    "Maintenance",
    "Repair",
    "Utilities",
    "Insurance",
    "Property Tax",
    "Management Fee",
    "Legal Fee",
    "Transport",
    "Other",
];

/// The categories belonging to a transaction type
pub fn categories_for(txn_type: TransactionType) -> &'static [&'static str] {
    match txn_type {
        TransactionType::Income => &INCOME_CATEGORIES,
        TransactionType::Expense => &EXPENSE_CATEGORIES,
    }
}

/// Whether `category` belongs to the taxonomy of `txn_type`.
/// Category names are matched exactly (case-sensitive).
pub fn is_valid_category(txn_type: TransactionType, category: &str) -> bool {
    categories_for(txn_type).contains(&category)
}
