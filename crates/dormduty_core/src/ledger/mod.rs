//! The bill-splitting ledger: allocation, balances, settlement and the
//! reducer-style snapshot that ties them together.

pub mod balance;
pub mod book;
pub mod settle;
pub mod split;

pub use balance::{balances, Balance};
pub use book::{ExpenseDraft, Ledger, LedgerAction, LedgerError, PaymentDraft};
pub use settle::{simplify, Settlement};
pub use split::{
    allocate, Allocation, LineItem, PercentageShare, Share, ShareCount, SplitError, SplitStrategy,
};
