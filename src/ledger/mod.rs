//! Ledger Store - durable positions, orders, transactions and valuation
//! samples, with atomic multi-entity mutations.

mod ledger_errors;
mod ledger_model;
mod ledger_repository;
mod ledger_traits;


pub use ledger_errors::LedgerError;
pub use ledger_model::{
    AssetType, CashBalance, Order, OrderSide, OrderStatus, PortfolioValue, Position, Transaction,
    TransactionType,
};
pub use ledger_repository::LedgerRepository;
pub use ledger_traits::LedgerRepositoryTrait;
