//! # Repository Module
//!
//! Database repository implementations for Tendero.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Scopes                              │
//! │                                                                         │
//! │  SaleEngine                                                            │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       │  ProductRepository::decrement_stock(&mut tx, …)                 │
//! │       │  SaleRepository::count_in_range(&mut tx, …)                     │
//! │       │  SaleRepository::insert(&mut tx, …)                             │
//! │       │  tx.commit().await?;                                            │
//! │       ▼                                                                 │
//! │  ProductRepository     catalog: get, conditional decrement, restore    │
//! │  SaleRepository        ledger: count, insert, get, cancel, list        │
//! │  StoreRepository       tenant profiles                                 │
//! │  ReceiptOutboxRepository  receipts for the delivery worker             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pool-level methods take `&self` and run one autocommit statement.
//! Associated functions taking `&mut SqliteConnection` run inside whatever
//! scope the caller opened.

pub mod outbox;
pub mod product;
pub mod sale;
pub mod store;
