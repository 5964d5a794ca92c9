//! # Cutplan Store
//!
//! 庫存儲存層與人工覆核佇列

pub mod review;
pub mod store;

// Re-export 主要類型
pub use review::ReviewQueue;
pub use store::{BatchFilter, BatchStockLine, MaterialStockReport, MaterialStore, StockReport};
