//! # Cutplan
//!
//! 切割用料規劃系統：切割最佳化、批次帳務與庫存彙總。
//!
//! 子 crate 分工：
//! - `cutplan-core` — 資料模型（物料、批次、需求、計劃）
//! - `cutplan-calc` — 切割規劃、批次帳務、彙總重算、提交協調
//! - `cutplan-store` — 庫存儲存層與覆核佇列
//!
//! 本 crate 提供 [`PlanningService`] 作為對外入口。

pub mod service;

// Re-export 主要類型
pub use cutplan_calc::ledger::{BatchConsumption, ConsumptionPolicy};
pub use cutplan_calc::{CommitReceipt, PlanOutcome, PlanWarning};
pub use cutplan_core::{
    Catalog, CuttingPlan, Length, LengthUnit, Material, MaterialCategory, MaterialDocument,
    PlanError, PlanStatus, RequiredCut, Result, StockBatch,
};
pub use cutplan_store::{BatchFilter, MaterialStore, StockReport};
pub use service::{PipeOrderLine, PipeOrderSummary, PlanningService};
