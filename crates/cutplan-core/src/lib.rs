//! # Cutplan Core
//!
//! 核心資料模型與類型定義

pub mod batch;
pub mod demand;
pub mod material;
pub mod plan;
pub mod totals;
pub mod unit;

// Re-export 主要類型
pub use batch::{BatchRecord, LegacyBatch, ProfileBatch, SimpleBatch, StockBatch};
pub use demand::RequiredCut;
pub use material::{Catalog, GaugeWeight, Material, MaterialCategory, MaterialDocument};
pub use plan::{CutBreakdown, CuttingPlan, MaterialPlan, PipeUsed, PlanStatus, PlanSummary};
pub use totals::AggregatedTotals;
pub use unit::{Length, LengthUnit};

use rust_decimal::Decimal;

/// 切割計劃錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("找不到物料: {0}")]
    MaterialNotFound(String),

    #[error("物料未定義標準長度: {0}")]
    NoStandardLengths(String),

    #[error("找不到規格參考重量: 物料 {material_id}, 規格 {gauge}")]
    GaugeWeightNotFound { material_id: String, gauge: String },

    #[error("切割長度超過所有標準長度: 物料 {material_id}, 需求 {cut_length_mm} mm, 最大標準 {max_standard_mm} mm")]
    CutTooLong {
        material_id: String,
        gauge: Option<String>,
        cut_length_mm: Decimal,
        max_standard_mm: Decimal,
    },

    #[error("庫存不足: 物料 {material_id}, 需求 {needed}, 可用 {available}")]
    InsufficientStock {
        material_id: String,
        gauge: Option<String>,
        length_mm: Option<Decimal>,
        needed: Decimal,
        available: Decimal,
    },

    #[error("並行修改衝突: 物料 {0}")]
    ConcurrentModification(String),

    #[error("彙總不一致: 物料 {material_id}: {detail}")]
    AggregationInconsistency { material_id: String, detail: String },

    #[error("物料已凍結消耗（彙總不一致待人工修正）: {0}")]
    MaterialBlocked(String),

    #[error("無效的批次資料: {0}")]
    InvalidBatch(String),

    #[error("無效的狀態轉換: {from:?} → {to:?}")]
    InvalidTransition {
        from: plan::PlanStatus,
        to: plan::PlanStatus,
    },

    #[error("找不到切割計劃: 訂單 {0}")]
    PlanNotFound(String),

    #[error("計劃版本不符: 預期 {expected}, 實際 {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
