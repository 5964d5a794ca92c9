//! # Cutplan Calculation Engine
//!
//! 切割最佳化、批次帳務與彙總重算引擎

pub mod aggregation;
pub mod coordinator;
pub mod ledger;
pub mod planner;

// Re-export 主要類型
pub use aggregation::AggregationEngine;
pub use coordinator::{PlanCoordinator, StockRepository};
pub use ledger::{BatchConsumption, BatchLedger, ConsumptionPolicy};
pub use planner::{CutGroup, CutPlanner};

/// 最佳化結果
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// 產生的切割計劃
    pub plan: cutplan_core::CuttingPlan,

    /// 警告信息
    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl PlanOutcome {
    /// 添加警告
    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }
}

/// 計劃警告
#[derive(Debug, Clone)]
pub struct PlanWarning {
    pub material_id: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(material_id: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            material_id,
            message,
            severity,
        }
    }

    pub fn info(material_id: String, message: String) -> Self {
        Self::new(material_id, message, WarningSeverity::Info)
    }

    pub fn warning(material_id: String, message: String) -> Self {
        Self::new(material_id, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

/// 單一物料的消耗審計
#[derive(Debug, Clone)]
pub struct MaterialConsumption {
    pub material_id: String,
    pub records: Vec<BatchConsumption>,
}

/// 提交回執（完整審計軌跡）
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub order_id: String,
    pub plan_version: u32,
    pub consumptions: Vec<MaterialConsumption>,
}

impl CommitReceipt {
    /// 提交消耗的總金額
    pub fn total_cost(&self) -> rust_decimal::Decimal {
        self.consumptions
            .iter()
            .flat_map(|m| &m.records)
            .map(|r| r.quantity_consumed * r.rate_applied)
            .sum()
    }
}
