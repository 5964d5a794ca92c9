//! 規劃服務門面
//!
//! 訂單層的對外入口：最佳化、查詢、提交、採購摘要與庫存作業。
//! 每張訂單只保留最新一份計劃，重新最佳化整份替換並遞增版本；
//! 提交須帶呼叫端所見的版本，避免拿舊計劃動新庫存。

use cutplan_calc::ledger::{BatchConsumption, ConsumptionPolicy};
use cutplan_calc::{CommitReceipt, PlanCoordinator, PlanOutcome};
use cutplan_core::plan::PlanStatus;
use cutplan_core::{
    Catalog, CuttingPlan, Length, PlanError, RequiredCut, Result, StockBatch,
};
use cutplan_store::{MaterialStockReport, MaterialStore, StockReport};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 規劃服務
pub struct PlanningService {
    store: Arc<MaterialStore>,
    plans: Mutex<HashMap<String, CuttingPlan>>,
    policy: ConsumptionPolicy,
}

impl PlanningService {
    /// 以既有庫存儲存建立服務（預設先進先出）
    pub fn new(store: Arc<MaterialStore>) -> Self {
        Self {
            store,
            plans: Mutex::new(HashMap::new()),
            policy: ConsumptionPolicy::default(),
        }
    }

    /// 建構器模式：設置批次消耗策略
    pub fn with_policy(mut self, policy: ConsumptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 底層庫存儲存
    pub fn store(&self) -> &MaterialStore {
        &self.store
    }

    fn plans(&self) -> MutexGuard<'_, HashMap<String, CuttingPlan>> {
        self.plans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 為訂單產生切割計劃
    ///
    /// 整份替換訂單的現有計劃（不論其狀態）並遞增版本；
    /// 最佳化失敗時留下一份失敗記錄，回傳原始錯誤。
    pub fn optimize_cuts(&self, order_id: &str, demand: &[RequiredCut]) -> Result<PlanOutcome> {
        let version = self
            .plans()
            .get(order_id)
            .map(|p| p.version + 1)
            .unwrap_or(1);

        match PlanCoordinator::optimize(order_id, version, demand, self.store.as_ref()) {
            Ok(outcome) => {
                self.plans()
                    .insert(order_id.to_string(), outcome.plan.clone());
                Ok(outcome)
            }
            Err(e) => {
                let mut failed = CuttingPlan::new(order_id.to_string(), version);
                failed.transition(PlanStatus::Failed)?;
                self.plans().insert(order_id.to_string(), failed);
                Err(e)
            }
        }
    }

    /// 查詢訂單目前的計劃
    pub fn cutting_plan(&self, order_id: &str) -> Option<CuttingPlan> {
        self.plans().get(order_id).cloned()
    }

    /// 提交訂單的計劃，消耗庫存批次
    ///
    /// `expected_version` 為呼叫端所見的計劃版本；期間若計劃已被
    /// 重新最佳化則回 `VersionMismatch`，不動任何庫存。
    ///
    /// 提交全程持有計劃鎖，並發提交被序列化：後到者看到的已是
    /// `Committed`，被狀態機拒絕，同一份計劃不會重複消耗。
    pub fn commit_cuts(&self, order_id: &str, expected_version: u32) -> Result<CommitReceipt> {
        let mut plans = self.plans();
        let plan = plans
            .get_mut(order_id)
            .ok_or_else(|| PlanError::PlanNotFound(order_id.to_string()))?;

        if plan.version != expected_version {
            return Err(PlanError::VersionMismatch {
                expected: expected_version,
                actual: plan.version,
            });
        }

        // 就地提交：成功 → Committed；失敗不動狀態，維持 Generated 可重試
        PlanCoordinator::commit(plan, self.store.as_ref(), self.policy)
    }

    /// 訂單的採購摘要（每個物料/規格按標準長度彙總支數）
    pub fn pipe_order_summary(&self, order_id: &str) -> Result<Vec<PipeOrderSummary>> {
        let plan = self
            .plans()
            .get(order_id)
            .cloned()
            .ok_or_else(|| PlanError::PlanNotFound(order_id.to_string()))?;

        let mut summaries = Vec::with_capacity(plan.material_plans.len());
        for mp in &plan.material_plans {
            // 物料名稱為查詢時快照，物料主檔已刪時退回ID
            let name = self
                .store
                .material(&mp.material_id)
                .map(|m| m.name)
                .unwrap_or_else(|| mp.material_id.clone());

            // 同一標準長度可能有多種切割樣式，摘要按長度合併支數
            let mut lines: Vec<PipeOrderLine> = Vec::new();
            for p in &mp.pipes_used {
                let length = p.standard_length.value;
                let unit = p.standard_length.unit.abbrev();
                match lines
                    .iter_mut()
                    .find(|l| l.length == length && l.unit == unit)
                {
                    Some(line) => {
                        line.quantity += p.pipe_count;
                        line.total_scrap_mm += p.total_scrap_mm();
                    }
                    None => lines.push(PipeOrderLine {
                        length,
                        unit: unit.to_string(),
                        quantity: p.pipe_count,
                        total_scrap_mm: p.total_scrap_mm(),
                    }),
                }
            }

            summaries.push(PipeOrderSummary {
                material_id: mp.material_id.clone(),
                material_name: name,
                gauge: mp.gauge.clone(),
                lines,
                total_weight: mp.total_weight,
            });
        }
        Ok(summaries)
    }

    /// 進貨：批次掛帳並即時重算彙總
    pub fn receive_batch(&self, material_id: &str, batch: StockBatch) -> Result<()> {
        self.store.receive_batch(material_id, batch)
    }

    /// 計劃外的直接消耗（單物料原子操作）
    pub fn consume_profile_stock(
        &self,
        material_id: &str,
        gauge: Option<&str>,
        standard_length: Length,
        pieces: u32,
    ) -> Result<Vec<BatchConsumption>> {
        self.store
            .consume_profile(material_id, gauge, standard_length, pieces, self.policy)
    }

    /// 計劃外的直接消耗（一般物料）
    pub fn consume_simple_stock(
        &self,
        material_id: &str,
        quantity: Decimal,
    ) -> Result<Vec<BatchConsumption>> {
        self.store.consume_simple(material_id, quantity, self.policy)
    }

    /// 全庫存報表
    pub fn stock_report(&self) -> StockReport {
        self.store.stock_report()
    }

    /// 單一物料的庫存報表
    pub fn material_report(&self, material_id: &str) -> Result<MaterialStockReport> {
        self.store.material_report(material_id)
    }
}

/// 採購摘要（單一物料/規格）
#[derive(Debug, Clone, Serialize)]
pub struct PipeOrderSummary {
    pub material_id: String,

    /// 物料名稱（查詢時快照）
    pub material_name: String,

    pub gauge: Option<String>,

    /// 按標準長度彙總的支數
    pub lines: Vec<PipeOrderLine>,

    /// 此物料的計劃總重（kg）
    pub total_weight: Decimal,
}

/// 採購摘要行
#[derive(Debug, Clone, Serialize)]
pub struct PipeOrderLine {
    /// 標準長度值（以 `unit` 計）
    pub length: Decimal,

    /// 長度單位縮寫
    pub unit: String,

    /// 需採購/領用支數
    pub quantity: u32,

    /// 此長度的餘料總長（毫米）
    pub total_scrap_mm: Decimal,
}
