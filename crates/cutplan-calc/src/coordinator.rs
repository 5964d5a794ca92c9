//! 計劃協調器
//!
//! 最佳化與提交的總入口。最佳化只讀型錄、產生計劃，不動庫存；
//! 提交把整份計劃一次性落到庫存帳上，全有或全無。
//!
//! 提交採快照 + 樂觀版本檢查：先取涉及物料的快照（按物料ID排序，
//! 順序固定），在快照上套用批次帳務與彙總重算，最後帶版本回寫。
//! 版本衝突重試，上限三次；任何失敗都不觸及儲存層，計劃維持
//! `Generated` 可再次提交。

use crate::ledger::{BatchLedger, ConsumptionPolicy};
use crate::planner::{CutGroup, CutPlanner};
use crate::{AggregationEngine, CommitReceipt, MaterialConsumption, PlanOutcome, PlanWarning};
use cutplan_core::plan::{PlanStatus, PlanSummary};
use cutplan_core::{
    Catalog, CuttingPlan, Material, MaterialCategory, PlanError, RequiredCut, Result,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::time::Instant;

/// 提交重試上限
const COMMIT_MAX_RETRIES: u32 = 3;

/// 單支餘料比例警告門檻（25%）
const SCRAP_WARNING_RATIO: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

/// 庫存儲存層協作介面
///
/// 提交流程透過此介面取得快照與回寫，不直接觸及儲存實作。
pub trait StockRepository {
    /// 取得物料快照與版本（呼叫端須以排序後的ID請求）
    fn snapshot_for_update(&self, material_ids: &[String]) -> Result<Vec<(Material, u64)>>;

    /// 帶版本回寫快照；版本不符回 `ConcurrentModification`
    fn write_back(&self, updates: Vec<(Material, u64)>) -> Result<()>;

    /// 標記物料彙總不一致（凍結後續消耗待人工修正）
    fn mark_inconsistent(&self, material_id: &str);
}

/// 計劃協調器
pub struct PlanCoordinator;

impl PlanCoordinator {
    /// 最佳化：由需求產生切割計劃
    ///
    /// 需求按（物料ID, 規格）分組，各組獨立規劃（可並行），
    /// 相同輸入恆得相同計劃。只讀型錄，不動庫存。
    pub fn optimize(
        order_id: &str,
        version: u32,
        demand: &[RequiredCut],
        catalog: &impl Catalog,
    ) -> Result<PlanOutcome> {
        let started = Instant::now();
        tracing::info!(order_id, version, cuts = demand.len(), "開始切割最佳化");

        // 步驟 1: 按（物料ID, 規格）分組，BTreeMap 保證組序固定
        let mut grouped: BTreeMap<(String, Option<String>), Vec<&RequiredCut>> = BTreeMap::new();
        for cut in demand {
            grouped
                .entry((cut.material_id.clone(), cut.gauge.clone()))
                .or_default()
                .push(cut);
        }
        tracing::info!(groups = grouped.len(), "步驟 1: 需求分組完成");

        // 步驟 2: 建立各組規劃輸入（型錄查驗在此失敗即中止）
        let mut groups: Vec<CutGroup> = Vec::with_capacity(grouped.len());
        for ((material_id, gauge), cuts) in &grouped {
            let material = catalog
                .material(material_id)
                .ok_or_else(|| PlanError::MaterialNotFound(material_id.clone()))?;

            let mut group = CutGroup {
                material_id: material_id.clone(),
                gauge: gauge.clone(),
                category: material.category,
                standard_lengths: material.standard_lengths.clone(),
                weight_per_meter: None,
                cuts: cuts
                    .iter()
                    .map(|c| (c.cut_length, c.quantity_needed))
                    .collect(),
            };

            // 型材帶規格時必須有參考重量；無規格的需求不計重量
            if material.category == MaterialCategory::Profile {
                if let Some(g) = gauge {
                    let wpm = material.weight_per_meter(g).ok_or_else(|| {
                        PlanError::GaugeWeightNotFound {
                            material_id: material_id.clone(),
                            gauge: g.clone(),
                        }
                    })?;
                    group.weight_per_meter = Some(wpm);
                }
            }
            groups.push(group);
        }
        tracing::info!("步驟 2: 型錄查驗完成");

        // 步驟 3: 各組並行規劃
        let material_plans = groups
            .par_iter()
            .map(CutPlanner::plan)
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(plans = material_plans.len(), "步驟 3: 切割規劃完成");

        // 步驟 4: 組裝計劃並轉為已產生
        let mut plan = CuttingPlan::new(order_id.to_string(), version);
        plan.summary = PlanSummary {
            total_weight: material_plans.iter().map(|p| p.total_weight).sum(),
            total_scrap_weight: material_plans.iter().map(|p| p.total_scrap_weight).sum(),
        };
        plan.material_plans = material_plans;
        plan.transition(PlanStatus::Generated)?;

        let mut outcome = PlanOutcome {
            plan,
            warnings: Vec::new(),
            calculation_time_ms: Some(started.elapsed().as_millis()),
        };
        Self::collect_scrap_warnings(&mut outcome);

        tracing::info!(
            order_id,
            elapsed_ms = ?outcome.calculation_time_ms,
            warnings = outcome.warnings.len(),
            "切割最佳化完成"
        );
        Ok(outcome)
    }

    /// 單支餘料比例超過門檻的樣式提出警告
    fn collect_scrap_warnings(outcome: &mut PlanOutcome) {
        let mut warnings = Vec::new();
        for mp in &outcome.plan.material_plans {
            for pipe in &mp.pipes_used {
                let standard_mm = pipe.standard_length.to_mm();
                if standard_mm <= Decimal::ZERO {
                    continue;
                }
                let ratio = pipe.scrap_generated.to_mm() / standard_mm;
                if ratio > SCRAP_WARNING_RATIO {
                    warnings.push(PlanWarning::warning(
                        mp.material_id.clone(),
                        format!(
                            "標準長度 {} 的樣式單支餘料 {}（比例 {:.0}%），建議檢視需求組合",
                            pipe.standard_length,
                            pipe.scrap_generated,
                            ratio * Decimal::from(100)
                        ),
                    ));
                }
            }
        }
        for w in warnings {
            outcome.add_warning(w);
        }
    }

    /// 提交：把計劃一次性落到庫存帳上
    ///
    /// 全有或全無：任一物料庫存不足即整筆失敗，儲存層不被改動，
    /// 計劃維持 `Generated` 可補貨後重試。
    pub fn commit(
        plan: &mut CuttingPlan,
        repo: &impl StockRepository,
        policy: ConsumptionPolicy,
    ) -> Result<CommitReceipt> {
        if plan.status != PlanStatus::Generated {
            return Err(PlanError::InvalidTransition {
                from: plan.status,
                to: PlanStatus::Committed,
            });
        }

        let material_ids = plan.material_ids();
        tracing::info!(
            order_id = %plan.order_id,
            version = plan.version,
            materials = material_ids.len(),
            "開始提交切割計劃"
        );

        let mut attempt = 0;
        let consumptions = loop {
            attempt += 1;
            match Self::try_apply(plan, &material_ids, repo, policy) {
                Ok(consumptions) => break consumptions,
                Err(PlanError::ConcurrentModification(id)) if attempt < COMMIT_MAX_RETRIES => {
                    tracing::warn!(material_id = %id, attempt, "提交版本衝突，重試");
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        plan.transition(PlanStatus::Committed)?;
        tracing::info!(
            order_id = %plan.order_id,
            attempts = attempt,
            "切割計劃提交完成"
        );
        Ok(CommitReceipt {
            order_id: plan.order_id.clone(),
            plan_version: plan.version,
            consumptions,
        })
    }

    /// 單次提交嘗試：快照 → 套用帳務 → 重算彙總 → 帶版本回寫
    fn try_apply(
        plan: &CuttingPlan,
        material_ids: &[String],
        repo: &impl StockRepository,
        policy: ConsumptionPolicy,
    ) -> Result<Vec<MaterialConsumption>> {
        let mut snapshots = repo.snapshot_for_update(material_ids)?;
        let mut consumptions: Vec<MaterialConsumption> = Vec::new();

        for mp in &plan.material_plans {
            let (material, _) = snapshots
                .iter_mut()
                .find(|(m, _)| m.id == mp.material_id)
                .ok_or_else(|| PlanError::MaterialNotFound(mp.material_id.clone()))?;

            let mut records = Vec::new();
            for pipe in &mp.pipes_used {
                let mut taken = match material.category {
                    MaterialCategory::Profile => BatchLedger::consume_profile(
                        material,
                        mp.gauge.as_deref(),
                        pipe.standard_length,
                        pipe.pipe_count,
                        policy,
                    )?,
                    _ => BatchLedger::consume_simple(
                        material,
                        Decimal::from(pipe.pipe_count),
                        policy,
                    )?,
                };
                records.append(&mut taken);
            }
            consumptions.push(MaterialConsumption {
                material_id: mp.material_id.clone(),
                records,
            });
        }

        // 消耗後整筆重算彙總；不一致即凍結物料並中止
        for (material, _) in snapshots.iter_mut() {
            match AggregationEngine::recompute(material) {
                Ok(totals) => material.aggregated_totals = Some(totals),
                Err(e @ PlanError::AggregationInconsistency { .. }) => {
                    repo.mark_inconsistent(&material.id);
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        repo.write_back(snapshots)?;
        Ok(consumptions)
    }
}
