//! 物料庫存儲存
//!
//! 單行程記憶體儲存，物料為一致性邊界：單物料的批次異動與
//! 彙總重算在同一把鎖內完成，對外永遠只見「批次已動且彙總已更新」
//! 的完整狀態。跨物料的提交流程走 `StockRepository` 介面，以
//! 物料版本做樂觀並行控制。

use chrono::NaiveDate;
use cutplan_calc::ledger::{BatchConsumption, BatchLedger, ConsumptionPolicy};
use cutplan_calc::{AggregationEngine, StockRepository};
use cutplan_core::{
    AggregatedTotals, Catalog, Length, Material, MaterialCategory, MaterialDocument, PlanError,
    Result, StockBatch,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::review::ReviewQueue;

/// 帶版本的物料
struct VersionedMaterial {
    material: Material,
    version: u64,
}

struct StoreInner {
    materials: HashMap<String, VersionedMaterial>,
    review: ReviewQueue,
}

/// 物料庫存儲存
pub struct MaterialStore {
    inner: Mutex<StoreInner>,
}

impl MaterialStore {
    /// 創建空的儲存
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                materials: HashMap::new(),
                review: ReviewQueue::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 載入持久化文件（舊批次形狀在此一次性遷移）
    pub fn load_document(&self, document: MaterialDocument) -> Result<()> {
        let mut material = document.resolve()?;
        material.aggregated_totals = Some(AggregationEngine::recompute(&material)?);
        self.lock().materials.insert(
            material.id.clone(),
            VersionedMaterial {
                material,
                version: 1,
            },
        );
        Ok(())
    }

    /// 直接放入物料（批次先驗證、彙總先重算）
    pub fn insert_material(&self, mut material: Material) -> Result<()> {
        material.aggregated_totals = Some(AggregationEngine::recompute(&material)?);
        self.lock().materials.insert(
            material.id.clone(),
            VersionedMaterial {
                material,
                version: 1,
            },
        );
        Ok(())
    }

    /// 所有物料ID（排序）
    pub fn material_ids(&self) -> Vec<String> {
        let guard = self.lock();
        let mut ids: Vec<String> = guard.materials.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 物料目前的版本
    pub fn version(&self, material_id: &str) -> Option<u64> {
        self.lock().materials.get(material_id).map(|v| v.version)
    }

    /// 進貨：驗證批次後掛到物料上，彙總同鎖內重算
    ///
    /// 批次形狀必須與物料類別相符；重算失敗（如網材混用捲數制
    /// 與面積制）時整筆進貨被拒，物料維持原狀。
    pub fn receive_batch(&self, material_id: &str, batch: StockBatch) -> Result<()> {
        batch.check_invariants()?;

        let mut guard = self.lock();
        let entry = guard
            .materials
            .get_mut(material_id)
            .ok_or_else(|| PlanError::MaterialNotFound(material_id.to_string()))?;

        let shape_ok = match (&entry.material.category, &batch) {
            (MaterialCategory::Profile, StockBatch::Profile(_)) => true,
            (MaterialCategory::WireMesh, StockBatch::Simple(_)) => true,
            (MaterialCategory::Simple, StockBatch::Simple(_)) => true,
            _ => false,
        };
        if !shape_ok {
            return Err(PlanError::InvalidBatch(format!(
                "批次 {} 形狀與物料 {} 類別 {:?} 不符",
                batch.batch_id(),
                material_id,
                entry.material.category
            )));
        }

        // 在副本上套用與重算，成功才換入
        let mut updated = entry.material.clone();
        updated.batches.push(batch);
        updated.aggregated_totals = Some(AggregationEngine::recompute(&updated)?);

        entry.material = updated;
        entry.version += 1;
        Ok(())
    }

    /// 消耗型材庫存（單物料原子操作）
    pub fn consume_profile(
        &self,
        material_id: &str,
        gauge: Option<&str>,
        standard_length: Length,
        pieces: u32,
        policy: ConsumptionPolicy,
    ) -> Result<Vec<BatchConsumption>> {
        self.consume_with(material_id, |material| {
            BatchLedger::consume_profile(material, gauge, standard_length, pieces, policy)
        })
    }

    /// 消耗一般庫存（單物料原子操作）
    pub fn consume_simple(
        &self,
        material_id: &str,
        quantity: Decimal,
        policy: ConsumptionPolicy,
    ) -> Result<Vec<BatchConsumption>> {
        self.consume_with(material_id, |material| {
            BatchLedger::consume_simple(material, quantity, policy)
        })
    }

    fn consume_with(
        &self,
        material_id: &str,
        apply: impl FnOnce(&mut Material) -> Result<Vec<BatchConsumption>>,
    ) -> Result<Vec<BatchConsumption>> {
        let mut guard = self.lock();
        if guard.review.is_flagged(material_id) {
            return Err(PlanError::MaterialBlocked(material_id.to_string()));
        }
        let entry = guard
            .materials
            .get_mut(material_id)
            .ok_or_else(|| PlanError::MaterialNotFound(material_id.to_string()))?;

        let mut updated = entry.material.clone();
        let records = apply(&mut updated)?;
        match AggregationEngine::recompute(&updated) {
            Ok(totals) => updated.aggregated_totals = Some(totals),
            Err(e @ PlanError::AggregationInconsistency { .. }) => {
                guard.review.flag(material_id.to_string());
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        entry.material = updated;
        entry.version += 1;
        Ok(records)
    }

    /// 可供消耗的批次快照（按過濾條件與消耗順序排列）
    pub fn available_batches(
        &self,
        material_id: &str,
        filter: &BatchFilter,
    ) -> Result<Vec<StockBatch>> {
        let guard = self.lock();
        let entry = guard
            .materials
            .get(material_id)
            .ok_or_else(|| PlanError::MaterialNotFound(material_id.to_string()))?;

        let mut batches: Vec<StockBatch> = entry
            .material
            .eligible_batches(filter.min_quantity)
            .into_iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        batches.sort_by(|a, b| {
            let date_order = match filter.sort_order {
                ConsumptionPolicy::Fifo => a.purchase_date().cmp(&b.purchase_date()),
                ConsumptionPolicy::Lifo => b.purchase_date().cmp(&a.purchase_date()),
            };
            date_order.then_with(|| a.batch_id().cmp(&b.batch_id()))
        });
        Ok(batches)
    }

    /// 單一物料的庫存報表
    pub fn material_report(&self, material_id: &str) -> Result<MaterialStockReport> {
        let guard = self.lock();
        let entry = guard
            .materials
            .get(material_id)
            .ok_or_else(|| PlanError::MaterialNotFound(material_id.to_string()))?;
        Ok(Self::report_for(&guard, entry))
    }

    /// 全庫存報表（物料排序、含低庫存旗標）
    pub fn stock_report(&self) -> StockReport {
        let guard = self.lock();
        let mut ids: Vec<&String> = guard.materials.keys().collect();
        ids.sort();

        let materials = ids
            .into_iter()
            .map(|id| Self::report_for(&guard, &guard.materials[id]))
            .collect();
        StockReport { materials }
    }

    fn report_for(inner: &StoreInner, entry: &VersionedMaterial) -> MaterialStockReport {
        let mut lines: Vec<BatchStockLine> = entry
            .material
            .batches
            .iter()
            .filter(|b| b.current_quantity() > Decimal::ZERO)
            .map(BatchStockLine::from_batch)
            .collect();
        lines.sort_by(|a, b| {
            a.purchase_date
                .cmp(&b.purchase_date)
                .then_with(|| a.batch_id.cmp(&b.batch_id))
        });

        MaterialStockReport {
            material_id: entry.material.id.clone(),
            name: entry.material.name.clone(),
            flagged_for_review: inner.review.is_flagged(&entry.material.id),
            totals: entry
                .material
                .aggregated_totals
                .clone()
                .unwrap_or_else(AggregatedTotals::zero),
            batches: lines,
        }
    }

    /// 人工修正後解除物料凍結
    pub fn clear_inconsistency(&self, material_id: &str) {
        self.lock().review.clear(material_id);
    }

    /// 目前凍結待覆核的物料
    pub fn flagged_materials(&self) -> Vec<String> {
        self.lock().review.flagged()
    }
}

impl Default for MaterialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MaterialStore {
    fn material(&self, material_id: &str) -> Option<Material> {
        self.lock()
            .materials
            .get(material_id)
            .map(|v| v.material.clone())
    }
}

impl StockRepository for MaterialStore {
    fn snapshot_for_update(&self, material_ids: &[String]) -> Result<Vec<(Material, u64)>> {
        let guard = self.lock();
        let mut snapshots = Vec::with_capacity(material_ids.len());
        for id in material_ids {
            if guard.review.is_flagged(id) {
                return Err(PlanError::MaterialBlocked(id.clone()));
            }
            let entry = guard
                .materials
                .get(id)
                .ok_or_else(|| PlanError::MaterialNotFound(id.clone()))?;
            snapshots.push((entry.material.clone(), entry.version));
        }
        Ok(snapshots)
    }

    fn write_back(&self, updates: Vec<(Material, u64)>) -> Result<()> {
        let mut guard = self.lock();

        // 先整批驗證版本，再整批換入：不留半套用狀態
        for (material, snapshot_version) in &updates {
            let entry = guard
                .materials
                .get(&material.id)
                .ok_or_else(|| PlanError::MaterialNotFound(material.id.clone()))?;
            if entry.version != *snapshot_version {
                return Err(PlanError::ConcurrentModification(material.id.clone()));
            }
        }
        for (material, snapshot_version) in updates {
            guard.materials.insert(
                material.id.clone(),
                VersionedMaterial {
                    material,
                    version: snapshot_version + 1,
                },
            );
        }
        Ok(())
    }

    fn mark_inconsistent(&self, material_id: &str) {
        self.lock().review.flag(material_id.to_string());
    }
}

/// 批次查詢過濾條件
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// 限定規格（僅型材批次）
    pub gauge: Option<String>,

    /// 限定標準長度（僅型材批次）
    pub length: Option<Length>,

    /// 排列順序（先進先出或後進先出）
    pub sort_order: ConsumptionPolicy,

    /// 最小現存量過濾
    pub min_quantity: Decimal,
}

impl BatchFilter {
    fn matches(&self, batch: &StockBatch) -> bool {
        match batch {
            StockBatch::Profile(p) => {
                self.gauge.as_deref().map_or(true, |g| p.gauge == g)
                    && self.length.map_or(true, |l| p.length == l)
            }
            // 一般批次不帶規格與長度，只受數量過濾
            StockBatch::Simple(_) => self.gauge.is_none() && self.length.is_none(),
        }
    }
}

/// 全庫存報表
#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub materials: Vec<MaterialStockReport>,
}

/// 單一物料的庫存報表
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStockReport {
    pub material_id: String,
    pub name: String,
    pub flagged_for_review: bool,
    pub totals: AggregatedTotals,
    pub batches: Vec<BatchStockLine>,
}

/// 報表中的單一批次行
#[derive(Debug, Clone, Serialize)]
pub struct BatchStockLine {
    pub batch_id: Uuid,
    pub purchase_date: NaiveDate,
    pub current_quantity: Decimal,
    pub supplier: Option<String>,

    /// 型材批次低於警示門檻時為真
    pub below_threshold: bool,
}

impl BatchStockLine {
    fn from_batch(batch: &StockBatch) -> Self {
        let below_threshold = match batch {
            StockBatch::Profile(p) => p.is_below_threshold(),
            StockBatch::Simple(_) => false,
        };
        Self {
            batch_id: batch.batch_id(),
            purchase_date: batch.purchase_date(),
            current_quantity: batch.current_quantity(),
            supplier: batch.supplier().map(|s| s.to_string()),
            below_threshold,
        }
    }
}
