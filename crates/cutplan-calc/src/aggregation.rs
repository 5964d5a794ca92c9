//! 物料彙總重算
//!
//! 彙總快取（現存量/重量/金額/平均費率）永遠由批次狀態推導，
//! 任何批次異動後整筆重算覆寫，不做增量修補。重算為純函數且
//! 冪等：對相同批次狀態重複執行，數值結果恆相同。

use chrono::Utc;
use cutplan_core::unit::{round_money, round_qty, round_rate, round_weight};
use cutplan_core::{AggregatedTotals, Material, MaterialCategory, PlanError, Result, StockBatch};
use rust_decimal::Decimal;

/// 彙總重算引擎
pub struct AggregationEngine;

impl AggregationEngine {
    /// 由批次狀態重算物料彙總
    ///
    /// 批次形狀與物料類別不符、或網材混用捲數制與面積制時，
    /// 回 `AggregationInconsistency`（物料應凍結消耗待人工修正）。
    pub fn recompute(material: &Material) -> Result<AggregatedTotals> {
        for batch in &material.batches {
            batch.check_invariants()?;
        }

        let totals = match material.category {
            MaterialCategory::Profile => Self::recompute_profile(material)?,
            MaterialCategory::WireMesh => Self::recompute_wire_mesh(material)?,
            MaterialCategory::Simple => Self::recompute_simple(material)?,
        };

        tracing::debug!(
            material_id = %material.id,
            stock = %totals.total_current_stock,
            value = %totals.total_current_value,
            "重算物料彙總"
        );
        Ok(totals)
    }

    /// 型材：支數、比例剩餘重量、金額，平均費率以加權推導
    fn recompute_profile(material: &Material) -> Result<AggregatedTotals> {
        let mut stock = Decimal::ZERO;
        let mut weight = Decimal::ZERO;
        let mut value = Decimal::ZERO;
        let mut weight_cost = Decimal::ZERO;

        for batch in Self::active_batches(material, true)? {
            let StockBatch::Profile(p) = batch else {
                continue;
            };
            let current = Decimal::from(p.current_quantity);
            let remaining_weight = p.remaining_weight();
            stock += current;
            weight += remaining_weight;
            value += current * p.rate_per_piece;
            weight_cost += remaining_weight * p.rate_per_kg;
        }

        let average_rate_per_piece = if stock > Decimal::ZERO {
            value / stock
        } else {
            Decimal::ZERO
        };
        let average_rate_per_kg = if weight > Decimal::ZERO {
            weight_cost / weight
        } else {
            Decimal::ZERO
        };

        Ok(Self::rounded(
            stock,
            weight,
            value,
            average_rate_per_piece,
            average_rate_per_kg,
        ))
    }

    /// 網材：捲數制或面積制，整個物料必須同制
    ///
    /// 面積制物料的存量與平均費率皆以剩餘面積計；
    /// 捲數制則以捲數計。兩制不得混存於同一物料。
    fn recompute_wire_mesh(material: &Material) -> Result<AggregatedTotals> {
        let batches = Self::active_batches(material, false)?;

        let area_tracked = batches.iter().filter_map(|b| match b {
            StockBatch::Simple(s) => Some(s.is_area_tracked()),
            StockBatch::Profile(_) => None,
        });
        let tracked: Vec<bool> = area_tracked.collect();
        if tracked.iter().any(|t| *t) && tracked.iter().any(|t| !*t) {
            return Err(PlanError::AggregationInconsistency {
                material_id: material.id.clone(),
                detail: "捲數制與面積制批次混存，無法彙總".to_string(),
            });
        }
        let area_mode = tracked.iter().any(|t| *t);

        let mut stock = Decimal::ZERO;
        let mut value = Decimal::ZERO;
        for batch in batches {
            let StockBatch::Simple(s) = batch else {
                continue;
            };
            if area_mode {
                let area = s.remaining_area();
                stock += area;
                value += area * s.rate_per_area.unwrap_or(Decimal::ZERO);
            } else {
                stock += s.current_quantity;
                value += s.current_quantity * s.rate_per_unit;
            }
        }

        let average = if stock > Decimal::ZERO {
            value / stock
        } else {
            Decimal::ZERO
        };
        Ok(Self::rounded(
            stock,
            Decimal::ZERO,
            value,
            average,
            Decimal::ZERO,
        ))
    }

    /// 一般物料：數量 × 單位費率
    fn recompute_simple(material: &Material) -> Result<AggregatedTotals> {
        let mut stock = Decimal::ZERO;
        let mut value = Decimal::ZERO;
        for batch in Self::active_batches(material, false)? {
            let StockBatch::Simple(s) = batch else {
                continue;
            };
            stock += s.current_quantity;
            value += s.current_quantity * s.rate_per_unit;
        }

        let average = if stock > Decimal::ZERO {
            value / stock
        } else {
            Decimal::ZERO
        };
        Ok(Self::rounded(
            stock,
            Decimal::ZERO,
            value,
            average,
            Decimal::ZERO,
        ))
    }

    /// 啟用中的批次，並驗證形狀與物料類別一致
    fn active_batches(material: &Material, expect_profile: bool) -> Result<Vec<&StockBatch>> {
        let mut active = Vec::new();
        for batch in &material.batches {
            let (is_active, is_profile) = match batch {
                StockBatch::Profile(p) => (p.is_active, true),
                StockBatch::Simple(s) => (s.is_active, false),
            };
            if is_profile != expect_profile {
                return Err(PlanError::AggregationInconsistency {
                    material_id: material.id.clone(),
                    detail: format!(
                        "批次 {} 形狀與物料類別 {:?} 不符",
                        batch.batch_id(),
                        material.category
                    ),
                });
            }
            if is_active {
                active.push(batch);
            }
        }
        Ok(active)
    }

    /// 輸出邊界捨入
    fn rounded(
        stock: Decimal,
        weight: Decimal,
        value: Decimal,
        rate_per_piece: Decimal,
        rate_per_kg: Decimal,
    ) -> AggregatedTotals {
        AggregatedTotals {
            total_current_stock: round_qty(stock),
            total_current_weight: round_weight(weight),
            total_current_value: round_money(value),
            average_rate_per_piece: round_rate(rate_per_piece),
            average_rate_per_kg: round_rate(rate_per_kg),
            last_updated: Utc::now(),
        }
    }
}
