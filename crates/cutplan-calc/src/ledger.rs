//! 批次帳務
//!
//! 把一筆消耗需求按先進先出（或後進先出）攤到物料的可用批次上，
//! 每動到一個批次就留一筆審計記錄（批次、量、成交費率、供應商）。
//!
//! 單筆消耗為全有或全無：先加總可用量預檢，不足即回
//! `InsufficientStock`，任何批次都不被改動。

use chrono::NaiveDate;
use cutplan_core::{Length, Material, PlanError, Result, StockBatch};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 批次消耗順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsumptionPolicy {
    /// 先進先出（按進貨日期遞增）
    #[default]
    Fifo,
    /// 後進先出（按進貨日期遞減）
    Lifo,
}

/// 單一批次的消耗審計記錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConsumption {
    /// 批次ID
    pub batch_id: Uuid,

    /// 消耗數量
    pub quantity_consumed: Decimal,

    /// 成交費率（型材取單支費率；面積型取每面積費率）
    pub rate_applied: Decimal,

    /// 供應商
    pub supplier: Option<String>,

    /// 批次進貨日期
    pub purchase_date: NaiveDate,
}

impl BatchConsumption {
    /// 此記錄的金額
    pub fn cost(&self) -> Decimal {
        self.quantity_consumed * self.rate_applied
    }
}

/// 批次帳務引擎
pub struct BatchLedger;

impl BatchLedger {
    /// 消耗型材批次（按支）
    ///
    /// 只動符合標準長度與規格的可用批次；同日期批次按批次ID
    /// 字典序取捨，輸出順序穩定。
    pub fn consume_profile(
        material: &mut Material,
        gauge: Option<&str>,
        standard_length: Length,
        pieces_needed: u32,
        policy: ConsumptionPolicy,
    ) -> Result<Vec<BatchConsumption>> {
        if pieces_needed == 0 {
            return Ok(Vec::new());
        }
        let length_mm = standard_length.to_mm();

        // 收集符合條件的批次索引
        let mut candidates: Vec<usize> = material
            .batches
            .iter()
            .enumerate()
            .filter_map(|(i, b)| match b {
                StockBatch::Profile(p)
                    if b.is_eligible(Decimal::ZERO)
                        && p.length.to_mm() == length_mm
                        && gauge.map_or(true, |g| p.gauge == g) =>
                {
                    Some(i)
                }
                _ => None,
            })
            .collect();
        Self::order_candidates(material, &mut candidates, policy);

        // 全有或全無預檢
        let available: Decimal = candidates
            .iter()
            .map(|&i| material.batches[i].current_quantity())
            .sum();
        let needed = Decimal::from(pieces_needed);
        if available < needed {
            return Err(PlanError::InsufficientStock {
                material_id: material.id.clone(),
                gauge: gauge.map(|g| g.to_string()),
                length_mm: Some(length_mm),
                needed,
                available,
            });
        }

        let mut records = Vec::new();
        let mut remaining = pieces_needed;
        for i in candidates {
            if remaining == 0 {
                break;
            }
            if let StockBatch::Profile(p) = &mut material.batches[i] {
                let taken = p.take(remaining);
                if taken == 0 {
                    continue;
                }
                remaining -= taken;
                tracing::debug!(
                    material_id = %material.id,
                    batch_id = %p.batch_id,
                    taken,
                    remaining,
                    "消耗型材批次"
                );
                records.push(BatchConsumption {
                    batch_id: p.batch_id,
                    quantity_consumed: Decimal::from(taken),
                    rate_applied: p.rate_per_piece,
                    supplier: p.supplier.clone(),
                    purchase_date: p.purchase_date,
                });
            }
        }
        Ok(records)
    }

    /// 消耗一般批次（按數量）
    ///
    /// 面積型批次的成交費率取每面積費率，其餘取單位費率。
    pub fn consume_simple(
        material: &mut Material,
        quantity_needed: Decimal,
        policy: ConsumptionPolicy,
    ) -> Result<Vec<BatchConsumption>> {
        if quantity_needed <= Decimal::ZERO {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<usize> = material
            .batches
            .iter()
            .enumerate()
            .filter_map(|(i, b)| match b {
                StockBatch::Simple(_) if b.is_eligible(Decimal::ZERO) => Some(i),
                _ => None,
            })
            .collect();
        Self::order_candidates(material, &mut candidates, policy);

        let available: Decimal = candidates
            .iter()
            .map(|&i| material.batches[i].current_quantity())
            .sum();
        if available < quantity_needed {
            return Err(PlanError::InsufficientStock {
                material_id: material.id.clone(),
                gauge: None,
                length_mm: None,
                needed: quantity_needed,
                available,
            });
        }

        let mut records = Vec::new();
        let mut remaining = quantity_needed;
        for i in candidates {
            if remaining <= Decimal::ZERO {
                break;
            }
            if let StockBatch::Simple(s) = &mut material.batches[i] {
                let taken = s.take(remaining);
                if taken <= Decimal::ZERO {
                    continue;
                }
                remaining -= taken;
                let rate = if s.is_area_tracked() {
                    s.rate_per_area.unwrap_or(s.rate_per_unit)
                } else {
                    s.rate_per_unit
                };
                tracing::debug!(
                    material_id = %material.id,
                    batch_id = %s.batch_id,
                    %taken,
                    %remaining,
                    "消耗一般批次"
                );
                records.push(BatchConsumption {
                    batch_id: s.batch_id,
                    quantity_consumed: taken,
                    rate_applied: rate,
                    supplier: s.supplier.clone(),
                    purchase_date: s.purchase_date,
                });
            }
        }
        Ok(records)
    }

    /// 按策略排序候選批次
    ///
    /// 日期相同時一律以批次ID字典序遞增定序，確保重放一致。
    fn order_candidates(material: &Material, candidates: &mut [usize], policy: ConsumptionPolicy) {
        candidates.sort_by(|&a, &b| {
            let ba = &material.batches[a];
            let bb = &material.batches[b];
            let date_order = match policy {
                ConsumptionPolicy::Fifo => ba.purchase_date().cmp(&bb.purchase_date()),
                ConsumptionPolicy::Lifo => bb.purchase_date().cmp(&ba.purchase_date()),
            };
            date_order.then_with(|| ba.batch_id().to_string().cmp(&bb.batch_id().to_string()))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutplan_core::{MaterialCategory, ProfileBatch, SimpleBatch};
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ft(v: u32) -> Length {
        Length::feet(Decimal::from(v))
    }

    fn profile_material(batches: Vec<(NaiveDate, u32, Decimal)>) -> Material {
        let mut material = Material::new(
            "ALU-PIPE-25".to_string(),
            "25mm 鋁方管".to_string(),
            MaterialCategory::Profile,
        );
        for (purchase_date, qty, rate) in batches {
            material.batches.push(StockBatch::Profile(ProfileBatch::new(
                ft(16),
                "1.2mm".to_string(),
                qty,
                rate,
                purchase_date,
            )));
        }
        material
    }

    #[test]
    fn test_fifo_consumes_oldest_first() {
        let mut material = profile_material(vec![
            (date(2024, 2, 1), 5, Decimal::from(880)),
            (date(2024, 1, 1), 5, Decimal::from(850)),
        ]);

        let records = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            7,
            ConsumptionPolicy::Fifo,
        )
        .unwrap();

        // 一月批次先耗盡（5 支），餘 2 支落到二月批次
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].purchase_date, date(2024, 1, 1));
        assert_eq!(records[0].quantity_consumed, Decimal::from(5));
        assert_eq!(records[0].rate_applied, Decimal::from(850));
        assert_eq!(records[1].purchase_date, date(2024, 2, 1));
        assert_eq!(records[1].quantity_consumed, Decimal::from(2));

        // 一月批次標記耗盡
        let january = material
            .batches
            .iter()
            .find(|b| b.purchase_date() == date(2024, 1, 1))
            .unwrap();
        assert_eq!(january.current_quantity(), Decimal::ZERO);
        assert!(!january.is_eligible(Decimal::ZERO));
    }

    #[test]
    fn test_lifo_consumes_newest_first() {
        let mut material = profile_material(vec![
            (date(2024, 1, 1), 5, Decimal::from(850)),
            (date(2024, 2, 1), 5, Decimal::from(880)),
        ]);

        let records = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            7,
            ConsumptionPolicy::Lifo,
        )
        .unwrap();

        assert_eq!(records[0].purchase_date, date(2024, 2, 1));
        assert_eq!(records[0].quantity_consumed, Decimal::from(5));
        assert_eq!(records[1].purchase_date, date(2024, 1, 1));
        assert_eq!(records[1].quantity_consumed, Decimal::from(2));
    }

    #[test]
    fn test_insufficient_stock_leaves_batches_untouched() {
        let mut material = profile_material(vec![
            (date(2024, 1, 1), 3, Decimal::from(850)),
            (date(2024, 2, 1), 2, Decimal::from(880)),
        ]);

        let err = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            6,
            ConsumptionPolicy::Fifo,
        )
        .unwrap_err();

        match err {
            PlanError::InsufficientStock {
                needed, available, ..
            } => {
                assert_eq!(needed, Decimal::from(6));
                assert_eq!(available, Decimal::from(5));
            }
            other => panic!("預期 InsufficientStock，得到 {other:?}"),
        }

        // 全有或全無：任何批次都不得被部分扣減
        for batch in &material.batches {
            assert_eq!(batch.current_quantity(), batch.original_quantity());
        }
    }

    #[test]
    fn test_gauge_and_length_filter() {
        let mut material = profile_material(vec![(date(2024, 1, 1), 5, Decimal::from(850))]);
        material.batches.push(StockBatch::Profile(ProfileBatch::new(
            ft(12),
            "1.2mm".to_string(),
            5,
            Decimal::from(700),
            date(2024, 1, 1),
        )));
        material.batches.push(StockBatch::Profile(ProfileBatch::new(
            ft(16),
            "2.0mm".to_string(),
            5,
            Decimal::from(950),
            date(2024, 1, 1),
        )));

        // 只有同長度同規格的 5 支可用
        let err = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            6,
            ConsumptionPolicy::Fifo,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlanError::InsufficientStock { available, .. } if available == Decimal::from(5)
        ));
    }

    #[test]
    fn test_inactive_batch_is_skipped() {
        let mut material = profile_material(vec![
            (date(2024, 1, 1), 5, Decimal::from(850)),
            (date(2024, 2, 1), 5, Decimal::from(880)),
        ]);
        if let StockBatch::Profile(p) = &mut material.batches[0] {
            p.is_active = false;
        }

        let records = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            4,
            ConsumptionPolicy::Fifo,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].purchase_date, date(2024, 2, 1));
    }

    #[rstest]
    #[case(ConsumptionPolicy::Fifo)]
    #[case(ConsumptionPolicy::Lifo)]
    fn test_same_date_tie_broken_by_batch_id(#[case] policy: ConsumptionPolicy) {
        let mut material = profile_material(vec![
            (date(2024, 1, 1), 3, Decimal::from(850)),
            (date(2024, 1, 1), 3, Decimal::from(860)),
        ]);

        let records =
            BatchLedger::consume_profile(&mut material, Some("1.2mm"), ft(16), 4, policy).unwrap();

        // 同日期批次按批次ID字典序，兩種策略順序一致
        assert_eq!(records.len(), 2);
        assert!(records[0].batch_id.to_string() < records[1].batch_id.to_string());
    }

    #[test]
    fn test_simple_consumption_with_area_rate() {
        let mut material = Material::new(
            "MESH-SS".to_string(),
            "不鏽鋼網".to_string(),
            MaterialCategory::WireMesh,
        );
        material.batches.push(StockBatch::Simple(
            SimpleBatch::new(Decimal::from(3), Decimal::from(1200), date(2024, 2, 1))
                .with_area(Decimal::from(4), Decimal::from(50), Decimal::from(6)),
        ));

        let records =
            BatchLedger::consume_simple(&mut material, Decimal::from(2), ConsumptionPolicy::Fifo)
                .unwrap();
        assert_eq!(records.len(), 1);
        // 面積型批次的成交費率取每面積費率
        assert_eq!(records[0].rate_applied, Decimal::from(6));
    }

    #[test]
    fn test_zero_quantity_is_noop() {
        let mut material = profile_material(vec![(date(2024, 1, 1), 5, Decimal::from(850))]);
        let records = BatchLedger::consume_profile(
            &mut material,
            Some("1.2mm"),
            ft(16),
            0,
            ConsumptionPolicy::Fifo,
        )
        .unwrap();
        assert!(records.is_empty());
        assert_eq!(material.batches[0].current_quantity(), Decimal::from(5));
    }
}
