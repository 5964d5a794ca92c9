//! 切割計劃模型

use crate::unit::Length;
use crate::{PlanError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 單一切割長度與支數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutBreakdown {
    /// 切割長度
    pub cut_length: Length,

    /// 支數
    pub count: u32,
}

/// 同一切割樣式的原料管群組
///
/// `cuts_made` 描述「單支」原料管上的切割樣式，`pipe_count` 為
/// 採用此樣式的支數；`scrap_generated` 與 `calculated_weight`
/// 皆為單支值，總量以 `total_scrap()` / `total_weight()` 取得。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeUsed {
    /// 標準長度（含單位）
    pub standard_length: Length,

    /// 採用此樣式的原料管支數
    pub pipe_count: u32,

    /// 單支切割明細 (長度, 支數)
    pub cuts_made: Vec<CutBreakdown>,

    /// 單支餘料長度
    pub scrap_generated: Length,

    /// 單支計算重量（kg，僅型材）
    pub calculated_weight: Decimal,
}

impl PipeUsed {
    /// 此群組的餘料總長（毫米）
    pub fn total_scrap_mm(&self) -> Decimal {
        self.scrap_generated.to_mm() * Decimal::from(self.pipe_count)
    }

    /// 此群組的計算總重（kg）
    pub fn total_weight(&self) -> Decimal {
        self.calculated_weight * Decimal::from(self.pipe_count)
    }

    /// 此群組內的切割總支數
    pub fn cut_count(&self) -> u32 {
        self.cuts_made.iter().map(|c| c.count).sum::<u32>() * self.pipe_count
    }
}

/// 單一物料/規格群組的用料計劃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPlan {
    /// 物料ID
    pub material_id: String,

    /// 規格
    pub gauge: Option<String>,

    /// 原料管用量明細
    pub pipes_used: Vec<PipeUsed>,

    /// 計劃總重（kg）
    pub total_weight: Decimal,

    /// 餘料總重（kg）
    pub total_scrap_weight: Decimal,
}

impl MaterialPlan {
    /// 原料管總支數
    pub fn total_pipe_count(&self) -> u32 {
        self.pipes_used.iter().map(|p| p.pipe_count).sum()
    }

    /// 切割總支數
    pub fn total_cut_count(&self) -> u32 {
        self.pipes_used.iter().map(|p| p.cut_count()).sum()
    }

    /// 餘料總長（毫米）
    pub fn total_scrap_mm(&self) -> Decimal {
        self.pipes_used.iter().map(|p| p.total_scrap_mm()).sum()
    }
}

/// 計劃彙總
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSummary {
    /// 計劃總重（kg）
    pub total_weight: Decimal,

    /// 餘料總重（kg）
    pub total_scrap_weight: Decimal,
}

/// 切割計劃狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    /// 待最佳化
    Pending,
    /// 已產生（尚未動帳）
    Generated,
    /// 已提交（批次已消耗）
    Committed,
    /// 失敗
    Failed,
}

impl PlanStatus {
    /// 狀態機允許的轉換
    pub fn can_transition_to(self, to: PlanStatus) -> bool {
        matches!(
            (self, to),
            (PlanStatus::Pending, PlanStatus::Generated)
                | (PlanStatus::Pending, PlanStatus::Failed)
                | (PlanStatus::Generated, PlanStatus::Committed)
                | (PlanStatus::Generated, PlanStatus::Failed)
        )
    }
}

/// 切割計劃（獨立文件）
///
/// 只以 id 參照物料與批次，不嵌入；帳務異動不需回寫計劃。
/// 只有重新最佳化（整份替換）與提交會改變計劃內容。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuttingPlan {
    /// 計劃ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 計劃版本（與訂單ID合為提交冪等鍵）
    pub version: u32,

    /// 各物料用料計劃
    pub material_plans: Vec<MaterialPlan>,

    /// 彙總
    pub summary: PlanSummary,

    /// 狀態
    pub status: PlanStatus,

    /// 建立時間
    pub created_at: DateTime<Utc>,

    /// 最後異動時間
    pub updated_at: DateTime<Utc>,
}

impl CuttingPlan {
    /// 創建新的待最佳化計劃
    pub fn new(order_id: String, version: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            version,
            material_plans: Vec::new(),
            summary: PlanSummary::default(),
            status: PlanStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// 執行狀態轉換，違反狀態機則回錯
    pub fn transition(&mut self, to: PlanStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(PlanError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 計劃涉及的物料ID（排序去重）
    pub fn material_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .material_plans
            .iter()
            .map(|p| p.material_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pipe() -> PipeUsed {
        PipeUsed {
            standard_length: Length::feet(Decimal::from(16)),
            pipe_count: 2,
            cuts_made: vec![
                CutBreakdown {
                    cut_length: Length::feet(Decimal::from(10)),
                    count: 1,
                },
                CutBreakdown {
                    cut_length: Length::feet(Decimal::from(6)),
                    count: 1,
                },
            ],
            scrap_generated: Length::feet(Decimal::ZERO),
            calculated_weight: Decimal::from(3),
        }
    }

    #[test]
    fn test_pipe_used_totals() {
        let pipe = sample_pipe();
        assert_eq!(pipe.cut_count(), 4);
        assert_eq!(pipe.total_weight(), Decimal::from(6));
        assert_eq!(pipe.total_scrap_mm(), Decimal::ZERO);
    }

    #[test]
    fn test_status_machine() {
        let mut plan = CuttingPlan::new("SO-1001".to_string(), 1);
        assert_eq!(plan.status, PlanStatus::Pending);

        plan.transition(PlanStatus::Generated).unwrap();
        plan.transition(PlanStatus::Committed).unwrap();

        // 已提交的計劃不得再提交、不得失敗
        assert!(plan.transition(PlanStatus::Committed).is_err());
        assert!(plan.transition(PlanStatus::Failed).is_err());
    }

    #[test]
    fn test_pending_can_fail() {
        let mut plan = CuttingPlan::new("SO-1002".to_string(), 1);
        plan.transition(PlanStatus::Failed).unwrap();
        assert!(plan.transition(PlanStatus::Generated).is_err());
    }

    #[test]
    fn test_material_ids_sorted_dedup() {
        let mut plan = CuttingPlan::new("SO-1003".to_string(), 1);
        for id in ["B-MAT", "A-MAT", "B-MAT"] {
            plan.material_plans.push(MaterialPlan {
                material_id: id.to_string(),
                gauge: None,
                pipes_used: vec![],
                total_weight: Decimal::ZERO,
                total_scrap_weight: Decimal::ZERO,
            });
        }
        assert_eq!(plan.material_ids(), vec!["A-MAT", "B-MAT"]);
    }
}
