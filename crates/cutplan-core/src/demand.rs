//! 切割需求模型

use crate::unit::Length;
use serde::{Deserialize, Serialize};

/// 訂單對單一物料/規格群組提出的切割需求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredCut {
    /// 物料ID
    pub material_id: String,

    /// 規格（型材必填，一般物料可省略）
    pub gauge: Option<String>,

    /// 成品切割長度
    pub cut_length: Length,

    /// 需求支數
    pub quantity_needed: u32,
}

impl RequiredCut {
    /// 創建新的切割需求
    pub fn new(material_id: String, cut_length: Length, quantity_needed: u32) -> Self {
        Self {
            material_id,
            gauge: None,
            cut_length,
            quantity_needed,
        }
    }

    /// 建構器模式：設置規格
    pub fn with_gauge(mut self, gauge: String) -> Self {
        self.gauge = Some(gauge);
        self
    }

    /// 需求總長度（毫米）
    pub fn total_length_mm(&self) -> rust_decimal::Decimal {
        self.cut_length.to_mm() * rust_decimal::Decimal::from(self.quantity_needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_create_required_cut() {
        let cut = RequiredCut::new(
            "ALU-PIPE-25".to_string(),
            Length::feet(Decimal::from(10)),
            3,
        )
        .with_gauge("1.2mm".to_string());

        assert_eq!(cut.material_id, "ALU-PIPE-25");
        assert_eq!(cut.gauge.as_deref(), Some("1.2mm"));
        assert_eq!(cut.quantity_needed, 3);
        // 3 × 10ft = 9144 mm
        assert_eq!(cut.total_length_mm(), Decimal::new(91440, 1));
    }
}
