//! 物料彙總快取

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單一物料的彙總結果
///
/// 永遠可由批次狀態重算的衍生快取，不得手動修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTotals {
    /// 現存總量
    pub total_current_stock: Decimal,

    /// 現存總重（kg）
    pub total_current_weight: Decimal,

    /// 現存總值
    pub total_current_value: Decimal,

    /// 平均單件費率
    pub average_rate_per_piece: Decimal,

    /// 平均每公斤費率
    pub average_rate_per_kg: Decimal,

    /// 最後重算時間
    pub last_updated: DateTime<Utc>,
}

impl AggregatedTotals {
    /// 創建歸零的彙總
    pub fn zero() -> Self {
        Self {
            total_current_stock: Decimal::ZERO,
            total_current_weight: Decimal::ZERO,
            total_current_value: Decimal::ZERO,
            average_rate_per_piece: Decimal::ZERO,
            average_rate_per_kg: Decimal::ZERO,
            last_updated: Utc::now(),
        }
    }

    /// 數值是否相同（忽略重算時間戳）
    pub fn same_values(&self, other: &Self) -> bool {
        self.total_current_stock == other.total_current_stock
            && self.total_current_weight == other.total_current_weight
            && self.total_current_value == other.total_current_value
            && self.average_rate_per_piece == other.average_rate_per_piece
            && self.average_rate_per_kg == other.average_rate_per_kg
    }
}
