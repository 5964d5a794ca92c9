//! 固定精度數值與長度單位
//!
//! 所有成本/重量/餘料計算一律使用 `rust_decimal::Decimal`，
//! 不使用原生浮點數，避免大量小批次累積的捨入漂移。

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 數量小數位數
pub const QTY_DP: u32 = 3;
/// 費率小數位數
pub const RATE_DP: u32 = 4;
/// 重量小數位數
pub const WEIGHT_DP: u32 = 3;

/// 數量捨入（四捨五入、遠離零）
pub fn round_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QTY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// 費率捨入
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// 重量捨入
pub fn round_weight(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(WEIGHT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// 金額小數位數
pub const MONEY_DP: u32 = 2;

/// 金額捨入
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// 長度單位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    /// 毫米
    Millimeter,
    /// 公分
    Centimeter,
    /// 公尺
    Meter,
    /// 英吋
    Inch,
    /// 英尺
    Foot,
}

impl LengthUnit {
    /// 轉換為毫米的係數
    pub fn to_mm_factor(self) -> Decimal {
        match self {
            LengthUnit::Millimeter => Decimal::ONE,
            LengthUnit::Centimeter => Decimal::from(10),
            LengthUnit::Meter => Decimal::from(1000),
            LengthUnit::Inch => Decimal::new(254, 1),
            LengthUnit::Foot => Decimal::new(3048, 1),
        }
    }

    /// 單位縮寫
    pub fn abbrev(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Meter => "m",
            LengthUnit::Inch => "in",
            LengthUnit::Foot => "ft",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbrev())
    }
}

/// 帶單位標籤的長度值
///
/// 比較運算以毫米為基準：`Length::feet(1) == Length::inches(12)`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Length {
    pub value: Decimal,
    pub unit: LengthUnit,
}

impl Length {
    /// 創建新的長度值
    pub fn new(value: Decimal, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub fn millimeters(value: Decimal) -> Self {
        Self::new(value, LengthUnit::Millimeter)
    }

    pub fn meters(value: Decimal) -> Self {
        Self::new(value, LengthUnit::Meter)
    }

    pub fn inches(value: Decimal) -> Self {
        Self::new(value, LengthUnit::Inch)
    }

    pub fn feet(value: Decimal) -> Self {
        Self::new(value, LengthUnit::Foot)
    }

    /// 轉換為毫米（標準比較基準）
    pub fn to_mm(&self) -> Decimal {
        self.value * self.unit.to_mm_factor()
    }

    /// 轉換為公尺（重量計算以 kg/m 為基準）
    pub fn to_meters(&self) -> Decimal {
        self.to_mm() / Decimal::from(1000)
    }

    /// 以毫米值換算回指定單位
    pub fn from_mm(mm: Decimal, unit: LengthUnit) -> Self {
        Self::new(mm / unit.to_mm_factor(), unit)
    }

    /// 長度是否為正值
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }
}

impl PartialEq for Length {
    fn eq(&self, other: &Self) -> bool {
        self.to_mm() == other.to_mm()
    }
}

impl Eq for Length {}

impl PartialOrd for Length {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Length {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_mm().cmp(&other.to_mm())
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        let twelve_ft = Length::feet(Decimal::from(12));
        assert_eq!(twelve_ft.to_mm(), Decimal::new(36576, 1)); // 3657.6 mm

        let one_meter = Length::meters(Decimal::ONE);
        assert_eq!(one_meter.to_mm(), Decimal::from(1000));
    }

    #[test]
    fn test_cross_unit_comparison() {
        // 1 英尺 == 12 英吋
        assert_eq!(Length::feet(Decimal::ONE), Length::inches(Decimal::from(12)));
        assert!(Length::meters(Decimal::ONE) > Length::feet(Decimal::from(3)));
    }

    #[test]
    fn test_rounding_strategies() {
        // 四捨五入、遠離零
        let v: Decimal = "1.23456".parse().unwrap();
        assert_eq!(round_qty(v).to_string(), "1.235");
        assert_eq!(round_rate(v).to_string(), "1.2346");

        let mid: Decimal = "2.0005".parse().unwrap();
        assert_eq!(round_weight(mid).to_string(), "2.001");
    }

    #[test]
    fn test_from_mm_roundtrip() {
        let l = Length::from_mm(Decimal::new(3048, 1), LengthUnit::Foot);
        assert_eq!(l.value, Decimal::ONE);
    }
}
