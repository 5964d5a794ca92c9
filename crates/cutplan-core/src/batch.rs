//! 庫存批次模型
//!
//! 批次依物料類別分為兩種形狀：型材批次（按支、帶規格與長度）與
//! 一般批次（玻璃/五金/耗材/網材，按數量或面積）。兩者以帶標籤的
//! 變體類型表示，類別專屬欄位只有在 match 之後才可觸及。

use crate::unit::Length;
use crate::{PlanError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 型材批次（按支管理）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileBatch {
    /// 批次ID
    pub batch_id: Uuid,

    /// 標準長度（含單位）
    pub length: Length,

    /// 規格（厚度/gauge）
    pub gauge: String,

    /// 進貨數量（支）
    pub original_quantity: u32,

    /// 現存數量（支）
    pub current_quantity: u32,

    /// 實際過磅總重（kg）
    pub actual_total_weight: Decimal,

    /// 單支費率
    pub rate_per_piece: Decimal,

    /// 每公斤費率
    pub rate_per_kg: Decimal,

    /// 進貨日期
    pub purchase_date: NaiveDate,

    /// 供應商
    pub supplier: Option<String>,

    /// 是否啟用
    pub is_active: bool,

    /// 是否已耗盡
    pub is_completed: bool,

    /// 低庫存警示門檻（支）
    pub low_stock_threshold: u32,
}

impl ProfileBatch {
    /// 創建新的型材批次
    pub fn new(
        length: Length,
        gauge: String,
        quantity: u32,
        rate_per_piece: Decimal,
        purchase_date: NaiveDate,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            length,
            gauge,
            original_quantity: quantity,
            current_quantity: quantity,
            actual_total_weight: Decimal::ZERO,
            rate_per_piece,
            rate_per_kg: Decimal::ZERO,
            purchase_date,
            supplier: None,
            is_active: true,
            is_completed: quantity == 0,
            low_stock_threshold: 0,
        }
    }

    /// 建構器模式：設置實際總重與每公斤費率
    pub fn with_weight(mut self, total_weight: Decimal, rate_per_kg: Decimal) -> Self {
        self.actual_total_weight = total_weight;
        self.rate_per_kg = rate_per_kg;
        self
    }

    /// 建構器模式：設置供應商
    pub fn with_supplier(mut self, supplier: String) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// 建構器模式：設置低庫存門檻
    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// 按現存比例估算剩餘重量
    pub fn remaining_weight(&self) -> Decimal {
        if self.original_quantity == 0 {
            return Decimal::ZERO;
        }
        self.actual_total_weight * Decimal::from(self.current_quantity)
            / Decimal::from(self.original_quantity)
    }

    /// 現存是否低於警示門檻
    pub fn is_below_threshold(&self) -> bool {
        self.low_stock_threshold > 0 && self.current_quantity <= self.low_stock_threshold
    }

    /// 從批次取走指定支數，回傳實際取走量
    ///
    /// 耗盡時標記 `is_completed`，維持 `is_completed ⇔ current_quantity == 0`。
    pub fn take(&mut self, pieces: u32) -> u32 {
        let taken = pieces.min(self.current_quantity);
        self.current_quantity -= taken;
        if self.current_quantity == 0 {
            self.is_completed = true;
        }
        taken
    }
}

/// 一般批次（玻璃/五金/耗材/網材）
///
/// 捲料型庫存（如網材）可帶面積欄位；面積欄位必須全有或全無，
/// 不允許半填的過渡狀態（進貨驗證時拒絕）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleBatch {
    /// 批次ID
    pub batch_id: Uuid,

    /// 進貨數量
    pub original_quantity: Decimal,

    /// 現存數量
    pub current_quantity: Decimal,

    /// 單位費率
    pub rate_per_unit: Decimal,

    /// 捲寬（面積型庫存）
    pub selected_width: Option<Decimal>,

    /// 捲長（面積型庫存）
    pub roll_length: Option<Decimal>,

    /// 總面積（面積型庫存）
    pub total_area: Option<Decimal>,

    /// 每面積費率（面積型庫存）
    pub rate_per_area: Option<Decimal>,

    /// 進貨日期
    pub purchase_date: NaiveDate,

    /// 供應商
    pub supplier: Option<String>,

    /// 是否啟用
    pub is_active: bool,

    /// 是否已耗盡
    pub is_completed: bool,
}

impl SimpleBatch {
    /// 創建新的一般批次
    pub fn new(quantity: Decimal, rate_per_unit: Decimal, purchase_date: NaiveDate) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            original_quantity: quantity,
            current_quantity: quantity,
            rate_per_unit,
            selected_width: None,
            roll_length: None,
            total_area: None,
            rate_per_area: None,
            purchase_date,
            supplier: None,
            is_active: true,
            is_completed: quantity <= Decimal::ZERO,
        }
    }

    /// 建構器模式：設置面積欄位（捲料型庫存）
    ///
    /// 寬度與長度描述單捲規格，批次總面積 = 單捲面積 × 進貨捲數。
    pub fn with_area(
        mut self,
        selected_width: Decimal,
        roll_length: Decimal,
        rate_per_area: Decimal,
    ) -> Self {
        self.selected_width = Some(selected_width);
        self.roll_length = Some(roll_length);
        self.total_area = Some(selected_width * roll_length * self.original_quantity);
        self.rate_per_area = Some(rate_per_area);
        self
    }

    /// 建構器模式：設置供應商
    pub fn with_supplier(mut self, supplier: String) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// 是否為面積型庫存
    pub fn is_area_tracked(&self) -> bool {
        self.total_area.is_some()
    }

    /// 按現存比例估算剩餘面積
    pub fn remaining_area(&self) -> Decimal {
        match self.total_area {
            Some(area) if self.original_quantity > Decimal::ZERO => {
                area * self.current_quantity / self.original_quantity
            }
            _ => Decimal::ZERO,
        }
    }

    /// 面積欄位資料品質驗證：全有或全無
    pub fn validate(&self) -> Result<()> {
        let fields = [
            self.selected_width.is_some(),
            self.roll_length.is_some(),
            self.total_area.is_some(),
            self.rate_per_area.is_some(),
        ];
        let populated = fields.iter().filter(|f| **f).count();
        if populated != 0 && populated != fields.len() {
            return Err(PlanError::InvalidBatch(format!(
                "批次 {} 的面積欄位不完整（{}/{}），捲數制與面積制不得混填",
                self.batch_id,
                populated,
                fields.len()
            )));
        }
        Ok(())
    }

    /// 從批次取走指定數量，回傳實際取走量
    pub fn take(&mut self, quantity: Decimal) -> Decimal {
        let taken = quantity.min(self.current_quantity);
        self.current_quantity -= taken;
        if self.current_quantity <= Decimal::ZERO {
            self.current_quantity = Decimal::ZERO;
            self.is_completed = true;
        }
        taken
    }
}

/// 庫存批次（帶標籤變體）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockBatch {
    Profile(ProfileBatch),
    Simple(SimpleBatch),
}

impl StockBatch {
    /// 批次ID
    pub fn batch_id(&self) -> Uuid {
        match self {
            StockBatch::Profile(b) => b.batch_id,
            StockBatch::Simple(b) => b.batch_id,
        }
    }

    /// 進貨日期
    pub fn purchase_date(&self) -> NaiveDate {
        match self {
            StockBatch::Profile(b) => b.purchase_date,
            StockBatch::Simple(b) => b.purchase_date,
        }
    }

    /// 現存數量（統一為 Decimal）
    pub fn current_quantity(&self) -> Decimal {
        match self {
            StockBatch::Profile(b) => Decimal::from(b.current_quantity),
            StockBatch::Simple(b) => b.current_quantity,
        }
    }

    /// 進貨數量（統一為 Decimal）
    pub fn original_quantity(&self) -> Decimal {
        match self {
            StockBatch::Profile(b) => Decimal::from(b.original_quantity),
            StockBatch::Simple(b) => b.original_quantity,
        }
    }

    /// 供應商
    pub fn supplier(&self) -> Option<&str> {
        match self {
            StockBatch::Profile(b) => b.supplier.as_deref(),
            StockBatch::Simple(b) => b.supplier.as_deref(),
        }
    }

    /// 是否可供消耗
    ///
    /// 條件：啟用、未耗盡、現存量大於最小過濾量。
    pub fn is_eligible(&self, min_quantity_filter: Decimal) -> bool {
        let (active, completed) = match self {
            StockBatch::Profile(b) => (b.is_active, b.is_completed),
            StockBatch::Simple(b) => (b.is_active, b.is_completed),
        };
        active && !completed && self.current_quantity() > min_quantity_filter
    }

    /// 檢查批次不變量
    ///
    /// `0 ≤ current ≤ original` 且 `is_completed ⇔ current == 0`。
    pub fn check_invariants(&self) -> Result<()> {
        let current = self.current_quantity();
        let original = self.original_quantity();
        let completed = match self {
            StockBatch::Profile(b) => b.is_completed,
            StockBatch::Simple(b) => b.is_completed,
        };

        if current < Decimal::ZERO || current > original {
            return Err(PlanError::InvalidBatch(format!(
                "批次 {} 數量越界: 現存 {}, 進貨 {}",
                self.batch_id(),
                current,
                original
            )));
        }
        if completed != (current == Decimal::ZERO) {
            return Err(PlanError::InvalidBatch(format!(
                "批次 {} 耗盡標記與現存量不符: completed={}, 現存 {}",
                self.batch_id(),
                completed,
                current
            )));
        }
        if let StockBatch::Simple(b) = self {
            b.validate()?;
        }
        Ok(())
    }
}

/// 舊版嵌入式批次形狀（遷移前的扁平記錄）
///
/// 舊資料一律以英尺存長度、以文字存數值；缺漏欄位在遷移時補預設值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyBatch {
    pub batch_id: Option<Uuid>,
    pub length_ft: Option<Decimal>,
    pub gauge: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub weight: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

/// 持久化批次記錄（新/舊版本的帶標籤聯集）
///
/// 舊形狀在載入時一次性解析為現行形狀（版本化遷移步驟），
/// 之後所有讀取都只接觸 `StockBatch`，不做逐筆讀取時的回退分支。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "schema", content = "batch", rename_all = "snake_case")]
pub enum BatchRecord {
    V2(StockBatch),
    Legacy(LegacyBatch),
}

impl BatchRecord {
    /// 載入時解析為現行批次形狀
    pub fn resolve(self) -> Result<StockBatch> {
        match self {
            BatchRecord::V2(batch) => {
                batch.check_invariants()?;
                Ok(batch)
            }
            BatchRecord::Legacy(legacy) => {
                let purchase_date = legacy
                    .purchase_date
                    .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());

                let batch = match (legacy.length_ft, legacy.gauge) {
                    (Some(length_ft), Some(gauge)) => {
                        let quantity =
                            rust_decimal::prelude::ToPrimitive::to_u32(&legacy.quantity.trunc())
                                .ok_or_else(|| {
                                    PlanError::InvalidBatch(format!(
                                        "舊批次數量無法轉換為支數: {}",
                                        legacy.quantity
                                    ))
                                })?;
                        let weight = legacy.weight.unwrap_or(Decimal::ZERO);
                        let rate_per_kg = if weight > Decimal::ZERO {
                            legacy.rate * Decimal::from(quantity) / weight
                        } else {
                            Decimal::ZERO
                        };
                        let mut profile = ProfileBatch::new(
                            Length::feet(length_ft),
                            gauge,
                            quantity,
                            legacy.rate,
                            purchase_date,
                        )
                        .with_weight(weight, rate_per_kg);
                        if let Some(id) = legacy.batch_id {
                            profile.batch_id = id;
                        }
                        profile.supplier = legacy.supplier;
                        StockBatch::Profile(profile)
                    }
                    _ => {
                        let mut simple =
                            SimpleBatch::new(legacy.quantity, legacy.rate, purchase_date);
                        if let Some(id) = legacy.batch_id {
                            simple.batch_id = id;
                        }
                        simple.supplier = legacy.supplier;
                        StockBatch::Simple(simple)
                    }
                };

                batch.check_invariants()?;
                Ok(batch)
            }
        }
    }
}
