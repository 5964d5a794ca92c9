//! 物料與型錄模型

use crate::batch::{BatchRecord, StockBatch};
use crate::totals::AggregatedTotals;
use crate::unit::Length;
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 物料類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialCategory {
    /// 型材（鋁管/型鋼，按支、帶規格與標準長度）
    Profile,
    /// 網材（捲料，帶標準長度，按捲或面積）
    WireMesh,
    /// 一般物料（玻璃/五金/配件/耗材）
    Simple,
}

impl MaterialCategory {
    /// 是否帶標準長度目錄（可被切割最佳化）
    pub fn tracks_standard_lengths(self) -> bool {
        matches!(self, MaterialCategory::Profile | MaterialCategory::WireMesh)
    }
}

/// 規格參考重量（kg/m）
///
/// 僅供報價與計劃重量估算，消耗作業不得改動。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeWeight {
    /// 規格（厚度/gauge）
    pub gauge: String,

    /// 每公尺參考重量（kg）
    pub weight_per_meter: Decimal,
}

impl GaugeWeight {
    pub fn new(gauge: String, weight_per_meter: Decimal) -> Self {
        Self {
            gauge,
            weight_per_meter,
        }
    }
}

/// 物料
///
/// 物料獨占其批次（批次不離開物料存在）；彙總快取只由重算覆寫。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// 物料ID
    pub id: String,

    /// 物料名稱
    pub name: String,

    /// 類別
    pub category: MaterialCategory,

    /// 庫存單位（支/捲/片/件）
    pub stock_unit: String,

    /// 用量單位（ft/m/sqft/件）
    pub usage_unit: String,

    /// 標準長度目錄（型材/網材）
    pub standard_lengths: Vec<Length>,

    /// 規格參考重量表
    pub gauge_weights: Vec<GaugeWeight>,

    /// 實體批次
    pub batches: Vec<StockBatch>,

    /// 彙總快取
    pub aggregated_totals: Option<AggregatedTotals>,
}

impl Material {
    /// 創建新的物料
    pub fn new(id: String, name: String, category: MaterialCategory) -> Self {
        Self {
            id,
            name,
            category,
            stock_unit: "pcs".to_string(),
            usage_unit: "ft".to_string(),
            standard_lengths: Vec::new(),
            gauge_weights: Vec::new(),
            batches: Vec::new(),
            aggregated_totals: None,
        }
    }

    /// 建構器模式：設置單位
    pub fn with_units(mut self, stock_unit: String, usage_unit: String) -> Self {
        self.stock_unit = stock_unit;
        self.usage_unit = usage_unit;
        self
    }

    /// 建構器模式：設置標準長度目錄
    pub fn with_standard_lengths(mut self, lengths: Vec<Length>) -> Self {
        self.standard_lengths = lengths;
        self
    }

    /// 建構器模式：追加規格參考重量
    pub fn with_gauge_weight(mut self, gauge: String, weight_per_meter: Decimal) -> Self {
        self.gauge_weights
            .push(GaugeWeight::new(gauge, weight_per_meter));
        self
    }

    /// 建構器模式：追加批次
    pub fn with_batch(mut self, batch: StockBatch) -> Self {
        self.batches.push(batch);
        self
    }

    /// 查詢規格的每公尺參考重量
    pub fn weight_per_meter(&self, gauge: &str) -> Option<Decimal> {
        self.gauge_weights
            .iter()
            .find(|g| g.gauge == gauge)
            .map(|g| g.weight_per_meter)
    }

    /// 可供消耗的批次（啟用、未耗盡、量大於過濾值）
    pub fn eligible_batches(&self, min_quantity_filter: Decimal) -> Vec<&StockBatch> {
        self.batches
            .iter()
            .filter(|b| b.is_eligible(min_quantity_filter))
            .collect()
    }
}

/// 持久化物料文件
///
/// 批次以版本化記錄存放，載入時一次性解析為現行形狀。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDocument {
    pub id: String,
    pub name: String,
    pub category: MaterialCategory,
    pub stock_unit: String,
    pub usage_unit: String,
    pub standard_lengths: Vec<Length>,
    pub gauge_weights: Vec<GaugeWeight>,
    pub batch_records: Vec<BatchRecord>,
    pub aggregated_totals: Option<AggregatedTotals>,
}

impl MaterialDocument {
    /// 解析為執行期物料（遷移步驟，整份文件只執行一次）
    pub fn resolve(self) -> Result<Material> {
        let mut batches = Vec::with_capacity(self.batch_records.len());
        for record in self.batch_records {
            batches.push(record.resolve()?);
        }
        Ok(Material {
            id: self.id,
            name: self.name,
            category: self.category,
            stock_unit: self.stock_unit,
            usage_unit: self.usage_unit,
            standard_lengths: self.standard_lengths,
            gauge_weights: self.gauge_weights,
            batches,
            aggregated_totals: self.aggregated_totals,
        })
    }
}

/// 型錄查詢（唯讀協作邊界）
///
/// 計劃端只透過此介面取得物料主檔，不直接觸及庫存儲存層。
pub trait Catalog {
    /// 取得物料快照
    fn material(&self, material_id: &str) -> Option<Material>;
}

impl Catalog for std::collections::HashMap<String, Material> {
    fn material(&self, material_id: &str) -> Option<Material> {
        self.get(material_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{LegacyBatch, ProfileBatch};
    use chrono::NaiveDate;

    #[test]
    fn test_material_builder() {
        let material = Material::new(
            "ALU-PIPE-25".to_string(),
            "25mm 鋁方管".to_string(),
            MaterialCategory::Profile,
        )
        .with_units("pcs".to_string(), "ft".to_string())
        .with_standard_lengths(vec![
            Length::feet(Decimal::from(12)),
            Length::feet(Decimal::from(16)),
        ])
        .with_gauge_weight("1.2mm".to_string(), Decimal::new(45, 2));

        assert!(material.category.tracks_standard_lengths());
        assert_eq!(material.standard_lengths.len(), 2);
        assert_eq!(
            material.weight_per_meter("1.2mm"),
            Some(Decimal::new(45, 2))
        );
        assert_eq!(material.weight_per_meter("2.0mm"), None);
    }

    #[test]
    fn test_document_resolve_migrates_legacy() {
        let doc = MaterialDocument {
            id: "ALU-PIPE-25".to_string(),
            name: "25mm 鋁方管".to_string(),
            category: MaterialCategory::Profile,
            stock_unit: "pcs".to_string(),
            usage_unit: "ft".to_string(),
            standard_lengths: vec![Length::feet(Decimal::from(16))],
            gauge_weights: vec![],
            batch_records: vec![
                BatchRecord::V2(StockBatch::Profile(ProfileBatch::new(
                    Length::feet(Decimal::from(16)),
                    "1.2mm".to_string(),
                    4,
                    Decimal::from(900),
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                ))),
                BatchRecord::Legacy(LegacyBatch {
                    batch_id: None,
                    length_ft: Some(Decimal::from(16)),
                    gauge: Some("1.2mm".to_string()),
                    quantity: Decimal::from(6),
                    rate: Decimal::from(880),
                    weight: None,
                    purchase_date: None,
                    supplier: None,
                }),
            ],
            aggregated_totals: None,
        };

        let material = doc.resolve().unwrap();
        assert_eq!(material.batches.len(), 2);
        assert!(material
            .batches
            .iter()
            .all(|b| matches!(b, StockBatch::Profile(_))));
    }

    #[test]
    fn test_catalog_trait_on_hashmap() {
        let mut map = std::collections::HashMap::new();
        map.insert(
            "GLASS-5MM".to_string(),
            Material::new(
                "GLASS-5MM".to_string(),
                "5mm 清玻璃".to_string(),
                MaterialCategory::Simple,
            ),
        );

        assert!(map.material("GLASS-5MM").is_some());
        assert!(map.material("MISSING").is_none());
    }
}
