//! 工坊切割規劃示例

use chrono::NaiveDate;
use cutplan::{
    Length, Material, MaterialCategory, MaterialStore, PlanningService, RequiredCut, StockBatch,
};
use cutplan_core::batch::ProfileBatch;
use rust_decimal::Decimal;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 工坊切割規劃示例 ===\n");

    // 建立庫存：25mm 鋁方管，12ft 與 16ft 各 10 支
    let store = Arc::new(MaterialStore::new());
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
    .with_gauge_weight("1.2mm".to_string(), Decimal::new(45, 2))
    .with_batch(StockBatch::Profile(ProfileBatch::new(
        Length::feet(Decimal::from(12)),
        "1.2mm".to_string(),
        10,
        Decimal::from(700),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    )))
    .with_batch(StockBatch::Profile(ProfileBatch::new(
        Length::feet(Decimal::from(16)),
        "1.2mm".to_string(),
        10,
        Decimal::from(850),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    )));
    store.insert_material(material)?;

    let service = PlanningService::new(store);

    // 訂單需求：10ft 三支 + 6ft 兩支
    let demand = vec![
        RequiredCut::new(
            "ALU-PIPE-25".to_string(),
            Length::feet(Decimal::from(10)),
            3,
        )
        .with_gauge("1.2mm".to_string()),
        RequiredCut::new(
            "ALU-PIPE-25".to_string(),
            Length::feet(Decimal::from(6)),
            2,
        )
        .with_gauge("1.2mm".to_string()),
    ];

    println!("需求清單:");
    for cut in &demand {
        println!(
            "  - 物料: {}, 長度: {}, 支數: {}",
            cut.material_id, cut.cut_length, cut.quantity_needed
        );
    }

    // 最佳化
    let outcome = service.optimize_cuts("SO-1001", &demand)?;
    println!("\n切割計劃（版本 {}）:", outcome.plan.version);
    for mp in &outcome.plan.material_plans {
        for pipe in &mp.pipes_used {
            let cuts: Vec<String> = pipe
                .cuts_made
                .iter()
                .map(|c| format!("{} ×{}", c.cut_length, c.count))
                .collect();
            println!(
                "  - {} ×{} 支: 切 [{}], 單支餘料 {}",
                pipe.standard_length,
                pipe.pipe_count,
                cuts.join(", "),
                pipe.scrap_generated
            );
        }
    }
    for warning in &outcome.warnings {
        println!("  ! {}", warning.message);
    }

    // 採購摘要
    println!("\n採購摘要:");
    for summary in service.pipe_order_summary("SO-1001")? {
        for line in &summary.lines {
            println!(
                "  - {} {} {} ×{} 支",
                summary.material_name, line.length, line.unit, line.quantity
            );
        }
    }

    // 提交：消耗庫存批次
    let receipt = service.commit_cuts("SO-1001", 1)?;
    println!("\n提交完成，消耗明細:");
    for consumption in &receipt.consumptions {
        for record in &consumption.records {
            println!(
                "  - 物料 {} 批次 {} 消耗 {} 支（進貨日 {}）",
                consumption.material_id,
                record.batch_id,
                record.quantity_consumed,
                record.purchase_date
            );
        }
    }
    println!("總成本: {}", receipt.total_cost());

    // 庫存報表
    println!("\n庫存報表:");
    for material in service.stock_report().materials {
        println!(
            "  - {} 現存 {}，總值 {}",
            material.name, material.totals.total_current_stock, material.totals.total_current_value
        );
    }

    Ok(())
}
