//! 切割最佳化
//!
//! 把單一物料/規格群組的切割需求指派到標準長度原料管上，
//! 目標是最小化餘料。純函數：相同輸入必得相同輸出。
//!
//! 演算法為最佳適配遞減（best-fit-decreasing）：
//! 1. 需求展開為切割序列，按長度遞減排序（大件先放，減少碎裂）。
//! 2. 每一刀先嘗試放入已開管中剩餘容量最小且仍可容納者；
//!    剩餘容量相同時取最早開管者，維持穩定輸出。
//! 3. 無管可放時開新管。開管的標準長度以前瞻評分選定：
//!    對每個候選長度，用「現有開管吃不下的後續切割」做貪婪試填，
//!    取模擬餘料最小者（同分取較短標準長度）。
//! 4. 收管後逐管計算餘料；型材另按規格參考重量計算重量。

use cutplan_core::plan::{CutBreakdown, MaterialPlan, PipeUsed};
use cutplan_core::unit::round_weight;
use cutplan_core::{Length, MaterialCategory, PlanError, RequiredCut, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 單一物料/規格群組的規劃輸入
#[derive(Debug, Clone)]
pub struct CutGroup {
    /// 物料ID
    pub material_id: String,

    /// 規格
    pub gauge: Option<String>,

    /// 物料類別
    pub category: MaterialCategory,

    /// 可用標準長度目錄
    pub standard_lengths: Vec<Length>,

    /// 每公尺參考重量（kg/m，僅型材）
    pub weight_per_meter: Option<Decimal>,

    /// 需求切割 (長度, 支數)
    pub cuts: Vec<(Length, u32)>,
}

impl CutGroup {
    /// 由需求列表建立群組
    pub fn from_cuts(
        material_id: String,
        gauge: Option<String>,
        category: MaterialCategory,
        standard_lengths: Vec<Length>,
        cuts: &[RequiredCut],
    ) -> Self {
        Self {
            material_id,
            gauge,
            category,
            standard_lengths,
            weight_per_meter: None,
            cuts: cuts
                .iter()
                .map(|c| (c.cut_length, c.quantity_needed))
                .collect(),
        }
    }

    /// 建構器模式：設置參考重量
    pub fn with_weight_per_meter(mut self, weight_per_meter: Decimal) -> Self {
        self.weight_per_meter = Some(weight_per_meter);
        self
    }
}

/// 規劃中的開管
struct OpenPipe {
    standard: Length,
    remaining_mm: Decimal,
    cuts: Vec<Length>,
}

/// 切割最佳化器
pub struct CutPlanner;

impl CutPlanner {
    /// 對單一群組執行切割規劃
    pub fn plan(group: &CutGroup) -> Result<MaterialPlan> {
        // 展開需求為遞減切割序列
        let mut expanded: Vec<Length> = Vec::new();
        for &(length, qty) in &group.cuts {
            for _ in 0..qty {
                expanded.push(length);
            }
        }
        expanded.sort_by(|a, b| b.to_mm().cmp(&a.to_mm()));

        if expanded.is_empty() {
            return Ok(MaterialPlan {
                material_id: group.material_id.clone(),
                gauge: group.gauge.clone(),
                pipes_used: Vec::new(),
                total_weight: Decimal::ZERO,
                total_scrap_weight: Decimal::ZERO,
            });
        }

        // 標準長度遞增排序、去重
        let mut standards: Vec<Length> = group.standard_lengths.clone();
        standards.sort();
        standards.dedup_by(|a, b| a.to_mm() == b.to_mm());
        if standards.is_empty() {
            return Err(PlanError::NoStandardLengths(group.material_id.clone()));
        }
        let max_standard_mm = standards.last().map(|l| l.to_mm()).unwrap_or_default();

        let mut pipes: Vec<OpenPipe> = Vec::new();

        for idx in 0..expanded.len() {
            let cut = expanded[idx];
            let cut_mm = cut.to_mm();

            if cut_mm > max_standard_mm {
                return Err(PlanError::CutTooLong {
                    material_id: group.material_id.clone(),
                    gauge: group.gauge.clone(),
                    cut_length_mm: cut_mm,
                    max_standard_mm,
                });
            }

            // 最佳適配：剩餘容量最小且可容納；同容量取最早開管
            let mut best: Option<usize> = None;
            for (i, pipe) in pipes.iter().enumerate() {
                if pipe.remaining_mm >= cut_mm
                    && best.map_or(true, |b| pipe.remaining_mm < pipes[b].remaining_mm)
                {
                    best = Some(i);
                }
            }

            let target = match best {
                Some(i) => i,
                None => {
                    let standard =
                        Self::choose_standard(cut_mm, &pipes, &expanded[idx + 1..], &standards);
                    pipes.push(OpenPipe {
                        standard,
                        remaining_mm: standard.to_mm(),
                        cuts: Vec::new(),
                    });
                    pipes.len() - 1
                }
            };

            pipes[target].remaining_mm -= cut_mm;
            pipes[target].cuts.push(cut);
        }

        Ok(Self::assemble(group, pipes))
    }

    /// 開新管時的標準長度前瞻評分
    ///
    /// 後續切割先對現有開管做試算認領（這些切割遲早由開管吸收），
    /// 剩下無處可去的切割才參與候選長度的貪婪試填；
    /// 取模擬餘料最小的候選，同分取較短者。
    fn choose_standard(
        cut_mm: Decimal,
        pipes: &[OpenPipe],
        upcoming: &[Length],
        standards_asc: &[Length],
    ) -> Length {
        // 試算認領：最佳適配進現有開管的剩餘容量
        let mut claimable: Vec<Decimal> = pipes.iter().map(|p| p.remaining_mm).collect();
        let mut unclaimed: Vec<Decimal> = Vec::new();
        for c in upcoming {
            let c_mm = c.to_mm();
            let mut best: Option<usize> = None;
            for (i, &rem) in claimable.iter().enumerate() {
                if rem >= c_mm && best.map_or(true, |b| rem < claimable[b]) {
                    best = Some(i);
                }
            }
            match best {
                Some(i) => claimable[i] -= c_mm,
                None => unclaimed.push(c_mm),
            }
        }

        // 呼叫端已保證 cut_mm ≤ 最大標準長度，至少有一個候選
        let mut chosen: Option<(Decimal, Length)> = None;
        for &standard in standards_asc {
            let standard_mm = standard.to_mm();
            if standard_mm < cut_mm {
                continue;
            }
            let mut rem = standard_mm - cut_mm;
            for &c_mm in &unclaimed {
                if c_mm <= rem {
                    rem -= c_mm;
                }
            }
            let better = match chosen {
                Some((best_scrap, _)) => rem < best_scrap,
                None => true,
            };
            if better {
                chosen = Some((rem, standard));
            }
        }

        match chosen {
            Some((_, s)) => s,
            None => standards_asc[standards_asc.len() - 1],
        }
    }

    /// 收管並按 (標準長度, 切割樣式) 聚合
    fn assemble(group: &CutGroup, pipes: Vec<OpenPipe>) -> MaterialPlan {
        let weight_per_meter = match group.category {
            MaterialCategory::Profile => group.weight_per_meter.unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        };

        // 聚合鍵：標準長度毫米值 + 單支切割樣式（遞減）
        let mut groups: BTreeMap<(Decimal, Vec<Decimal>), (Length, Vec<Length>, u32)> =
            BTreeMap::new();
        for pipe in pipes {
            let mut pattern = pipe.cuts.clone();
            pattern.sort_by(|a, b| b.to_mm().cmp(&a.to_mm()));
            let key = (
                pipe.standard.to_mm(),
                pattern.iter().map(|l| l.to_mm()).collect(),
            );
            groups
                .entry(key)
                .and_modify(|(_, _, count)| *count += 1)
                .or_insert((pipe.standard, pattern, 1));
        }

        let mut pipes_used: Vec<PipeUsed> = Vec::new();
        let mut total_weight = Decimal::ZERO;
        let mut total_scrap_weight = Decimal::ZERO;

        // 輸出按標準長度遞減
        for (_, (standard, pattern, count)) in groups.into_iter().rev() {
            let used_mm: Decimal = pattern.iter().map(|l| l.to_mm()).sum();
            let scrap_mm = standard.to_mm() - used_mm;

            let mut cuts_made: Vec<CutBreakdown> = Vec::new();
            for cut in &pattern {
                match cuts_made.iter_mut().find(|c| c.cut_length == *cut) {
                    Some(entry) => entry.count += 1,
                    None => cuts_made.push(CutBreakdown {
                        cut_length: *cut,
                        count: 1,
                    }),
                }
            }

            let pipe_weight =
                round_weight(standard.to_meters() * weight_per_meter);
            let scrap_weight =
                round_weight(scrap_mm / Decimal::from(1000) * weight_per_meter);

            total_weight += pipe_weight * Decimal::from(count);
            total_scrap_weight += scrap_weight * Decimal::from(count);

            pipes_used.push(PipeUsed {
                standard_length: standard,
                pipe_count: count,
                cuts_made,
                scrap_generated: Length::from_mm(scrap_mm, standard.unit),
                calculated_weight: pipe_weight,
            });
        }

        MaterialPlan {
            material_id: group.material_id.clone(),
            gauge: group.gauge.clone(),
            pipes_used,
            total_weight,
            total_scrap_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ft(v: u32) -> Length {
        Length::feet(Decimal::from(v))
    }

    fn profile_group(standards: &[u32], cuts: &[(u32, u32)]) -> CutGroup {
        CutGroup {
            material_id: "ALU-PIPE-25".to_string(),
            gauge: Some("1.2mm".to_string()),
            category: MaterialCategory::Profile,
            standard_lengths: standards.iter().map(|&s| ft(s)).collect(),
            weight_per_meter: Some(Decimal::new(45, 2)), // 0.45 kg/m
            cuts: cuts.iter().map(|&(l, q)| (ft(l), q)).collect(),
        }
    }

    /// 驗證守恆：指派的切割總數與總長等於需求
    fn assert_conservation(plan: &MaterialPlan, cuts: &[(u32, u32)]) {
        let expected_count: u32 = cuts.iter().map(|&(_, q)| q).sum();
        assert_eq!(plan.total_cut_count(), expected_count);

        let expected_mm: Decimal = cuts
            .iter()
            .map(|&(l, q)| ft(l).to_mm() * Decimal::from(q))
            .sum();
        let assigned_mm: Decimal = plan
            .pipes_used
            .iter()
            .map(|p| {
                p.cuts_made
                    .iter()
                    .map(|c| c.cut_length.to_mm() * Decimal::from(c.count))
                    .sum::<Decimal>()
                    * Decimal::from(p.pipe_count)
            })
            .sum();
        assert_eq!(assigned_mm, expected_mm);
    }

    #[test]
    fn test_single_exact_fit() {
        let plan = CutPlanner::plan(&profile_group(&[12], &[(12, 1)])).unwrap();
        assert_eq!(plan.total_pipe_count(), 1);
        assert_eq!(plan.pipes_used[0].scrap_generated.to_mm(), Decimal::ZERO);
    }

    #[test]
    fn test_reference_scenario_minimal_scrap() {
        // 標準 [12ft, 16ft]，需求 10ft×3 + 6ft×2：
        // 期望兩支 16ft 各放 {10,6}（零餘料）、一支 12ft 放 {10}（餘 2ft）
        let plan = CutPlanner::plan(&profile_group(&[12, 16], &[(10, 3), (6, 2)])).unwrap();
        assert_conservation(&plan, &[(10, 3), (6, 2)]);
        assert_eq!(plan.total_pipe_count(), 3);

        let sixteen = plan
            .pipes_used
            .iter()
            .find(|p| p.standard_length == ft(16))
            .unwrap();
        assert_eq!(sixteen.pipe_count, 2);
        assert_eq!(sixteen.scrap_generated.to_mm(), Decimal::ZERO);
        assert_eq!(sixteen.cuts_made.len(), 2);

        let twelve = plan
            .pipes_used
            .iter()
            .find(|p| p.standard_length == ft(12))
            .unwrap();
        assert_eq!(twelve.pipe_count, 1);
        assert_eq!(twelve.scrap_generated, ft(2));

        // 總餘料 2ft，為此輸入的最佳適配遞減最小值
        assert_eq!(plan.total_scrap_mm(), ft(2).to_mm());
    }

    #[test]
    fn test_cut_too_long() {
        let err = CutPlanner::plan(&profile_group(&[12, 16], &[(18, 1)])).unwrap_err();
        match err {
            PlanError::CutTooLong {
                cut_length_mm,
                max_standard_mm,
                ..
            } => {
                assert_eq!(cut_length_mm, ft(18).to_mm());
                assert_eq!(max_standard_mm, ft(16).to_mm());
            }
            other => panic!("預期 CutTooLong，得到 {other:?}"),
        }
    }

    #[test]
    fn test_no_standard_lengths() {
        let err = CutPlanner::plan(&profile_group(&[], &[(4, 1)])).unwrap_err();
        assert!(matches!(err, PlanError::NoStandardLengths(_)));
    }

    #[test]
    fn test_empty_demand_yields_empty_plan() {
        let plan = CutPlanner::plan(&profile_group(&[12], &[])).unwrap();
        assert!(plan.pipes_used.is_empty());
        assert_eq!(plan.total_weight, Decimal::ZERO);
    }

    #[test]
    fn test_deterministic_output() {
        let group = profile_group(&[12, 16], &[(7, 4), (5, 3), (3, 6)]);
        let a = CutPlanner::plan(&group).unwrap();
        let b = CutPlanner::plan(&group).unwrap();
        assert_eq!(a.total_pipe_count(), b.total_pipe_count());
        assert_eq!(a.total_scrap_mm(), b.total_scrap_mm());
        for (pa, pb) in a.pipes_used.iter().zip(b.pipes_used.iter()) {
            assert_eq!(pa.standard_length, pb.standard_length);
            assert_eq!(pa.pipe_count, pb.pipe_count);
            assert_eq!(pa.cuts_made, pb.cuts_made);
        }
    }

    #[test]
    fn test_profile_weight_from_gauge_reference() {
        // 一支 16ft = 4.8768 m，0.45 kg/m → 2.195 kg（捨入至 3 位）
        let plan = CutPlanner::plan(&profile_group(&[16], &[(16, 1)])).unwrap();
        assert_eq!(plan.pipes_used[0].calculated_weight.to_string(), "2.195");
        assert_eq!(plan.total_scrap_weight, Decimal::ZERO);
    }

    #[test]
    fn test_non_profile_weight_is_zero() {
        let group = CutGroup {
            category: MaterialCategory::WireMesh,
            gauge: None,
            weight_per_meter: None,
            ..profile_group(&[12, 16], &[(10, 2)])
        };
        let plan = CutPlanner::plan(&group).unwrap();
        assert_eq!(plan.total_weight, Decimal::ZERO);
        assert_eq!(plan.total_scrap_weight, Decimal::ZERO);
    }

    proptest! {
        /// 守恆性質：任意需求下，指派切割總數與總長恆等於需求
        #[test]
        fn prop_conservation(
            cuts in proptest::collection::vec((1u32..=16, 1u32..=6), 1..8)
        ) {
            let group = profile_group(&[12, 16], &cuts);
            let plan = CutPlanner::plan(&group).unwrap();
            assert_conservation(&plan, &cuts);
        }

        /// 餘料性質：每支原料管的餘料恆 ≥ 0
        #[test]
        fn prop_scrap_non_negative(
            cuts in proptest::collection::vec((1u32..=16, 1u32..=6), 1..8)
        ) {
            let group = profile_group(&[12, 16], &cuts);
            let plan = CutPlanner::plan(&group).unwrap();
            for pipe in &plan.pipes_used {
                prop_assert!(pipe.scrap_generated.to_mm() >= Decimal::ZERO);
                let used: Decimal = pipe
                    .cuts_made
                    .iter()
                    .map(|c| c.cut_length.to_mm() * Decimal::from(c.count))
                    .sum();
                prop_assert_eq!(
                    pipe.standard_length.to_mm() - used,
                    pipe.scrap_generated.to_mm()
                );
            }
        }

        /// 超長性質：需求含超過最大標準長度的切割時必回 CutTooLong
        #[test]
        fn prop_cut_too_long_iff_oversize(len in 17u32..=40) {
            let group = profile_group(&[12, 16], &[(len, 1)]);
            let err = CutPlanner::plan(&group).unwrap_err();
            let too_long = matches!(err, PlanError::CutTooLong { .. });
            prop_assert!(too_long);
        }
    }
}
