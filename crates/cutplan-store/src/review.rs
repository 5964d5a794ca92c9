//! 人工覆核佇列
//!
//! 彙總重算發現不一致的物料在此掛旗，掛旗期間凍結消耗，
//! 直到人工修正批次資料並解旗。

use std::collections::HashSet;

/// 覆核旗標佇列
pub struct ReviewQueue {
    flagged_materials: HashSet<String>,
}

impl ReviewQueue {
    /// 創建新的佇列
    pub fn new() -> Self {
        Self {
            flagged_materials: HashSet::new(),
        }
    }

    /// 掛旗物料（凍結消耗）
    pub fn flag(&mut self, material_id: String) {
        self.flagged_materials.insert(material_id);
    }

    /// 檢查物料是否掛旗
    pub fn is_flagged(&self, material_id: &str) -> bool {
        self.flagged_materials.contains(material_id)
    }

    /// 人工修正後解旗
    pub fn clear(&mut self, material_id: &str) {
        self.flagged_materials.remove(material_id);
    }

    /// 取得所有掛旗物料（排序）
    pub fn flagged(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.flagged_materials.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for ReviewQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_and_clear() {
        let mut queue = ReviewQueue::new();
        queue.flag("ALU-PIPE-25".to_string());
        assert!(queue.is_flagged("ALU-PIPE-25"));
        assert!(!queue.is_flagged("GLASS-5MM"));

        queue.clear("ALU-PIPE-25");
        assert!(!queue.is_flagged("ALU-PIPE-25"));
    }

    #[test]
    fn test_flagged_sorted() {
        let mut queue = ReviewQueue::new();
        queue.flag("B-MAT".to_string());
        queue.flag("A-MAT".to_string());
        assert_eq!(queue.flagged(), vec!["A-MAT", "B-MAT"]);
    }
}
