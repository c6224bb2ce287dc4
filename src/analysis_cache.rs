//! Process-lifetime memoization of analysis results.
//!
//! Entries are never evicted or invalidated. Two requests racing on the same
//! missing asset both compute a result and the last `put` wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::analysis::AnalysisResult;

#[derive(Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<String, Arc<AnalysisResult>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, asset_id: &str) -> Option<Arc<AnalysisResult>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(asset_id).cloned()
    }

    pub fn put(&self, asset_id: &str, result: AnalysisResult) -> Arc<AnalysisResult> {
        let result = Arc::new(result);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(asset_id.to_string(), result.clone());
        result
    }

    /// Cached asset ids, sorted.
    pub fn asset_ids(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
