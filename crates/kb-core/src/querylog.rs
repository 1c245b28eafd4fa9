// kb-core/src/querylog.rs
//! 搜索日志 - 有界的最近查询记录，超出容量时丢弃最早的记录

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一条搜索记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub results_count: usize,
    /// 发起查询的客户端地址，本地调用时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

#[derive(Debug)]
pub struct SearchLog {
    capacity: usize,
    entries: Mutex<VecDeque<SearchLogEntry>>,
}

impl SearchLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SearchLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 记录一次查询
    pub fn record(&self, query: &str, results_count: usize, client: Option<String>) {
        tracing::info!(
            "[搜索日志] 查询: '{}', 结果: {}, 客户端: {}",
            query,
            results_count,
            client.as_deref().unwrap_or("-")
        );

        if self.capacity == 0 {
            return;
        }

        let entry = SearchLogEntry {
            query: query.to_string(),
            timestamp: Utc::now(),
            results_count,
            client,
        };

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// 最近的 `limit` 条记录，按时间先后排列
    pub fn recent(&self, limit: usize) -> Vec<SearchLogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
