// kb-core/src/registry.rs
//! 文件注册表 - 协调扫描和监听对同一路径的写入顺序
//!
//! 每次针对某个路径的操作（扫描、新增、修改、删除）开始前先领取一张
//! [`Ticket`]，其中的代数单调递增。提交结果时只有持有该路径最新代数的
//! 操作才会生效，晚发出的事件总是覆盖早发出的事件，与完成顺序无关。
//! 删除提交后路径不再被跟踪，注册表大小随当前存在的笔记数变化。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 单个路径的状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileState {
    /// 最近一次发出的代数
    pub issued: u64,
    /// 最近一次成功提交的代数
    pub committed: u64,
}

impl FileState {
    pub fn in_flight(&self) -> bool {
        self.issued != self.committed
    }
}

/// 某路径上一次操作的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    pub generation: u64,
}

/// 文件注册表 - 线程安全的路径代数管理
#[derive(Clone, Default)]
pub struct FileRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    files: HashMap<String, FileState>,
    next_generation: u64,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为路径领取新的代数，之前领取的凭据随即失效
    pub fn issue(&self, key: &str) -> Ticket {
        let mut inner = self.lock();
        inner.next_generation += 1;
        let generation = inner.next_generation;
        inner.files.entry(key.to_string()).or_default().issued = generation;
        Ticket {
            key: key.to_string(),
            generation,
        }
    }

    /// 为目录 `dir` 下所有已跟踪的路径领取新代数
    pub fn issue_under(&self, dir: &str) -> Vec<Ticket> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .files
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();

        let mut tickets = Vec::with_capacity(keys.len());
        for key in keys {
            inner.next_generation += 1;
            let generation = inner.next_generation;
            if let Some(state) = inner.files.get_mut(&key) {
                state.issued = generation;
            }
            tickets.push(Ticket { key, generation });
        }
        tickets
    }

    /// 凭据仍然有效时执行 `apply` 并记为已提交；过期凭据返回 `None`
    ///
    /// `apply` 在注册表锁内执行，检查与写入之间不会插入同一路径的新凭据。
    pub fn commit<R>(&self, ticket: &Ticket, apply: impl FnOnce() -> R) -> Option<R> {
        let mut inner = self.lock();
        Self::commit_locked(&mut inner, ticket, apply)
    }

    /// 与 [`commit`](Self::commit) 相同，成功后不再跟踪该路径
    ///
    /// 提交成功时该路径没有进行中的操作，更早的凭据在条目移除后同样被拒绝。
    pub fn commit_removal<R>(&self, ticket: &Ticket, apply: impl FnOnce() -> R) -> Option<R> {
        let mut inner = self.lock();
        let result = Self::commit_locked(&mut inner, ticket, apply)?;
        inner.files.remove(&ticket.key);
        Some(result)
    }

    fn commit_locked<R>(
        inner: &mut RegistryInner,
        ticket: &Ticket,
        apply: impl FnOnce() -> R,
    ) -> Option<R> {
        let state = inner.files.get_mut(&ticket.key)?;
        if state.issued != ticket.generation {
            tracing::debug!(
                "丢弃过期结果: {} (代数 {} < {})",
                ticket.key,
                ticket.generation,
                state.issued
            );
            return None;
        }
        let result = apply();
        state.committed = ticket.generation;
        Some(result)
    }

    /// 放弃一张凭据（提取失败时），路径保持上一次提交的状态
    pub fn abandon(&self, ticket: &Ticket) {
        let mut inner = self.lock();
        if let Some(state) = inner.files.get_mut(&ticket.key) {
            if state.issued == ticket.generation {
                state.committed = ticket.generation;
            }
        }
    }

    /// 获取统计信息：(跟踪的路径数, 进行中的操作数)
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.lock();
        let in_flight = inner.files.values().filter(|s| s.in_flight()).count();
        (inner.files.len(), in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_ticket_wins_regardless_of_completion_order() {
        let registry = FileRegistry::new();
        let mut value = "absent";

        let first = registry.issue("a/x.md");
        let second = registry.issue("a/x.md");

        // 后发出的先完成
        assert_eq!(registry.commit(&second, || value = "second"), Some(()));
        // 早发出的后完成，被丢弃
        assert_eq!(registry.commit(&first, || value = "first"), None);
        assert_eq!(value, "second");
    }

    #[test]
    fn test_paths_are_independent() {
        let registry = FileRegistry::new();
        let a = registry.issue("a.md");
        let b = registry.issue("b.md");
        assert!(registry.commit(&b, || ()).is_some());
        assert!(registry.commit(&a, || ()).is_some());
    }

    #[test]
    fn test_stats_track_in_flight() {
        let registry = FileRegistry::new();
        let a = registry.issue("a.md");
        let _b = registry.issue("b.md");
        assert_eq!(registry.stats(), (2, 2));

        registry.commit(&a, || ());
        assert_eq!(registry.stats(), (2, 1));
    }

    #[test]
    fn test_abandon_only_settles_current_ticket() {
        let registry = FileRegistry::new();
        let old = registry.issue("a.md");
        let new = registry.issue("a.md");
        registry.abandon(&old);
        assert_eq!(registry.stats(), (1, 1));
        registry.abandon(&new);
        assert_eq!(registry.stats(), (1, 0));
    }

    #[test]
    fn test_issue_under_supersedes_children() {
        let registry = FileRegistry::new();
        let child = registry.issue("dir/a.md");
        let _other = registry.issue("dirx/b.md");

        let tickets = registry.issue_under("dir");
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].key, "dir/a.md");
        assert!(registry.commit(&child, || ()).is_none());
        assert!(registry.commit(&tickets[0], || ()).is_some());
    }

    #[test]
    fn test_unknown_ticket_is_rejected() {
        let registry = FileRegistry::new();
        let foreign = Ticket {
            key: "never-issued.md".to_string(),
            generation: 1,
        };
        assert!(registry.commit(&foreign, || ()).is_none());
    }

    #[test]
    fn test_committed_removal_stops_tracking_path() {
        let registry = FileRegistry::new();
        let created = registry.issue("a.md");
        let removed = registry.issue("a.md");
        let _other = registry.issue("b.md");

        assert_eq!(registry.commit_removal(&removed, || "gone"), Some("gone"));
        assert_eq!(registry.stats(), (1, 1));
        // 删除前发出的凭据仍被拒绝
        assert!(registry.commit(&created, || ()).is_none());
        assert_eq!(registry.stats(), (1, 1));

        // 再次出现的路径重新开始跟踪
        let recreated = registry.issue("a.md");
        assert!(registry.commit(&recreated, || ()).is_some());
        assert_eq!(registry.stats(), (2, 1));
    }

    #[test]
    fn test_stale_removal_keeps_path_tracked() {
        let registry = FileRegistry::new();
        let removed = registry.issue("a.md");
        let updated = registry.issue("a.md");

        assert!(registry.commit_removal(&removed, || ()).is_none());
        assert!(registry.commit(&updated, || ()).is_some());
        assert_eq!(registry.stats(), (1, 0));
    }
}
