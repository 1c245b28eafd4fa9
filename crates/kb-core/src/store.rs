// kb-core/src/store.rs
//! 索引存储 - 路径到文档的内存映射
//!
//! 每个操作只在单个键上原子：读者不会看到写了一半的文档，
//! 但跨键没有事务保证。

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::models::{Document, Stats};

#[derive(Debug)]
pub struct IndexStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    docs: HashMap<String, Arc<Document>>,
    last_updated: DateTime<Utc>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                docs: HashMap::new(),
                last_updated: Utc::now(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 插入或替换，返回被替换的旧文档
    pub fn upsert(&self, doc: Document) -> Option<Arc<Document>> {
        let mut inner = self.write();
        inner.last_updated = Utc::now();
        inner.docs.insert(doc.path.clone(), Arc::new(doc))
    }

    /// 不存在时什么也不做
    pub fn remove(&self, path: &str) -> Option<Arc<Document>> {
        let mut inner = self.write();
        let removed = inner.docs.remove(path);
        if removed.is_some() {
            inner.last_updated = Utc::now();
        }
        removed
    }

    /// 删除目录 `dir` 下的所有文档，返回删除数量
    pub fn remove_prefix(&self, dir: &str) -> usize {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let mut inner = self.write();
        let before = inner.docs.len();
        inner.docs.retain(|path, _| !path.starts_with(&prefix));
        let removed = before - inner.docs.len();
        if removed > 0 {
            inner.last_updated = Utc::now();
        }
        removed
    }

    pub fn get(&self, path: &str) -> Option<Arc<Document>> {
        self.read().docs.get(path).cloned()
    }

    /// 当前所有文档的快照
    pub fn all(&self) -> Vec<Arc<Document>> {
        self.read().docs.values().cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.write();
        inner.docs.clear();
        inner.last_updated = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 去重后的分类列表（升序）
    pub fn categories(&self) -> Vec<String> {
        let inner = self.read();
        let set: BTreeSet<&str> = inner.docs.values().map(|d| d.category.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// 去重后的标签列表（升序）
    pub fn tags(&self) -> Vec<String> {
        let inner = self.read();
        let set: BTreeSet<&str> = inner
            .docs
            .values()
            .flat_map(|d| d.tags.iter().map(String::as_str))
            .collect();
        set.into_iter().map(String::from).collect()
    }

    pub fn stats(&self) -> Stats {
        let inner = self.read();
        let categories: BTreeSet<&str> = inner.docs.values().map(|d| d.category.as_str()).collect();
        let tags: BTreeSet<&str> = inner
            .docs
            .values()
            .flat_map(|d| d.tags.iter().map(String::as_str))
            .collect();
        Stats {
            total_files: inner.docs.len(),
            total_size: inner.docs.values().map(|d| d.size).sum(),
            categories: categories.len(),
            tags: tags.len(),
            last_updated: inner.last_updated,
        }
    }
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteMetadata;

    fn doc(path: &str, category: &str, tags: &[&str], content: &str) -> Document {
        Document::new(
            path,
            NoteMetadata {
                title: path.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                category: category.to_string(),
            },
            content.to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_upsert_replaces() {
        let store = IndexStore::new();
        assert!(store.upsert(doc("a/x.md", "a", &[], "v1")).is_none());
        let old = store.upsert(doc("a/x.md", "a", &[], "v2")).unwrap();
        assert_eq!(old.content, "v1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a/x.md").unwrap().content, "v2");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = IndexStore::new();
        store.upsert(doc("a/x.md", "a", &[], ""));
        let stamp = store.stats().last_updated;
        assert!(store.remove("missing.md").is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().last_updated, stamp);
        assert!(store.remove("a/x.md").is_some());
        assert!(store.get("a/x.md").is_none());
    }

    #[test]
    fn test_remove_prefix_only_matches_directory() {
        let store = IndexStore::new();
        store.upsert(doc("a/x.md", "a", &[], ""));
        store.upsert(doc("a/sub/y.md", "a", &[], ""));
        store.upsert(doc("ab/z.md", "ab", &[], ""));
        assert_eq!(store.remove_prefix("a"), 2);
        assert!(store.get("ab/z.md").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_listings_are_deduplicated() {
        let store = IndexStore::new();
        store.upsert(doc("b/1.md", "b", &["rust", "notes"], "12345"));
        store.upsert(doc("a/2.md", "a", &["rust"], "123"));
        store.upsert(doc("a/3.md", "a", &[], ""));

        assert_eq!(store.categories(), vec!["a", "b"]);
        assert_eq!(store.tags(), vec!["notes", "rust"]);

        let stats = store.stats();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size, 8);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.tags, 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = IndexStore::new();
        store.upsert(doc("a/x.md", "a", &[], "old"));
        let snapshot = store.all();
        store.upsert(doc("a/x.md", "a", &[], "new"));
        store.clear();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "old");
        assert!(store.is_empty());
    }
}
