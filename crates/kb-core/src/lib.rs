// kb-core/src/lib.rs
//! 知识库索引与搜索核心库
//!
//! 将一个目录下的笔记读入内存并提供加权子串搜索：
//! - 元数据提取（标题、标签、分类）
//! - 启动/重建时的全量扫描
//! - 基于文件监控的增量同步，同一路径按事件发出顺序生效
//! - 相关度 / 日期 / 大小排序与分页

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod models;
pub mod querylog;
pub mod registry;
pub mod scanner;
pub mod search;
pub mod store;
pub mod watcher;

// 重导出核心类型
pub use config::{KbConfig, SearchDefaults, WalkerConfig};
pub use error::{KbError, Result};
pub use extract::parse_note;
pub use indexer::IndexOutcome;
pub use models::{
    Document, Match, MatchKind, NoteMetadata, SearchHit, SearchOptions, SearchResults, SortBy,
    Stats,
};
pub use querylog::{SearchLog, SearchLogEntry};
pub use registry::{FileRegistry, FileState, Ticket};
pub use scanner::{NoteFilter, ScanReport};
pub use store::IndexStore;
pub use watcher::{FileWatcher, WatchEvent, WatchEventKind};

/// 知识库统一入口
///
/// 显式构造，持有索引存储、文件注册表和配置；测试中可以各自独立创建。
pub struct KnowledgeBase {
    root: PathBuf,
    config: KbConfig,
    store: IndexStore,
    registry: FileRegistry,
    filter: NoteFilter,
    reindex_gate: tokio::sync::Mutex<()>,
}

impl KnowledgeBase {
    /// 创建知识库实例，根目录必须存在
    pub fn new(config: KbConfig) -> Result<Self> {
        let root = config
            .root
            .canonicalize()
            .map_err(|e| KbError::io(&config.root, e))?;
        let filter = NoteFilter::new(&config);

        tracing::info!("知识库根目录: {:?}", root);

        Ok(Self {
            root,
            filter,
            config,
            store: IndexStore::new(),
            registry: FileRegistry::new(),
            reindex_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &NoteFilter {
        &self.filter
    }

    /// 绝对路径转换为索引键：相对根目录，分隔符为 `/`
    pub fn relative_key(&self, path: &Path) -> Result<String> {
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| KbError::OutsideRoot(path.to_path_buf()))?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(KbError::OutsideRoot(path.to_path_buf())),
            }
        }
        Ok(parts.join("/"))
    }

    /// 按相对路径查询文档
    pub fn get(&self, key: &str) -> Result<Arc<Document>> {
        self.store
            .get(key)
            .ok_or_else(|| KbError::NotFound(key.to_string()))
    }

    /// 在当前快照上执行搜索
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        search::validate_query(query)?;
        let snapshot = self.store.all();
        search::search(query, options, &snapshot, &self.config.search)
    }

    pub fn categories(&self) -> Vec<String> {
        self.store.categories()
    }

    pub fn tags(&self) -> Vec<String> {
        self.store.tags()
    }

    pub fn stats(&self) -> Stats {
        self.store.stats()
    }
}
