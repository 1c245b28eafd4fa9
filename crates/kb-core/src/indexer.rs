// kb-core/src/indexer.rs
//! 索引模块 - 读取笔记、提取元数据并写入索引存储
//!
//! 所有写入都先从 [`FileRegistry`](crate::registry::FileRegistry) 领取凭据，
//! 扫描和监控对同一路径的操作因此按发出顺序生效。

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::{KbError, Result};
use crate::extract::{parse_note, read_note_text};
use crate::models::Document;
use crate::registry::Ticket;
use crate::scanner;
use crate::KnowledgeBase;

/// 单个文件的索引结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// 已写入索引
    Indexed,
    /// 提取期间同一路径出现了更新的操作，本次结果被丢弃
    Superseded,
    /// 不是笔记或位于 ignore 目录中
    Skipped,
}

impl KnowledgeBase {
    /// 清空索引并重新扫描整个知识库，返回写入的文件数
    ///
    /// 重建期间查询可能看到部分为空的索引。
    pub async fn reindex(&self) -> Result<usize> {
        let _guard = self.reindex_gate.lock().await;

        tracing::info!("开始重新索引: {:?}", self.root);
        self.store.clear();

        let indexed = self.index_tree(&self.root).await?;

        let (tracked, in_flight) = self.registry.stats();
        tracing::info!(
            "索引完成，共索引 {} 个文件 (跟踪 {} 个路径，{} 个进行中)",
            indexed,
            tracked,
            in_flight
        );
        Ok(indexed)
    }

    /// 扫描目录 `dir` 并索引其中的笔记，返回写入的文件数
    pub async fn index_tree(&self, dir: &Path) -> Result<usize> {
        let walk_root = dir.to_path_buf();
        let config = self.config.clone();
        let report = tokio::task::spawn_blocking(move || scanner::scan(&walk_root, &config)).await?;

        let concurrency = self.config.index_concurrency.max(1);
        let outcomes: Vec<_> = stream::iter(report.files)
            .map(|path| async move {
                let outcome = self.index_path(&path).await;
                (path, outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut indexed = 0;
        for (path, outcome) in outcomes {
            match outcome {
                Ok(IndexOutcome::Indexed) => indexed += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!("索引文件失败 {:?}: {}", path, e),
            }
        }
        Ok(indexed)
    }

    /// 读取并索引单个文件
    ///
    /// 读取失败时路径保持上一次的索引状态，错误返回给调用方。
    pub async fn index_path(&self, path: &Path) -> Result<IndexOutcome> {
        match self.claim_note(path)? {
            Some(ticket) => self.index_claimed(path, ticket).await,
            None => Ok(IndexOutcome::Skipped),
        }
    }

    /// 为笔记领取凭据；不是笔记时返回 `None`
    ///
    /// 监控在分发事件时同步调用，使凭据顺序与事件顺序一致。
    pub fn claim_note(&self, path: &Path) -> Result<Option<Ticket>> {
        let key = self.relative_key(path)?;
        if !self.filter.is_note(Path::new(&key)) {
            return Ok(None);
        }
        Ok(Some(self.registry.issue(&key)))
    }

    /// 用已领取的凭据提取并提交
    pub async fn index_claimed(&self, path: &Path, ticket: Ticket) -> Result<IndexOutcome> {
        let key = ticket.key.clone();
        let doc = match self.load_document(path, &key).await {
            Ok(doc) => doc,
            Err(e) => {
                self.registry.abandon(&ticket);
                return Err(e);
            }
        };

        match self.registry.commit(&ticket, || self.store.upsert(doc)) {
            Some(_) => {
                tracing::info!("已索引: {}", key);
                Ok(IndexOutcome::Indexed)
            }
            None => Ok(IndexOutcome::Superseded),
        }
    }

    /// 从索引中删除单个文件，返回索引中是否存在过该文件
    pub fn remove_path(&self, path: &Path) -> Result<bool> {
        let key = self.relative_key(path)?;
        let ticket = self.registry.issue(&key);
        let removed = self
            .registry
            .commit_removal(&ticket, || self.store.remove(&key))
            .flatten()
            .is_some();
        if removed {
            tracing::info!("已从索引删除: {}", key);
        }
        Ok(removed)
    }

    /// 删除目录 `dir` 下的所有文档（目录被删除或移出知识库时）
    pub fn remove_tree(&self, dir: &Path) -> Result<usize> {
        let key = self.relative_key(dir)?;
        if key.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        for ticket in self.registry.issue_under(&key) {
            let committed = self
                .registry
                .commit_removal(&ticket, || self.store.remove(&ticket.key));
            if let Some(Some(_)) = committed {
                removed += 1;
            }
        }
        // 注册表之外的残留（理论上不存在）
        removed += self.store.remove_prefix(&key);

        if removed > 0 {
            tracing::info!("已从索引删除目录 {}: {} 个文件", key, removed);
        }
        Ok(removed)
    }

    async fn load_document(&self, path: &Path, key: &str) -> Result<Document> {
        let content = read_note_text(path).await?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| KbError::io(path, e))?;
        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());

        let meta = parse_note(&content, key, &self.config.uncategorized);
        Ok(Document::new(key, meta, content, DateTime::<Utc>::from(modified)))
    }
}
