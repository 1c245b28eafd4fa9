// kb-core/src/models.rs
//! 数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已索引的笔记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// 相对知识库根目录的路径，分隔符统一为 `/`
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    pub category: String,
    pub content: String,
    /// 内容字节数
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// 从笔记文本中提取出的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMetadata {
    pub title: String,
    pub tags: Vec<String>,
    pub category: String,
}

impl Document {
    pub fn new(
        path: impl Into<String>,
        meta: NoteMetadata,
        content: String,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let size = content.len() as u64;
        Self {
            path: path.into(),
            title: meta.title,
            tags: meta.tags,
            category: meta.category,
            content,
            size,
            last_modified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Title,
    Tag,
    Content,
    Path,
}

/// 单条命中记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "type")]
    pub kind: MatchKind,
    pub text: String,
    /// 仅内容命中携带，从 1 开始
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Match {
    pub fn new(kind: MatchKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line: None,
        }
    }

    pub fn content(text: impl Into<String>, line: usize) -> Self {
        Self {
            kind: MatchKind::Content,
            text: text.into(),
            line: Some(line),
        }
    }
}

/// 搜索结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    pub score: u32,
    pub matches: Vec<Match>,
    pub excerpt: String,
}

/// 排序模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SortBy {
    #[default]
    Relevance,
    Date,
    Size,
}

impl From<String> for SortBy {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "date" => SortBy::Date,
            "size" => SortBy::Size,
            "relevance" => SortBy::Relevance,
            other => {
                tracing::debug!("未知排序方式 '{}'，按相关度排序", other);
                SortBy::Relevance
            }
        }
    }
}

/// 搜索选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub sort_by: SortBy,
}

/// 搜索结果（带分页）
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    /// 过滤后、分页前的结果数
    pub total: usize,
}

/// 索引统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_files: usize,
    pub total_size: u64,
    pub categories: usize,
    pub tags: usize,
    pub last_updated: DateTime<Utc>,
}
