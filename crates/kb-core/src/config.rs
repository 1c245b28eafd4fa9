// kb-core/src/config.rs
//! 配置模块

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::Context;

/// 未能从路径推导分类时使用的默认值
pub const DEFAULT_UNCATEGORIZED: &str = "未分类";

/// 知识库配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KbConfig {
    /// 知识库根目录
    pub root: PathBuf,
    /// 笔记文件扩展名（不含点）
    pub note_extension: String,
    /// 顶层目录缺失时的分类名
    pub uncategorized: String,
    /// 批量索引时同时进行的文件提取数
    pub index_concurrency: usize,
    /// 搜索日志保留的条数
    pub query_log_capacity: usize,
    /// 是否启动文件监控
    pub watch: bool,
    pub walker: WalkerConfig,
    pub search: SearchDefaults,
}

/// Walker 配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WalkerConfig {
    pub use_ripgrep_walker: bool,
    pub respect_ignore: bool,
    pub skip_hidden: bool,
    pub follow_symlinks: bool,
    /// 0 表示不限制
    pub max_depth: usize,
    /// 对路径中每一级名称匹配的 glob 模式，命中即跳过
    pub ignore_patterns: Vec<String>,
}

/// 搜索默认参数
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchDefaults {
    pub default_limit: usize,
    /// 摘要窗口长度（字符数）
    pub excerpt_length: usize,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            note_extension: "md".to_string(),
            uncategorized: DEFAULT_UNCATEGORIZED.to_string(),
            index_concurrency: 8,
            query_log_capacity: 1000,
            watch: true,
            walker: WalkerConfig::default(),
            search: SearchDefaults::default(),
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            use_ripgrep_walker: false,
            respect_ignore: false,
            skip_hidden: false,
            follow_symlinks: false,
            max_depth: 0,
            ignore_patterns: vec![
                "node_modules".to_string(),
                ".git".to_string(),
            ],
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            default_limit: 10,
            excerpt_length: 300,
        }
    }
}

impl KbConfig {
    /// 以给定根目录创建默认配置
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {:?}", path))?;
        let config: KbConfig = toml::from_str(&content)
            .with_context(|| format!("配置文件格式错误 {:?}", path))?;
        Ok(config)
    }

    /// 尝试加载配置，失败则使用默认值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("使用默认配置: {:#}", e);
                Self::default()
            }
        }
    }

    /// 笔记文件名后缀，例如 `.md`
    pub fn note_suffix(&self) -> String {
        format!(".{}", self.note_extension.trim_start_matches('.'))
    }
}
