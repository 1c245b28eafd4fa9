// kb-core/src/watcher.rs
//! 文件监控模块 - 将文件系统事件增量同步到索引
//!
//! notify 回调只负责把原始事件送入通道，由单个消费任务分类并分发。
//! 每个事件在分发时同步领取凭据，提取任务完成顺序不影响最终结果。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::scanner::NoteFilter;
use crate::KnowledgeBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
}

/// 分类后的文件事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// 将 notify 原始事件转换为需要处理的事件
///
/// 重命名拆分为旧路径删除和新路径创建。新增或修改只保留笔记和目录；
/// 删除无法判断原来是否为目录，除 ignore 外全部保留。
pub async fn classify(event: &Event, filter: &NoteFilter, root: &Path) -> Vec<WatchEvent> {
    use WatchEventKind::*;

    let raw: Vec<WatchEvent> = match &event.kind {
        EventKind::Create(_) => event.paths.iter().map(|p| WatchEvent::new(Created, p)).collect(),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            event.paths.iter().map(|p| WatchEvent::new(Modified, p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event.paths.iter().map(|p| WatchEvent::new(Removed, p)).collect(),
            RenameMode::To => event.paths.iter().map(|p| WatchEvent::new(Created, p)).collect(),
            RenameMode::Both => {
                let mut out = Vec::with_capacity(2);
                if let Some(from) = event.paths.first() {
                    out.push(WatchEvent::new(Removed, from));
                }
                if let Some(to) = event.paths.get(1) {
                    out.push(WatchEvent::new(Created, to));
                }
                out
            }
            _ => {
                let mut out = Vec::with_capacity(event.paths.len());
                for p in &event.paths {
                    let exists = tokio::fs::try_exists(p).await.unwrap_or(false);
                    out.push(WatchEvent::new(if exists { Created } else { Removed }, p));
                }
                out
            }
        },
        EventKind::Remove(_) => event.paths.iter().map(|p| WatchEvent::new(Removed, p)).collect(),
        _ => Vec::new(),
    };

    let mut kept = Vec::with_capacity(raw.len());
    for e in raw {
        let rel = e.path.strip_prefix(root).unwrap_or(&e.path);
        if filter.is_ignored(rel) {
            continue;
        }
        let keep = match e.kind {
            Removed => true,
            Created | Modified => filter.has_note_extension(&e.path) || is_dir(&e.path).await,
        };
        if keep {
            kept.push(e);
        }
    }
    kept
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

/// 处理单个事件
///
/// 需要读取文件的操作在后台任务中执行，返回其句柄；删除在返回前完成。
/// 凭据在返回前领取，按顺序等待各次调用即可保持事件顺序。
pub async fn dispatch(kb: &Arc<KnowledgeBase>, event: WatchEvent) -> Option<JoinHandle<()>> {
    tracing::debug!("处理文件事件: {:?}", event);

    match event.kind {
        WatchEventKind::Created | WatchEventKind::Modified => {
            if is_dir(&event.path).await {
                let kb = Arc::clone(kb);
                return Some(tokio::spawn(async move {
                    match kb.index_tree(&event.path).await {
                        Ok(n) => tracing::info!("新目录 {:?} 已索引 {} 个文件", event.path, n),
                        Err(e) => tracing::warn!("索引目录失败 {:?}: {}", event.path, e),
                    }
                }));
            }

            let ticket = match kb.claim_note(&event.path) {
                Ok(Some(ticket)) => ticket,
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!("忽略事件 {:?}: {}", event.path, e);
                    return None;
                }
            };

            let kb = Arc::clone(kb);
            Some(tokio::spawn(async move {
                if let Err(e) = kb.index_claimed(&event.path, ticket).await {
                    tracing::warn!("重新索引失败，保留原状态 {:?}: {}", event.path, e);
                }
            }))
        }
        WatchEventKind::Removed => {
            let result = if kb.filter().has_note_extension(&event.path) {
                kb.remove_path(&event.path).map(usize::from)
            } else {
                kb.remove_tree(&event.path)
            };
            if let Err(e) = result {
                tracing::warn!("处理删除事件失败 {:?}: {}", event.path, e);
            }
            None
        }
    }
}

/// 消费事件流直到发送端关闭
pub async fn run_synchronizer(
    kb: Arc<KnowledgeBase>,
    mut rx: UnboundedReceiver<notify::Result<Event>>,
) {
    while let Some(res) = rx.recv().await {
        match res {
            Ok(event) => {
                for watch_event in classify(&event, kb.filter(), kb.root()).await {
                    dispatch(&kb, watch_event).await;
                }
            }
            Err(e) => tracing::error!("监控错误: {:?}", e),
        }
    }
    tracing::info!("文件监控已停止");
}

/// 运行中的文件监控，drop 时停止
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// 递归监控知识库根目录，须在 tokio 运行时内调用
    pub fn start(kb: Arc<KnowledgeBase>) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // 接收端关闭说明监控正在停止
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(kb.root(), RecursiveMode::Recursive)?;

        tracing::info!("文件监控已启动: {:?}", kb.root());

        let task = tokio::spawn(run_synchronizer(kb, rx));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
