use super::Command;
use crate::api::{self, AppState};
use crate::config::Config;
use crate::error::{Result, WrapErr};
use kb_core::{FileWatcher, KnowledgeBase};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(cfg: Config, root: Option<PathBuf>, listen: Option<SocketAddr>) -> Self {
        Self {
            config: cfg.with_overrides(root.as_deref(), listen),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[async_trait::async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let kb = Arc::new(
            KnowledgeBase::new(self.config.knowledge_base.clone())
                .wrap_err("Open knowledge base error")?,
        );

        info!("Building initial index...");
        let indexed = kb.reindex().await.wrap_err("Initial index error")?;
        info!("Initial index complete: {} files", indexed);

        // 监控须在服务期间保持存活
        let _watcher = if kb.config().watch {
            match FileWatcher::start(Arc::clone(&kb)) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!("File watcher unavailable, index will only refresh on reindex: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let state = Arc::new(AppState::new(kb));
        let app = api::router(state);

        let listener = TcpListener::bind(self.config.listen)
            .await
            .wrap_err_with(|| format!("Bind {} error", self.config.listen))?;
        info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}
