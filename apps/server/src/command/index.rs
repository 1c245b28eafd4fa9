use super::Command;
use crate::config::Config;
use crate::error::{Result, WrapErr};
use kb_core::KnowledgeBase;
use std::path::PathBuf;
use std::time::Instant;

pub struct IndexCommand {
    config: Config,
}

impl IndexCommand {
    pub fn new(cfg: Config, root_path: Option<PathBuf>) -> Self {
        Self {
            config: cfg.with_overrides(root_path.as_deref(), None),
        }
    }
}

#[async_trait::async_trait]
impl Command for IndexCommand {
    async fn execute(&self) -> Result<()> {
        let kb = KnowledgeBase::new(self.config.knowledge_base.clone())
            .wrap_err("Open knowledge base error")?;

        println!("Indexing {:?} ...", kb.root());
        let started = Instant::now();
        let indexed = kb.reindex().await.wrap_err("Index error")?;
        let stats = kb.stats();

        println!("Indexed {} files in {:.2?}", indexed, started.elapsed());
        println!("  total size : {} bytes", stats.total_size);
        println!("  categories : {}", stats.categories);
        println!("  tags       : {}", stats.tags);
        Ok(())
    }
}
