use super::Command;
use crate::config::Config;
use crate::error::{Result, WrapErr};
use kb_core::{KnowledgeBase, SearchOptions};
use std::path::PathBuf;

pub struct SearchCommand {
    config: Config,
    query: String,
    options: SearchOptions,
}

impl SearchCommand {
    pub fn new(cfg: Config, root: Option<PathBuf>, query: String, options: SearchOptions) -> Self {
        Self {
            config: cfg.with_overrides(root.as_deref(), None),
            query,
            options,
        }
    }
}

#[async_trait::async_trait]
impl Command for SearchCommand {
    async fn execute(&self) -> Result<()> {
        let kb = KnowledgeBase::new(self.config.knowledge_base.clone())
            .wrap_err("Open knowledge base error")?;
        kb.reindex().await.wrap_err("Index error")?;

        let results = kb.search(&self.query, &self.options)?;

        println!("Found {} results for '{}'", results.total, self.query);
        for (i, hit) in results.results.iter().enumerate() {
            println!(
                "{:>3}. [{}] {} ({})",
                self.options.offset + i + 1,
                hit.score,
                hit.document.title,
                hit.document.path
            );
            for m in &hit.matches {
                match m.line {
                    Some(line) => println!("       {:?} L{}: {}", m.kind, line, m.text),
                    None => println!("       {:?}: {}", m.kind, m.text),
                }
            }
        }
        Ok(())
    }
}
