use crate::error::{Result, WrapErr};
use kb_core::KbConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    /// HTTP 监听地址
    pub listen: SocketAddr,
    /// 知识库配置
    pub knowledge_base: KbConfig,
}

fn default_config() -> Config {
    Config {
        listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
        knowledge_base: KbConfig::default(),
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config)
    }

    pub fn load() -> Result<Config> {
        let config_path = config::server_config_path()?;

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str)
                .wrap_err_with(|| format!("Invalid configuration file {:?}", config_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 配置文件不存在，创建示例配置文件
                if let Err(e) = Self::create_example_config(&config_path) {
                    tracing::warn!("Could not write example config {:?}: {}", config_path, e);
                }
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 命令行参数覆盖配置文件
    pub fn with_overrides(mut self, root: Option<&Path>, listen: Option<SocketAddr>) -> Self {
        if let Some(root) = root {
            self.knowledge_base.root = root.to_path_buf();
        }
        if let Some(listen) = listen {
            self.listen = listen;
        }
        self
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# kb-server 配置文件
#
# 此文件在首次运行时自动创建
# 配置修改后重启服务生效

# HTTP 监听地址
# listen = "127.0.0.1:3000"

[knowledge-base]
# 知识库根目录（命令行 --root 优先）
root = "."
# note-extension = "md"
# uncategorized = "未分类"
# index-concurrency = 8
# query-log-capacity = 1000
# watch = true

[knowledge-base.walker]
# use-ripgrep-walker = false
# skip-hidden = false
# max-depth = 0
ignore-patterns = ["node_modules", ".git"]

[knowledge-base.search]
# default-limit = 10
# excerpt-length = 300
"#;

        std::fs::write(config_path, example_config)?;

        eprintln!("\n📝 已创建配置文件: {:?}", config_path);
        eprintln!("💡 编辑 [knowledge-base] root 指向你的笔记目录，或使用 --root 参数\n");

        Ok(())
    }
}
