pub mod constants;

pub use etcetera::AppStrategy;
use etcetera::{AppStrategyArgs, choose_app_strategy};

use std::env;
use std::path::PathBuf;

pub fn create_strategy() -> std::result::Result<impl AppStrategy, etcetera::HomeDirError> {
    choose_app_strategy(AppStrategyArgs {
        top_level_domain: constants::TOP_LEVEL_DOMAIN.to_string(),
        author: constants::AUTHOR.to_string(),
        app_name: constants::APP_NAME.to_string(),
    })
}

/// 环境变量优先，其次平台目录，最后退回临时目录
pub fn resolve_dir<S, F>(env_key: &str, strategy: &S, strategy_fn: F) -> PathBuf
where
    S: AppStrategy,
    F: FnOnce(&S) -> Option<PathBuf>,
{
    env::var_os(env_key)
        .map(PathBuf::from)
        .or_else(|| strategy_fn(strategy))
        .unwrap_or_else(|| env::temp_dir().join(constants::APP_NAME))
}

/// 服务端配置文件路径，`KB_CONFIG` 环境变量可以覆盖
pub fn server_config_path() -> std::result::Result<PathBuf, etcetera::HomeDirError> {
    if let Some(path) = env::var_os("KB_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let strategy = create_strategy()?;
    Ok(resolve_dir("KB_CONFIG_DIR", &strategy, |s| Some(s.config_dir()))
        .join(constants::SERVER_CONFIG_FILE_NAME))
}
