pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "kb";
pub const APP_NAME: &str = "kb-server";

pub const SERVER_CONFIG_FILE_NAME: &str = "config.toml";
