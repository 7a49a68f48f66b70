//! 配置文件加载

use std::fs;
use std::path::Path;

use anyhow::Context;
use tempo_player::PlayerConfig;

/// 读取 TOML 配置；没有给出路径时使用默认值
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PlayerConfig> {
    let Some(path) = path else {
        return Ok(PlayerConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}
