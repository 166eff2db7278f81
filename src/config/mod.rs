mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    prepare(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mediaprobe.toml",
        "~/.config/mediaprobe/config.toml",
        "/etc/mediaprobe/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    // Return default config if no file found
    prepare(Config::default())
}

/// Expand paths, apply environment overrides and validate.
fn prepare(mut config: Config) -> Result<Config> {
    let loader = &mut config.probe.loader;
    loader.lib_dir = loader.lib_dir.take().map(|dir| expand_path(&dir)).transpose()?;
    loader.search_dirs = loader
        .search_dirs
        .iter()
        .map(|dir| expand_path(dir))
        .collect::<Result<_>>()?;

    config.probe.loader = config.probe.loader.with_env_overrides();

    validate_config(&config)?;
    Ok(config)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    let expanded = shellexpand::full(&text)
        .with_context(|| format!("Failed to expand path: {:?}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let probe = &config.probe;

    if probe.io_buffer_size == 0 {
        anyhow::bail!("probe.io_buffer_size cannot be 0");
    }
    if i32::try_from(probe.io_buffer_size).is_err() {
        anyhow::bail!(
            "probe.io_buffer_size {} does not fit the native buffer size",
            probe.io_buffer_size
        );
    }

    if probe.loader.format_libraries.is_empty() {
        anyhow::bail!("probe.loader.format_libraries cannot be empty");
    }
    if probe.loader.util_libraries.is_empty() {
        anyhow::bail!("probe.loader.util_libraries cannot be empty");
    }

    if let Some(ref dir) = probe.loader.lib_dir {
        if !dir.is_dir() {
            tracing::warn!("Library directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
