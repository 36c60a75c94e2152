//! Loads a [`CatalogueConfig`] descriptor from disk, `.toml` or `.json`
//! selected by extension (`.toml` is assumed when the extension is
//! anything else), mirroring the teacher workspace's config-loading idiom.

use std::fs;
use std::path::Path;

use abr_core::CatalogueConfig;
use anyhow::{Context, Result, bail};

pub fn load_catalogue_config(path: &Path) -> Result<CatalogueConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading catalogue descriptor at {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&data)
            .with_context(|| format!("parsing {} as JSON", path.display())),
        Some("toml") | None => {
            toml::from_str(&data).with_context(|| format!("parsing {} as TOML", path.display()))
        }
        Some(other) => bail!("unrecognized catalogue descriptor extension: .{other}"),
    }
}
