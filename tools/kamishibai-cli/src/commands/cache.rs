//! Manage the narration audio cache.

use kamishibai_common::config::AppConfig;
use kamishibai_narration::AudioCache;

pub fn clear() -> anyhow::Result<()> {
    let config = AppConfig::load();
    let cache = AudioCache::new(&config.cache_dir)?;

    println!("Clearing narration cache: {}", cache.root().display());
    cache.clear()?;
    println!("Cache cleared.");

    Ok(())
}
