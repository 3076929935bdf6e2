//! Check system capabilities.

use kamishibai_common::config::AppConfig;
use kamishibai_render_engine::font::{FontResolver, SystemFontResolver};
use kamishibai_render_engine::FfmpegEncoder;

pub fn run() -> anyhow::Result<()> {
    println!("Kamishibai System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;

    // Encoder
    match FfmpegEncoder::discover() {
        Ok(encoder) => {
            println!("[OK] Encoder: {}", encoder.path().display());
            match encoder.version() {
                Some(version) => println!("     {version}"),
                None => {
                    println!("[WARN] Encoder found but did not report a version");
                    all_ok = false;
                }
            }
        }
        Err(e) => {
            println!("[FAIL] Encoder: {e}");
            all_ok = false;
        }
    }

    // Subtitle font
    match SystemFontResolver.resolve() {
        Some(font) => println!("[OK] Subtitle font: {}", font.display()),
        None => {
            println!("[WARN] No CJK-capable subtitle font found; set one in the config");
            all_ok = false;
        }
    }

    // Cache root
    let config = AppConfig::load();
    println!("[OK] Audio cache root: {}", config.cache_dir.display());

    println!();
    if all_ok {
        println!("All capabilities are available. Kamishibai is ready.");
    } else {
        println!("Some capabilities are missing. See above for fixes.");
    }

    Ok(())
}
