//! Subtitle font resolution.
//!
//! The renderer never hard-codes a font path; callers inject a resolver so
//! tests and portable installs can substitute their own.

use std::path::{Path, PathBuf};

/// Capability for picking the subtitle font file.
pub trait FontResolver: Send + Sync {
    fn resolve(&self) -> Option<PathBuf>;
}

/// CJK-capable fonts commonly present on the supported platforms.
const FONT_CANDIDATES: &[&str] = &[
    "C:\\Windows\\Fonts\\msgothic.ttc",
    "C:\\Windows\\Fonts\\meiryo.ttc",
    "C:\\Windows\\Fonts\\YuGothM.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/ヒラギノ角ゴシック W4.ttc",
];

/// Searches a fixed candidate list for an installed font.
#[derive(Debug, Clone, Default)]
pub struct SystemFontResolver;

impl FontResolver for SystemFontResolver {
    fn resolve(&self) -> Option<PathBuf> {
        FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

/// Always resolves to one pinned font file.
#[derive(Debug, Clone)]
pub struct FixedFont(pub PathBuf);

impl FixedFont {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl FontResolver for FixedFont {
    fn resolve(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Pick the subtitle font: an explicit configuration wins, then the
/// resolver, then the first candidate so the encoder produces a concrete
/// "no such font" diagnostic instead of a silent fallback.
pub fn select_font(configured: Option<&Path>, resolver: &dyn FontResolver) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    resolver
        .resolve()
        .unwrap_or_else(|| PathBuf::from(FONT_CANDIDATES[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_font_wins() {
        let fixed = FixedFont::new("/fonts/other.ttc");
        let chosen = select_font(Some(Path::new("/fonts/pinned.ttc")), &fixed);
        assert_eq!(chosen, PathBuf::from("/fonts/pinned.ttc"));
    }

    #[test]
    fn test_fixed_font_resolves() {
        let fixed = FixedFont::new("/fonts/test.ttc");
        assert_eq!(select_font(None, &fixed), PathBuf::from("/fonts/test.ttc"));
    }
}
