//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");

// Progress indicators
pub static UPLOAD: Emoji<'_, '_> = Emoji("📤 ", "[UP]");
pub static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[DL]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static REVIEW: Emoji<'_, '_> = Emoji("🔍 ", "[R]");
