//! Colors and glyphs used when drawing monitors.

use crate::status::{HeartbeatStatus, LocalState};

/// ANSI foreground color, stored as its SGR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiColor(pub u8);

impl AnsiColor {
    pub const BLACK: AnsiColor = AnsiColor(30);
    pub const RED: AnsiColor = AnsiColor(31);
    pub const GREEN: AnsiColor = AnsiColor(32);
    pub const YELLOW: AnsiColor = AnsiColor(33);
    pub const BLUE: AnsiColor = AnsiColor(34);
    pub const MAGENTA: AnsiColor = AnsiColor(35);
    pub const CYAN: AnsiColor = AnsiColor(36);
    pub const WHITE: AnsiColor = AnsiColor(37);

    /// Look up a color by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let color = match name.trim().to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "red" => Self::RED,
            "green" => Self::GREEN,
            "yellow" => Self::YELLOW,
            "blue" => Self::BLUE,
            "magenta" => Self::MAGENTA,
            "cyan" => Self::CYAN,
            "white" => Self::WHITE,
            _ => return None,
        };
        Some(color)
    }

    pub fn paint(self, text: &str) -> String {
        format!("\u{1b}[{}m{}\u{1b}[0m", self.0, text)
    }
}

/// Per-severity colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub ok: AnsiColor,
    pub warn: AnsiColor,
    pub ko: AnsiColor,
    /// Names of monitors that recovered from a warning.
    pub warn_ok: AnsiColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ok: AnsiColor::GREEN,
            warn: AnsiColor::YELLOW,
            ko: AnsiColor::RED,
            warn_ok: AnsiColor::CYAN,
        }
    }
}

impl Palette {
    pub fn status(&self, status: HeartbeatStatus) -> AnsiColor {
        match status {
            HeartbeatStatus::OK => self.ok,
            HeartbeatStatus::Warn => self.warn,
            HeartbeatStatus::KO => self.ko,
        }
    }

    pub fn state(&self, state: LocalState) -> AnsiColor {
        match state {
            LocalState::WarnOk => self.warn_ok,
            other => self.status(other.severity()),
        }
    }

    pub fn paint_status(&self, status: HeartbeatStatus, text: &str) -> String {
        self.status(status).paint(text)
    }

    pub fn paint_state(&self, state: LocalState, text: &str) -> String {
        self.state(state).paint(text)
    }
}

/// Glyph table.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyphs {
    /// Single character drawn for each beat in terminal mode.
    pub term: String,
    pub ok: String,
    pub warn: String,
    pub ko: String,
    pub warn_ok: String,
    /// Shown in the menu bar when the dashboard cannot be read.
    pub error: String,
    pub ok_beat: String,
    pub warn_beat: String,
    pub ko_beat: String,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            term: "█".to_string(),
            ok: "👌".to_string(),
            warn: "🤔".to_string(),
            ko: "🔥".to_string(),
            warn_ok: "👍".to_string(),
            error: "🏩".to_string(),
            ok_beat: "🟩".to_string(),
            warn_beat: "🟧".to_string(),
            ko_beat: "🟥".to_string(),
        }
    }
}

impl Glyphs {
    pub fn icon(&self, state: LocalState) -> &str {
        match state {
            LocalState::OK => &self.ok,
            LocalState::Warn => &self.warn,
            LocalState::KO => &self.ko,
            LocalState::WarnOk => &self.warn_ok,
        }
    }

    pub fn status_icon(&self, status: HeartbeatStatus) -> &str {
        self.icon(status.into())
    }

    pub fn beat_emoji(&self, status: HeartbeatStatus) -> &str {
        match status {
            HeartbeatStatus::OK => &self.ok_beat,
            HeartbeatStatus::Warn => &self.warn_beat,
            HeartbeatStatus::KO => &self.ko_beat,
        }
    }
}

/// Immutable rendering settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Draw the heartbeat column.
    pub show_beats: bool,
    /// Draw beats with emoji squares instead of colored `term` glyphs.
    pub emoji_beats: bool,
    /// Draw the per-monitor status icon.
    pub show_icons: bool,
    /// Emit menu-bar (xbar/SwiftBar) markup.
    pub menu_bar: bool,
    pub palette: Palette,
    pub glyphs: Glyphs,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_beats: true,
            emoji_beats: false,
            show_icons: true,
            menu_bar: false,
            palette: Palette::default(),
            glyphs: Glyphs::default(),
        }
    }
}

impl RenderConfig {
    /// One beat cell for the terminal column.
    pub fn beat_cell(&self, status: HeartbeatStatus) -> String {
        if self.emoji_beats {
            self.glyphs.beat_emoji(status).to_string()
        } else {
            self.palette.paint_status(status, &self.glyphs.term)
        }
    }

    /// Status icon for a monitor, empty when icons are off.
    pub fn icon(&self, state: LocalState) -> &str {
        if self.show_icons {
            self.glyphs.icon(state)
        } else {
            ""
        }
    }

    /// Header icon for the run's global state, empty when icons are off.
    pub fn status_icon(&self, status: HeartbeatStatus) -> &str {
        if self.show_icons {
            self.glyphs.status_icon(status)
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names() {
        assert_eq!(AnsiColor::from_name("Red"), Some(AnsiColor::RED));
        assert_eq!(AnsiColor::from_name(" cyan "), Some(AnsiColor::CYAN));
        assert_eq!(AnsiColor::from_name("orange"), None);
        assert_eq!(AnsiColor::GREEN.paint("x"), "\u{1b}[32mx\u{1b}[0m");
    }

    #[test]
    fn test_state_colors() {
        let palette = Palette::default();
        assert_eq!(palette.state(LocalState::KO), AnsiColor::RED);
        assert_eq!(palette.state(LocalState::WarnOk), AnsiColor::CYAN);
        assert_eq!(palette.state(LocalState::OK), AnsiColor::GREEN);
    }

    #[test]
    fn test_beat_cell_modes() {
        let mut config = RenderConfig::default();
        assert_eq!(config.beat_cell(HeartbeatStatus::Warn), "\u{1b}[33m█\u{1b}[0m");
        config.emoji_beats = true;
        assert_eq!(config.beat_cell(HeartbeatStatus::Warn), "🟧");
    }

    #[test]
    fn test_icons_can_be_disabled() {
        let mut config = RenderConfig::default();
        assert_eq!(config.icon(LocalState::WarnOk), "👍");
        assert_eq!(config.status_icon(HeartbeatStatus::KO), "🔥");
        config.show_icons = false;
        assert_eq!(config.icon(LocalState::KO), "");
        assert_eq!(config.status_icon(HeartbeatStatus::KO), "");
    }
}
