//! Monitor aggregates and their group rollups.

mod rollup;

pub use rollup::*;

use crate::render::{pad_right, RenderConfig};
use crate::status::{classify, Classification, HeartbeatSample, HeartbeatStatus, IgnorePolicy, LocalState};

/// Grouping key for monitors. Identity is the `(id, name)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

impl Group {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One monitor with its heartbeat history and its classification.
///
/// The classification is computed once, when the monitor is built, and
/// never changes afterwards.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub group: Group,
    samples: Vec<HeartbeatSample>,
    classification: Classification,
}

impl Monitor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        group: Group,
        samples: Vec<HeartbeatSample>,
        policy: &IgnorePolicy,
    ) -> Self {
        let id = id.into();
        let name = name.into();
        let classification = classify(&samples, policy.flags_for(&name));

        tracing::trace!(
            "Monitor {} ({}): {:?} -> local {:?}, global {}",
            name,
            id,
            classification.rule,
            classification.local,
            classification.global
        );

        Self {
            id,
            name,
            group,
            samples,
            classification,
        }
    }

    pub fn samples(&self) -> &[HeartbeatSample] {
        &self.samples
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn local_state(&self) -> LocalState {
        self.classification.local
    }

    pub fn global_state(&self) -> HeartbeatStatus {
        self.classification.global
    }

    /// One cell per beat, oldest first, drawn from each beat's own status.
    ///
    /// Empty when beats are hidden.
    pub fn beats(&self, config: &RenderConfig) -> String {
        if !config.show_beats {
            return String::new();
        }
        self.samples
            .iter()
            .map(|s| config.beat_cell(s.status))
            .collect()
    }

    /// Emoji rendition of the beats, for sinks that cannot show ANSI colors.
    pub fn emoji_beats(&self, config: &RenderConfig) -> String {
        self.samples
            .iter()
            .map(|s| config.glyphs.beat_emoji(s.status))
            .collect()
    }

    /// Name padded to `width` display cells and colored by the local state.
    pub fn display_name(&self, width: usize, config: &RenderConfig) -> String {
        let width = if config.show_beats || config.show_icons { width } else { 0 };
        config.palette.paint_state(self.local_state(), &pad_right(&self.name, width))
    }

    /// Every beat is up. True for an empty history.
    pub fn is_ok(&self) -> bool {
        self.samples.iter().all(|s| s.status == HeartbeatStatus::OK)
    }

    /// Every beat is degraded.
    pub fn is_warn(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(|s| s.status == HeartbeatStatus::Warn)
    }

    /// Every beat is down.
    pub fn is_ko(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(|s| s.status == HeartbeatStatus::KO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::strip_ansi;
    use crate::status::samples;
    use HeartbeatStatus::{Warn, KO, OK};

    fn monitor(name: &str, statuses: &[HeartbeatStatus]) -> Monitor {
        Monitor::new("1", name, Group::new(1, "Web"), samples(statuses), &IgnorePolicy::default())
    }

    #[test]
    fn test_classified_on_construction() {
        let m = monitor("api", &[KO, OK]);
        assert_eq!(m.local_state(), LocalState::Warn);
        assert_eq!(m.global_state(), Warn);

        let policy = IgnorePolicy::new(&["api"], &[]).unwrap();
        let m = Monitor::new("1", "api", Group::default(), samples(&[KO, OK]), &policy);
        assert_eq!(m.global_state(), OK);
    }

    #[test]
    fn test_beats_follow_each_sample() {
        let config = RenderConfig::default();
        let m = monitor("api", &[OK, Warn, KO]);
        let beats = m.beats(&config);
        assert_eq!(strip_ansi(&beats), "███");
        assert!(beats.starts_with("\u{1b}[32m"));
        assert!(beats.ends_with("\u{1b}[31m█\u{1b}[0m"));
        assert_eq!(m.emoji_beats(&config), "🟩🟧🟥");
    }

    #[test]
    fn test_hidden_beats() {
        let config = RenderConfig {
            show_beats: false,
            ..RenderConfig::default()
        };
        let m = monitor("api", &[OK, KO]);
        assert_eq!(m.beats(&config), "");
        // Emoji beats ignore the switch.
        assert_eq!(m.emoji_beats(&config), "🟩🟥");
    }

    #[test]
    fn test_display_name() {
        let config = RenderConfig::default();
        let m = monitor("api", &[OK, KO]);
        assert_eq!(m.display_name(6, &config), "\u{1b}[31mapi   \u{1b}[0m");

        let bare = RenderConfig {
            show_beats: false,
            show_icons: false,
            ..RenderConfig::default()
        };
        assert_eq!(strip_ansi(&m.display_name(6, &bare)), "api");
    }

    #[test]
    fn test_raw_predicates() {
        assert!(monitor("a", &[OK, OK]).is_ok());
        assert!(monitor("a", &[]).is_ok());
        assert!(!monitor("a", &[]).is_ko());
        assert!(monitor("a", &[KO, KO]).is_ko());
        assert!(monitor("a", &[Warn]).is_warn());
        let mixed = monitor("a", &[OK, Warn, KO]);
        assert!(!mixed.is_ok() && !mixed.is_warn() && !mixed.is_ko());
    }
}
