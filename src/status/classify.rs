//! Monitor classification.
//!
//! Turns a monitor's heartbeat history plus its policy flags into a local
//! (display) state and a global (alerting) state. The decision is a short
//! chain of named rules, tried in precedence order:
//!
//! 1. [`Rule::EmptyHistory`]
//! 2. [`Rule::OnlyLastDown`] / [`Rule::OnlyLastIgnoredDown`]; an only-last
//!    monitor whose last beat is up pins the global state to `OK` and falls
//!    through so history can still soften the local state.
//! 3. [`Rule::LastDown`] / [`Rule::LastDownIgnored`]
//! 4. [`Rule::RecentKo`], [`Rule::RecentKoIgnored`], [`Rule::RecoveredWarn`]
//!    or [`Rule::Healthy`] from a scan of the earlier beats.

use super::{HeartbeatSample, HeartbeatStatus, LocalState, PolicyFlags};

/// The rule that decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    EmptyHistory,
    OnlyLastDown,
    OnlyLastIgnoredDown,
    LastDown,
    LastDownIgnored,
    RecentKo,
    RecentKoIgnored,
    RecoveredWarn,
    Healthy,
}

/// Result of classifying one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub local: LocalState,
    pub global: HeartbeatStatus,
    pub rule: Rule,
}

impl Classification {
    fn new(local: LocalState, global: HeartbeatStatus, rule: Rule) -> Self {
        Self { local, global, rule }
    }
}

/// Classify a heartbeat history (oldest first). Total over every input.
pub fn classify(samples: &[HeartbeatSample], flags: PolicyFlags) -> Classification {
    let Some(last) = samples.last() else {
        return Classification::new(LocalState::OK, HeartbeatStatus::OK, Rule::EmptyHistory);
    };

    if flags.only_last && last.status.is_down() {
        return if flags.ignored {
            Classification::new(LocalState::Warn, HeartbeatStatus::OK, Rule::OnlyLastIgnoredDown)
        } else {
            Classification::new(last.status.into(), last.status, Rule::OnlyLastDown)
        };
    }

    if last.status.is_down() {
        return if flags.ignored {
            Classification::new(LocalState::Warn, HeartbeatStatus::OK, Rule::LastDownIgnored)
        } else {
            Classification::new(last.status.into(), last.status, Rule::LastDown)
        };
    }

    // Last beat is up; only-last monitors keep a global OK from here on.
    let pinned_global = flags.only_last.then_some(HeartbeatStatus::OK);
    let earlier = &samples[..samples.len() - 1];

    if earlier.iter().rev().any(|s| s.status == HeartbeatStatus::KO) {
        return if flags.ignored {
            Classification::new(
                LocalState::Warn,
                pinned_global.unwrap_or(HeartbeatStatus::OK),
                Rule::RecentKoIgnored,
            )
        } else {
            Classification::new(
                LocalState::Warn,
                pinned_global.unwrap_or(HeartbeatStatus::Warn),
                Rule::RecentKo,
            )
        };
    }

    if earlier.iter().rev().any(|s| s.status == HeartbeatStatus::Warn) {
        return Classification::new(LocalState::WarnOk, HeartbeatStatus::OK, Rule::RecoveredWarn);
    }

    Classification::new(LocalState::OK, HeartbeatStatus::OK, Rule::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::samples;
    use HeartbeatStatus::{Warn, KO, OK};

    const PLAIN: PolicyFlags = PolicyFlags { ignored: false, only_last: false };
    const IGNORED: PolicyFlags = PolicyFlags { ignored: true, only_last: false };
    const ONLY_LAST: PolicyFlags = PolicyFlags { ignored: false, only_last: true };
    const BOTH: PolicyFlags = PolicyFlags { ignored: true, only_last: true };

    fn run(statuses: &[HeartbeatStatus], flags: PolicyFlags) -> (LocalState, HeartbeatStatus, Rule) {
        let c = classify(&samples(statuses), flags);
        (c.local, c.global, c.rule)
    }

    #[test]
    fn test_empty_history_is_ok() {
        for flags in [PLAIN, IGNORED, ONLY_LAST, BOTH] {
            assert_eq!(run(&[], flags), (LocalState::OK, OK, Rule::EmptyHistory));
        }
    }

    #[test]
    fn test_last_ko_is_ko() {
        assert_eq!(run(&[OK, OK, KO], PLAIN), (LocalState::KO, KO, Rule::LastDown));
        assert_eq!(run(&[KO], PLAIN), (LocalState::KO, KO, Rule::LastDown));
        assert_eq!(run(&[Warn, OK, KO], PLAIN).1, KO);
    }

    #[test]
    fn test_last_warn_is_warn() {
        assert_eq!(run(&[OK, Warn], PLAIN), (LocalState::Warn, Warn, Rule::LastDown));
    }

    #[test]
    fn test_ignored_last_ko_is_masked_globally() {
        assert_eq!(
            run(&[OK, OK, KO], IGNORED),
            (LocalState::Warn, OK, Rule::LastDownIgnored)
        );
        assert_eq!(run(&[OK, Warn], IGNORED), (LocalState::Warn, OK, Rule::LastDownIgnored));
    }

    #[test]
    fn test_recent_ko_warns() {
        assert_eq!(run(&[KO, OK], PLAIN), (LocalState::Warn, Warn, Rule::RecentKo));
        assert_eq!(run(&[KO, Warn, OK, OK], PLAIN), (LocalState::Warn, Warn, Rule::RecentKo));
        assert_eq!(run(&[KO, OK], IGNORED), (LocalState::Warn, OK, Rule::RecentKoIgnored));
    }

    #[test]
    fn test_recovered_warn() {
        assert_eq!(run(&[Warn, OK], PLAIN), (LocalState::WarnOk, OK, Rule::RecoveredWarn));
        assert_eq!(run(&[Warn, OK], IGNORED), (LocalState::WarnOk, OK, Rule::RecoveredWarn));
    }

    #[test]
    fn test_clean_history_is_ok() {
        assert_eq!(run(&[OK, OK, OK], PLAIN), (LocalState::OK, OK, Rule::Healthy));
        assert_eq!(run(&[OK], IGNORED), (LocalState::OK, OK, Rule::Healthy));
    }

    #[test]
    fn test_single_sample_skips_history() {
        assert_eq!(run(&[OK], PLAIN).2, Rule::Healthy);
        assert_eq!(run(&[Warn], PLAIN), (LocalState::Warn, Warn, Rule::LastDown));
    }

    #[test]
    fn test_only_last_down() {
        assert_eq!(run(&[OK, KO], ONLY_LAST), (LocalState::KO, KO, Rule::OnlyLastDown));
        assert_eq!(run(&[OK, Warn], ONLY_LAST), (LocalState::Warn, Warn, Rule::OnlyLastDown));
        assert_eq!(run(&[OK, KO], BOTH), (LocalState::Warn, OK, Rule::OnlyLastIgnoredDown));
        assert_eq!(run(&[KO, Warn], BOTH), (LocalState::Warn, OK, Rule::OnlyLastIgnoredDown));
    }

    #[test]
    fn test_only_last_up_keeps_global_ok() {
        // History still softens the local state, but never the global one.
        assert_eq!(run(&[KO, OK], ONLY_LAST), (LocalState::Warn, OK, Rule::RecentKo));
        assert_eq!(run(&[KO, OK], BOTH), (LocalState::Warn, OK, Rule::RecentKoIgnored));
        assert_eq!(run(&[Warn, OK], ONLY_LAST), (LocalState::WarnOk, OK, Rule::RecoveredWarn));
        assert_eq!(run(&[OK, OK], ONLY_LAST), (LocalState::OK, OK, Rule::Healthy));
    }

    #[test]
    fn test_ignored_never_alerts_globally() {
        let histories: [&[HeartbeatStatus]; 6] = [
            &[KO],
            &[KO, KO],
            &[OK, Warn],
            &[KO, OK],
            &[Warn, KO, OK],
            &[OK, OK, KO],
        ];
        for history in histories {
            for flags in [IGNORED, BOTH] {
                let (local, global, _) = run(history, flags);
                assert_eq!(global, OK, "history {:?}", history);
                // A down monitor stays visible locally.
                if history.iter().any(|s| *s != OK) {
                    assert_eq!(local, LocalState::Warn, "history {:?}", history);
                }
            }
        }
    }

    #[test]
    fn test_classification_is_repeatable() {
        let history = samples(&[Warn, KO, OK, Warn, OK]);
        for flags in [PLAIN, IGNORED, ONLY_LAST, BOTH] {
            assert_eq!(classify(&history, flags), classify(&history, flags));
        }
    }
}
