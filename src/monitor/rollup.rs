//! Group rollups.

use super::{Group, Monitor};
use crate::status::{HeartbeatStatus, LocalState};
use std::collections::HashMap;

/// Group-level predicates derived from member local states.
///
/// They only pick how a group is presented; they never feed back into
/// member classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    /// No member is `Warn` or `KO`.
    pub all_ok: bool,
    /// At least one member is `KO`.
    pub any_ko: bool,
    /// No member is `OK` or `KO`.
    pub all_warn: bool,
}

impl Rollup {
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = LocalState>,
    {
        let mut rollup = Rollup {
            all_ok: true,
            any_ko: false,
            all_warn: true,
        };
        for state in states {
            match state.severity() {
                HeartbeatStatus::KO => {
                    rollup.any_ko = true;
                    rollup.all_ok = false;
                    rollup.all_warn = false;
                }
                HeartbeatStatus::Warn => rollup.all_ok = false,
                HeartbeatStatus::OK => rollup.all_warn = false,
            }
        }
        rollup
    }

    /// Severity used to present the group, worst first.
    pub fn severity(&self) -> HeartbeatStatus {
        if self.any_ko {
            HeartbeatStatus::KO
        } else if self.all_warn {
            HeartbeatStatus::Warn
        } else {
            HeartbeatStatus::OK
        }
    }
}

/// The monitors of one group, ordered by name.
#[derive(Debug, Clone)]
pub struct GroupRollup {
    pub group: Group,
    pub monitors: Vec<Monitor>,
}

impl GroupRollup {
    pub fn rollup(&self) -> Rollup {
        Rollup::from_states(self.monitors.iter().map(Monitor::local_state))
    }
}

/// Bucket monitors by group. Groups are ordered by name, members by name.
pub fn group_monitors<I>(monitors: I) -> Vec<GroupRollup>
where
    I: IntoIterator<Item = Monitor>,
{
    let mut buckets: HashMap<Group, Vec<Monitor>> = HashMap::new();
    for monitor in monitors {
        buckets.entry(monitor.group.clone()).or_default().push(monitor);
    }

    let mut groups: Vec<GroupRollup> = buckets
        .into_iter()
        .map(|(group, mut monitors)| {
            monitors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            GroupRollup { group, monitors }
        })
        .collect();

    groups.sort_by(|a, b| {
        a.group
            .name
            .cmp(&b.group.name)
            .then_with(|| a.group.id.cmp(&b.group.id))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{samples, IgnorePolicy};
    use HeartbeatStatus::{Warn, KO, OK};

    fn monitor(id: &str, name: &str, group: Group, statuses: &[HeartbeatStatus]) -> Monitor {
        Monitor::new(id, name, group, samples(statuses), &IgnorePolicy::default())
    }

    #[test]
    fn test_rollup_predicates() {
        let r = Rollup::from_states([LocalState::OK, LocalState::WarnOk]);
        assert_eq!(r, Rollup { all_ok: true, any_ko: false, all_warn: false });
        assert_eq!(r.severity(), OK);

        let r = Rollup::from_states([LocalState::Warn, LocalState::Warn]);
        assert_eq!(r, Rollup { all_ok: false, any_ko: false, all_warn: true });
        assert_eq!(r.severity(), Warn);

        let r = Rollup::from_states([LocalState::OK, LocalState::KO, LocalState::Warn]);
        assert!(r.any_ko && !r.all_ok && !r.all_warn);
        assert_eq!(r.severity(), KO);

        // Mixed OK and Warn is neither all-OK nor all-Warn.
        let r = Rollup::from_states([LocalState::OK, LocalState::Warn]);
        assert!(!r.all_ok && !r.all_warn && !r.any_ko);
        assert_eq!(r.severity(), OK);
    }

    #[test]
    fn test_any_ko_iff_member_ko() {
        let states = [LocalState::OK, LocalState::Warn, LocalState::KO, LocalState::WarnOk];
        for a in states {
            for b in states {
                let r = Rollup::from_states([a, b]);
                assert_eq!(r.any_ko, a == LocalState::KO || b == LocalState::KO);
                if a.severity() != b.severity() {
                    assert!(!(r.all_ok && r.all_warn));
                }
            }
        }
    }

    #[test]
    fn test_group_monitors_orders_groups_and_members() {
        let web = Group::new(2, "Web");
        let db = Group::new(1, "Databases");
        let groups = group_monitors(vec![
            monitor("1", "nginx", web.clone(), &[OK]),
            monitor("2", "postgres", db.clone(), &[KO]),
            monitor("3", "apache", web.clone(), &[OK]),
            monitor("4", "mysql", db.clone(), &[OK]),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group, db);
        assert_eq!(groups[1].group, web);

        let names: Vec<_> = groups[1].monitors.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["apache", "nginx"]);
        assert!(groups[0].rollup().any_ko);
        assert!(groups[1].rollup().all_ok);
    }

    #[test]
    fn test_group_identity_is_id_and_name() {
        let groups = group_monitors(vec![
            monitor("1", "a", Group::new(1, "Edge"), &[OK]),
            monitor("2", "b", Group::new(2, "Edge"), &[OK]),
            monitor("3", "c", Group::new(1, "Edge"), &[OK]),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].monitors.len(), 2);
        assert_eq!(groups[1].monitors.len(), 1);
    }
}
