//! Dashboard payload types.

use crate::monitor::Group;
use crate::status::HeartbeatSample;
use serde::Deserialize;
use std::collections::HashMap;

/// Blob embedded in the status page as `window.preloadData`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadData {
    #[serde(default)]
    pub public_group_list: Vec<KumaGroup>,
    #[serde(default)]
    pub maintenance_list: Vec<KumaGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KumaGroup {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub monitor_list: Vec<MonitorTitle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorTitle {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Name and group of a monitor, keyed by monitor id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorInfo {
    pub name: String,
    pub group: Group,
}

/// Live heartbeat feed of a status page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    #[serde(default)]
    pub heartbeat_list: HashMap<String, Vec<HeartbeatSample>>,
}

impl PreloadData {
    /// Flatten groups into per-monitor titles. Public groups win over
    /// maintenance entries for the same monitor.
    pub fn titles(&self) -> HashMap<String, MonitorInfo> {
        let mut titles = HashMap::new();
        for group in self.maintenance_list.iter().chain(self.public_group_list.iter()) {
            let key = Group::new(group.id, group.name.trim());
            for monitor in &group.monitor_list {
                titles.insert(
                    monitor.id.to_string(),
                    MonitorInfo {
                        name: monitor.name.trim().to_string(),
                        group: key.clone(),
                    },
                );
            }
        }
        titles
    }
}
