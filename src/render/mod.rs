//! Rendering of grouped monitors into aligned text.
//!
//! Rendering runs in two passes. The first pass measures every visible
//! monitor so the beat column has one width for the whole run; the second
//! pass builds the rows group by group.

mod style;
mod width;

pub use style::*;
pub use width::*;

use crate::monitor::{GroupRollup, Monitor, Rollup};
use crate::status::{HeartbeatStatus, LocalState, StatusFilter};
use std::fmt;

/// Font directive appended to beat rows in menu-bar mode.
pub const MENU_BAR_FONT: &str = " | font=\"FiraCode Nerd Font\"";
/// Separator between the menu-bar title and the dropdown.
pub const MENU_BAR_SEPARATOR: &str = "---";
/// Footer entry asking the menu-bar host to refresh the plugin.
pub const MENU_BAR_REFRESH: &str = "Refresh... | refresh=true";

/// One rendered monitor row.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMonitor {
    pub state: LocalState,
    pub status_icon: String,
    pub beat_string: String,
    pub emoji_beat_string: String,
    pub padded_name: String,
}

/// A rendered group. `display_name` carries the rollup color.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGroup {
    pub name: String,
    pub display_name: String,
    pub monitors: Vec<RenderedMonitor>,
}

impl RenderedGroup {
    pub fn rollup(&self) -> Rollup {
        Rollup::from_states(self.monitors.iter().map(|m| m.state))
    }
}

/// The document printed for one dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub header: String,
    pub footer: String,
    pub groups: Vec<RenderedGroup>,
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if !self.header.is_empty() {
            out.push_str(&self.header);
            out.push('\n');
        }
        for group in &self.groups {
            out.push_str(&group.display_name);
            out.push('\n');
            for monitor in &group.monitors {
                out.push_str(&monitor.padded_name);
                out.push(' ');
                out.push_str(&monitor.status_icon);
                out.push_str(&monitor.beat_string);
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(&self.footer);
        f.write_str(out.trim())
    }
}

/// Result of rendering a dashboard.
#[derive(Debug, Clone)]
pub struct Rendering {
    pub document: RenderedDocument,
    /// Worst global state across every monitor of the dashboard.
    pub global_state: HeartbeatStatus,
}

/// Column widths measured in the first pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Layout {
    name_width: usize,
    beat_width: usize,
    emoji_width: usize,
}

/// Renders grouped monitors with an immutable style and visibility filter.
pub struct Renderer<'a> {
    config: &'a RenderConfig,
    visible: StatusFilter,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a RenderConfig, visible: StatusFilter) -> Self {
        Self { config, visible }
    }

    pub fn render(&self, dashboard: &str, groups: &[GroupRollup]) -> Rendering {
        let layout = self.measure(groups);

        let mut global_state = HeartbeatStatus::OK;
        let mut rendered = Vec::new();

        for group in groups {
            for monitor in &group.monitors {
                // Once KO, the run stays KO.
                global_state = global_state.worst(monitor.global_state());
            }

            let monitors: Vec<RenderedMonitor> = group
                .monitors
                .iter()
                .filter(|m| self.visible.keeps_state(m.local_state()))
                .map(|m| self.render_monitor(m, &layout))
                .collect();

            if monitors.is_empty() {
                continue;
            }

            let mut rendered_group = RenderedGroup {
                name: group.group.name.clone(),
                display_name: String::new(),
                monitors,
            };
            rendered_group.display_name = self
                .config
                .palette
                .paint_status(rendered_group.rollup().severity(), &group.group.name);
            rendered.push(rendered_group);
        }

        let (header, footer) = if self.config.menu_bar {
            (
                format!(
                    "{} {}\n{}",
                    dashboard,
                    self.config.status_icon(global_state),
                    MENU_BAR_SEPARATOR
                ),
                MENU_BAR_REFRESH.to_string(),
            )
        } else {
            (dashboard.to_string(), String::new())
        };

        Rendering {
            document: RenderedDocument {
                header,
                footer,
                groups: rendered,
            },
            global_state,
        }
    }

    /// First pass: widest name among monitors that are either drawn or
    /// raw-visible, widest beat columns among drawn ones.
    fn measure(&self, groups: &[GroupRollup]) -> Layout {
        let mut layout = Layout::default();

        for monitor in groups.iter().flat_map(|g| g.monitors.iter()) {
            let drawn = self.visible.keeps_state(monitor.local_state());
            if drawn || self.raw_visible(monitor) {
                layout.name_width = layout.name_width.max(display_width(&monitor.name));
            }
            if drawn {
                layout.beat_width = layout.beat_width.max(display_width(&monitor.beats(self.config)));
                layout.emoji_width = layout
                    .emoji_width
                    .max(display_width(&monitor.emoji_beats(self.config)));
            }
        }

        layout
    }

    fn raw_visible(&self, monitor: &Monitor) -> bool {
        !((monitor.is_ok() && !self.visible.ok)
            || (monitor.is_warn() && !self.visible.warn)
            || (monitor.is_ko() && !self.visible.ko))
    }

    /// Second pass: one row, left-padded to the run's beat width.
    fn render_monitor(&self, monitor: &Monitor, layout: &Layout) -> RenderedMonitor {
        let beats = monitor.beats(self.config);
        // Emoji occupy two terminal cells.
        let cell = if self.config.emoji_beats { 2 } else { 1 };
        let pad = layout.beat_width.saturating_sub(display_width(&beats)) * cell;
        let mut beat_string = format!("{}{} ", spaces(pad), beats);
        if self.config.menu_bar {
            beat_string.push_str(MENU_BAR_FONT);
        }

        let emoji_beats = monitor.emoji_beats(self.config);
        let emoji_pad = layout.emoji_width.saturating_sub(display_width(&emoji_beats)) * 2;
        let emoji_beat_string = format!("{}{} ", spaces(emoji_pad), emoji_beats);

        RenderedMonitor {
            state: monitor.local_state(),
            status_icon: self.config.icon(monitor.local_state()).to_string(),
            beat_string,
            emoji_beat_string,
            padded_name: monitor.display_name(layout.name_width, self.config),
        }
    }
}
