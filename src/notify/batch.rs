//! Splitting a rendered document into webhook-sized messages.

use crate::render::{RenderedDocument, RenderedGroup, RenderedMonitor};
use crate::status::{HeartbeatStatus, StatusFilter};
use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Webhook payload ceiling (2000) minus a safety margin, in characters.
pub const MESSAGE_BUDGET: usize = 1990;

const FENCE_OPEN: &str = "```ansi\n";
const FENCE_CLOSE: &str = "```";

/// Accent colors for chat embeds.
pub const ACCENT_KO: u32 = 0xDC143C;
pub const ACCENT_WARN: u32 = 0xFFD700;
pub const ACCENT_OK: u32 = 0x228B22;

/// A finished chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub body: String,
    /// Worst state among the monitors in this message.
    pub worst: HeartbeatStatus,
}

impl Message {
    pub fn accent(&self) -> u32 {
        match self.worst {
            HeartbeatStatus::KO => ACCENT_KO,
            HeartbeatStatus::Warn => ACCENT_WARN,
            HeartbeatStatus::OK => ACCENT_OK,
        }
    }
}

/// Message under construction. Tracks its size in characters.
struct MessageBuilder {
    body: String,
    chars: usize,
    worst: HeartbeatStatus,
    monitors: usize,
}

impl MessageBuilder {
    fn open(prefix: &str) -> Self {
        Self {
            body: prefix.to_string(),
            chars: prefix.chars().count(),
            worst: HeartbeatStatus::OK,
            monitors: 0,
        }
    }

    /// Characters still available once the fence is closed.
    fn room(&self, budget: usize) -> usize {
        budget.saturating_sub(self.chars + FENCE_CLOSE.len())
    }

    fn push(&mut self, block: &str, state: HeartbeatStatus) {
        self.body.push_str(block);
        self.chars += block.chars().count();
        self.worst = self.worst.worst(state);
        self.monitors += 1;
    }

    fn close(mut self) -> Message {
        self.body.push_str(FENCE_CLOSE);
        Message {
            body: self.body,
            worst: self.worst,
        }
    }
}

/// Builds chat messages from a rendered document.
#[derive(Debug, Clone)]
pub struct Batcher {
    filter: StatusFilter,
    budget: usize,
}

impl Batcher {
    pub fn new(filter: StatusFilter) -> Self {
        Self {
            filter,
            budget: MESSAGE_BUDGET,
        }
    }

    #[cfg(test)]
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Every group starts a new message; long groups continue in further
    /// messages, each with its own fence.
    pub fn batch(&self, document: &RenderedDocument) -> Vec<Message> {
        let mut messages = Vec::new();

        for group in &document.groups {
            if !self.group_selected(group) {
                continue;
            }
            let monitors: Vec<&RenderedMonitor> = group
                .monitors
                .iter()
                .filter(|m| self.filter.keeps_state(m.state))
                .collect();
            if monitors.is_empty() {
                continue;
            }

            let header = self.group_header(&group.name);
            let mut message = MessageBuilder::open(&header);
            // Largest block that fits in a continuation message.
            let max_block = self
                .budget
                .saturating_sub(FENCE_OPEN.len() + FENCE_CLOSE.len());

            for monitor in monitors {
                let mut block = truncate_chars(&monitor_block(monitor), max_block);
                let len = block.chars().count();

                if len > message.room(self.budget) {
                    if message.monitors == 0 {
                        block = truncate_chars(&block, message.room(self.budget));
                    } else {
                        messages.push(message.close());
                        message = MessageBuilder::open(FENCE_OPEN);
                    }
                }
                message.push(&block, monitor.state.severity());
            }
            messages.push(message.close());
        }

        messages
    }

    fn group_selected(&self, group: &RenderedGroup) -> bool {
        let rollup = group.rollup();
        !((rollup.all_ok && !self.filter.ok)
            || (rollup.any_ko && !self.filter.ko)
            || (rollup.all_warn && !self.filter.warn))
    }

    fn group_header(&self, name: &str) -> String {
        let frame = "\n### \n".len() + FENCE_OPEN.len() + FENCE_CLOSE.len();
        let name = truncate_chars(name, self.budget.saturating_sub(frame));
        format!("\n### {}\n{}", name, FENCE_OPEN)
    }
}

fn monitor_block(monitor: &RenderedMonitor) -> String {
    format!(
        "{} {}\n{}\n",
        monitor.status_icon,
        monitor.padded_name,
        monitor.emoji_beat_string.trim_end()
    )
}

/// Keep at most `max` characters, cutting only between grapheme clusters
/// and never inside an escape sequence.
fn truncate_chars(text: &str, max: usize) -> String {
    static PARTIAL_ESCAPE: OnceLock<Regex> = OnceLock::new();
    let re = PARTIAL_ESCAPE.get_or_init(|| Regex::new(r"\x1b(\[[0-9;]*)?$").unwrap());

    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if used + len > max {
            break;
        }
        out.push_str(grapheme);
        used += len;
    }

    if used < text.chars().count() {
        if let Some(m) = re.find(&out) {
            out.truncate(m.start());
        }
    }
    out
}
