//! Configuration module for kumapoll.
//!
//! Settings are layered, later sources winning: built-in defaults, a YAML
//! config file, `KUMAPOLL_*` environment variables, then command-line flags.
//! The merged [`Settings`] are validated into an immutable [`RunConfig`].

use crate::notify::DiscordWebhook;
use crate::render::{AnsiColor, Glyphs, Palette, RenderConfig};
use crate::status::{IgnorePolicy, PatternError, StatusFilter};

use ::config::{Config, Environment, File, FileFormat};
use clap::Parser;
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

const ENV_PREFIX: &str = "KUMAPOLL";
const CONFIG_FILE: &str = "kumapoll.yaml";

/// Keys read from the environment as comma-separated lists.
const LIST_KEYS: [&str; 6] = [
    "dashboards",
    "status",
    "notify_status",
    "ignore",
    "only_last",
    "notify_url",
];

#[derive(Parser, Debug, Default)]
#[command(name = "kumapoll")]
#[command(about = "Poll Uptime Kuma status pages and report monitor health")]
pub struct Args {
    /// Status-page slugs to poll (default: all)
    pub dashboards: Vec<String>,

    /// Uptime Kuma base URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Severities to display: ok, warn, ko or all
    #[arg(long, value_delimiter = ',')]
    pub status: Option<Vec<String>>,

    /// Severities to notify about: ok, warn, ko or all
    #[arg(long, value_delimiter = ',')]
    pub notify_status: Option<Vec<String>>,

    /// Monitor to leave out of global alerting (exact name or re:<regex>)
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Monitor classified from its latest beat only (exact name or re:<regex>)
    #[arg(long)]
    pub only_last: Vec<String>,

    /// Emit xbar/SwiftBar menu-bar markup
    #[arg(long)]
    pub xbar: bool,

    /// Send chat notifications
    #[arg(long)]
    pub notify: bool,

    /// Webhook target (https:// URL or discord://token@id)
    #[arg(long)]
    pub notify_url: Vec<String>,

    /// Hide the heartbeat column
    #[arg(long)]
    pub no_beat: bool,

    /// Draw beats with emoji squares
    #[arg(long)]
    pub beat_emoji: bool,

    /// Disable emoji icons
    #[arg(long)]
    pub no_emoji: bool,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause between notification messages, in milliseconds
    #[arg(long)]
    pub notify_delay_ms: Option<u64>,
}

/// Color names per state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub ok: String,
    pub warn: String,
    pub ko: String,
    pub warn_ok: String,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            ok: "green".to_string(),
            warn: "yellow".to_string(),
            ko: "red".to_string(),
            warn_ok: "cyan".to_string(),
        }
    }
}

/// Glyph overrides. Defaults come from [`Glyphs`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IconSettings {
    pub term: String,
    pub ok: String,
    pub warn: String,
    pub ko: String,
    pub warn_ok: String,
    pub error: String,
    pub ok_beat: String,
    pub warn_beat: String,
    pub ko_beat: String,
}

impl Default for IconSettings {
    fn default() -> Self {
        let glyphs = Glyphs::default();
        Self {
            term: glyphs.term,
            ok: glyphs.ok,
            warn: glyphs.warn,
            ko: glyphs.ko,
            warn_ok: glyphs.warn_ok,
            error: glyphs.error,
            ok_beat: glyphs.ok_beat,
            warn_beat: glyphs.warn_beat,
            ko_beat: glyphs.ko_beat,
        }
    }
}

/// Merged, unvalidated settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: Option<String>,
    pub dashboards: Vec<String>,
    pub status: Vec<String>,
    pub notify_status: Vec<String>,
    pub ignore: Vec<String>,
    pub only_last: Vec<String>,
    pub xbar: bool,
    pub notify: bool,
    pub notify_url: Vec<String>,
    pub beat: bool,
    pub beat_emoji: bool,
    pub emoji: bool,
    pub color: ColorSettings,
    pub icon: IconSettings,
    pub timeout_secs: u64,
    pub notify_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: None,
            dashboards: vec!["all".to_string()],
            status: vec!["ko".to_string(), "warn".to_string()],
            notify_status: vec!["ko".to_string()],
            ignore: Vec::new(),
            only_last: Vec::new(),
            xbar: false,
            notify: false,
            notify_url: Vec::new(),
            beat: true,
            beat_emoji: false,
            emoji: true,
            color: ColorSettings::default(),
            icon: IconSettings::default(),
            timeout_secs: 10,
            notify_delay_ms: 500,
        }
    }
}

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing dashboard url: pass --url, set url in kumapoll.yaml or KUMAPOLL_URL")]
    MissingUrl,
    #[error("invalid dashboard url {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Pattern(#[from] PatternError),
    #[error("icon.{key} must be {expected}, got {value:?}")]
    InvalidGlyph {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("color.{key}: unknown color {value:?}")]
    UnknownColor { key: &'static str, value: String },
    #[error("{key}: unknown status {value:?}, expected ok, warn, ko or all")]
    UnknownStatus { key: &'static str, value: String },
    #[error("invalid notify url {0}")]
    InvalidNotifyUrl(String),
    #[error("notifications enabled but no notify_url given")]
    MissingNotifyUrl,
    #[error("unable to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Every error found while loading or validating, reported together.
#[derive(Debug)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

impl From<ConfigError> for ConfigErrors {
    fn from(err: ConfigError) -> Self {
        Self(vec![err])
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: Url,
    pub dashboards: Vec<String>,
    pub policy: IgnorePolicy,
    pub render: RenderConfig,
    /// Severities shown in the rendered document.
    pub visible: StatusFilter,
    /// Severities eligible for chat notifications.
    pub notify_filter: StatusFilter,
    pub notify: bool,
    pub notify_urls: Vec<Url>,
    pub timeout: Duration,
    pub notify_delay: Duration,
}

/// `KUMAPOLL_*` variables: `__` nests keys, list keys split on commas.
fn environment() -> Environment {
    let mut env = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in LIST_KEYS {
        env = env.with_list_parse_key(key);
    }
    env
}

/// First existing config file among the default locations.
pub fn find_config_file(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut candidates = vec![cwd.join(CONFIG_FILE)];
    if let Some(home) = home {
        let config_dir = home.join(".config");
        candidates.push(config_dir.join("kumapoll").join(CONFIG_FILE));
        candidates.push(config_dir.join(CONFIG_FILE));
    }
    candidates.into_iter().find(|p| p.is_file())
}

impl Settings {
    /// Merge defaults, config file, environment and flags.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        Self::load_with(args, environment())
    }

    /// Same as [`Settings::load`] with an explicit environment source.
    fn load_with(args: &Args, env: Environment) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => Some((path.clone(), true)),
            None => {
                let cwd = std::env::current_dir().unwrap_or_default();
                let home = std::env::var_os("HOME").map(PathBuf::from);
                find_config_file(&cwd, home.as_deref()).map(|p| (p, false))
            }
        };

        let mut builder = Config::builder();
        if let Some((path, required)) = file {
            tracing::debug!("Config: Reading {}", path.display());
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Yaml)
                    .required(required),
            );
        }
        builder = builder.add_source(env);

        Self::apply_args(builder, args)?
            .build()?
            .try_deserialize()
            .map_err(ConfigError::from)
    }

    fn apply_args(
        mut builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
        args: &Args,
    ) -> Result<::config::ConfigBuilder<::config::builder::DefaultState>, ConfigError> {
        builder = builder
            .set_override_option("url", args.url.clone())?
            .set_override_option("status", args.status.clone())?
            .set_override_option("notify_status", args.notify_status.clone())?
            .set_override_option("timeout_secs", args.timeout.map(|t| t as i64))?
            .set_override_option("notify_delay_ms", args.notify_delay_ms.map(|d| d as i64))?;

        let lists = [
            ("dashboards", &args.dashboards),
            ("ignore", &args.ignore),
            ("only_last", &args.only_last),
            ("notify_url", &args.notify_url),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                builder = builder.set_override(key, values.clone())?;
            }
        }

        let switches = [
            ("xbar", args.xbar, true),
            ("notify", args.notify, true),
            ("beat", args.no_beat, false),
            ("beat_emoji", args.beat_emoji, true),
            ("emoji", args.no_emoji, false),
        ];
        for (key, given, value) in switches {
            if given {
                builder = builder.set_override(key, value)?;
            }
        }

        Ok(builder)
    }

    /// Check every setting and build the run configuration. All problems
    /// are collected before giving up.
    pub fn validate(&self) -> Result<RunConfig, ConfigErrors> {
        let mut errors = Vec::new();

        let url = match self.url.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(ConfigError::MissingUrl);
                None
            }
            Some(raw) => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(_) => {
                    errors.push(ConfigError::InvalidUrl(format!("{}: expected http(s)", raw)));
                    None
                }
                Err(e) => {
                    errors.push(ConfigError::InvalidUrl(format!("{}: {}", raw, e)));
                    None
                }
            },
        };

        let policy = IgnorePolicy::new(&self.ignore, &self.only_last)
            .map_err(|errs| errors.extend(errs.into_iter().map(ConfigError::from)))
            .ok();

        let visible = status_filter("status", &self.status, &mut errors);
        let notify_filter = status_filter("notify_status", &self.notify_status, &mut errors);

        let palette = Palette {
            ok: color("ok", &self.color.ok, &mut errors),
            warn: color("warn", &self.color.warn, &mut errors),
            ko: color("ko", &self.color.ko, &mut errors),
            warn_ok: color("warn_ok", &self.color.warn_ok, &mut errors),
        };
        let glyphs = self.glyphs(&mut errors);

        let mut notify_urls = Vec::new();
        for raw in &self.notify_url {
            match DiscordWebhook::parse_target(raw) {
                Ok(url) => notify_urls.push(url),
                Err(e) => errors.push(ConfigError::InvalidNotifyUrl(e)),
            }
        }
        if self.notify && self.notify_url.is_empty() {
            errors.push(ConfigError::MissingNotifyUrl);
        }

        let dashboards: Vec<String> = self
            .dashboards
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        match (url, policy) {
            (Some(url), Some(policy)) if errors.is_empty() => Ok(RunConfig {
                url,
                dashboards: if dashboards.is_empty() {
                    vec!["all".to_string()]
                } else {
                    dashboards
                },
                policy,
                render: RenderConfig {
                    show_beats: self.beat,
                    emoji_beats: self.beat_emoji && self.emoji,
                    show_icons: self.emoji,
                    menu_bar: self.xbar,
                    palette,
                    glyphs,
                },
                visible,
                notify_filter,
                notify: self.notify,
                notify_urls,
                timeout: Duration::from_secs(self.timeout_secs),
                notify_delay: Duration::from_millis(self.notify_delay_ms),
            }),
            _ => Err(ConfigErrors(errors)),
        }
    }

    fn glyphs(&self, errors: &mut Vec<ConfigError>) -> Glyphs {
        let icon = &self.icon;
        if icon.term.chars().count() != 1 {
            errors.push(ConfigError::InvalidGlyph {
                key: "term",
                value: icon.term.clone(),
                expected: "exactly one character",
            });
        }

        let single = [
            ("ok", &icon.ok),
            ("warn", &icon.warn),
            ("ko", &icon.ko),
            ("warn_ok", &icon.warn_ok),
            ("error", &icon.error),
            ("ok_beat", &icon.ok_beat),
            ("warn_beat", &icon.warn_beat),
            ("ko_beat", &icon.ko_beat),
        ];
        for (key, value) in single {
            if value.graphemes(true).count() > 1 {
                errors.push(ConfigError::InvalidGlyph {
                    key,
                    value: value.clone(),
                    expected: "at most one grapheme",
                });
            }
        }

        Glyphs {
            term: icon.term.clone(),
            ok: icon.ok.clone(),
            warn: icon.warn.clone(),
            ko: icon.ko.clone(),
            warn_ok: icon.warn_ok.clone(),
            error: icon.error.clone(),
            ok_beat: icon.ok_beat.clone(),
            warn_beat: icon.warn_beat.clone(),
            ko_beat: icon.ko_beat.clone(),
        }
    }
}

fn status_filter(key: &'static str, keywords: &[String], errors: &mut Vec<ConfigError>) -> StatusFilter {
    StatusFilter::from_keywords(keywords).unwrap_or_else(|value| {
        errors.push(ConfigError::UnknownStatus { key, value });
        StatusFilter::default()
    })
}

fn color(key: &'static str, name: &str, errors: &mut Vec<ConfigError>) -> AnsiColor {
    AnsiColor::from_name(name).unwrap_or_else(|| {
        errors.push(ConfigError::UnknownColor {
            key,
            value: name.to_string(),
        });
        AnsiColor::WHITE
    })
}
