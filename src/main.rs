//! kumapoll - Uptime Kuma status-page poller
//!
//! Fetches one or more status pages, classifies every monitor from its
//! heartbeat history and prints an aligned report for a terminal or a
//! menu bar, optionally pushing problems to chat webhooks.

mod config;
mod kuma;
mod monitor;
mod notify;
mod render;
mod status;

use crate::config::{Args, RunConfig, Settings};
use crate::kuma::KumaClient;
use crate::monitor::{group_monitors, GroupRollup, Monitor};
use crate::notify::{Batcher, DiscordWebhook, Notifier};
use crate::render::{Glyphs, Renderer, MENU_BAR_SEPARATOR};
use crate::status::HeartbeatStatus;

use clap::Parser;
use std::fmt::Display;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("unable to initialise logging: {}", e);
    }

    let args = Args::parse();

    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            report_failure(args.xbar, &Glyphs::default().error, &e);
            return ExitCode::FAILURE;
        }
    };
    let run = match settings.validate() {
        Ok(run) => run,
        Err(e) => {
            report_failure(settings.xbar, &Glyphs::default().error, &e);
            return ExitCode::FAILURE;
        }
    };

    if poll(&run).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the report.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("kumapoll=warn".parse()?))
        .try_init()?;
    Ok(())
}

/// Diagnostic on stdout, behind the error glyph in menu-bar mode.
fn report_failure(menu_bar: bool, glyph: &str, err: &dyn Display) {
    if menu_bar {
        println!("{}\n{}", glyph, MENU_BAR_SEPARATOR);
    }
    println!("{}", err);
}

/// Poll every dashboard. Returns false when any of them failed.
async fn poll(run: &RunConfig) -> bool {
    let error_glyph = &run.render.glyphs.error;
    let menu_bar = run.render.menu_bar;

    let client = match KumaClient::new(&run.url, run.timeout) {
        Ok(client) => client,
        Err(e) => {
            report_failure(menu_bar, error_glyph, &e);
            return false;
        }
    };
    if let Err(e) = client.check_availability().await {
        report_failure(menu_bar, error_glyph, &e);
        return false;
    }

    let notifier = if run.notify {
        match build_notifier(run) {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                report_failure(menu_bar, error_glyph, &e);
                return false;
            }
        }
    } else {
        None
    };

    let mut healthy = true;
    for slug in &run.dashboards {
        let monitors = match client.fetch_dashboard(slug, &run.policy).await {
            Ok(monitors) => monitors,
            Err(e) => {
                report_failure(menu_bar, error_glyph, &e);
                healthy = false;
                continue;
            }
        };
        let groups = group_monitors(monitors);
        log_problems(slug, &groups);

        let rendering = Renderer::new(&run.render, run.visible).render(slug, &groups);
        tracing::info!("Main: Dashboard {} is {}", slug, rendering.global_state);
        println!("{}", rendering.document);

        if let Some(notifier) = &notifier {
            let alerts = Renderer::new(&run.render, run.notify_filter).render(slug, &groups);
            let messages = Batcher::new(run.notify_filter).batch(&alerts.document);
            if !messages.is_empty() {
                notifier.send_all(&messages).await;
            }
        }
    }

    healthy
}

fn build_notifier(run: &RunConfig) -> Result<Notifier<DiscordWebhook>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(run.timeout).build()?;
    let webhooks = run
        .notify_urls
        .iter()
        .map(|url| DiscordWebhook::new(client.clone(), url.clone()))
        .collect();
    Ok(Notifier::new(webhooks, run.notify_delay))
}

fn log_problems(slug: &str, groups: &[GroupRollup]) {
    for group in groups {
        let severity = group.rollup().severity();
        if severity != HeartbeatStatus::OK {
            tracing::info!("Main: {}/{} is {}", slug, group.group.name, severity);
        }
        for monitor in &group.monitors {
            log_last_beat(slug, monitor);
        }
    }
}

fn log_last_beat(slug: &str, monitor: &Monitor) {
    let Some(last) = monitor.samples().last() else {
        return;
    };
    if last.status.is_down() {
        tracing::debug!(
            "Main: {}/{} down since {} ({:?}, ping {:?}): {}",
            slug,
            monitor.name,
            last.timestamp,
            monitor.classification().rule,
            last.latency,
            last.message
        );
    }
}
