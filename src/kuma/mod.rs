//! Uptime Kuma status-page client.
//!
//! Reads the monitor titles embedded in a status page and the live
//! heartbeat feed, and turns them into classified [`Monitor`]s.

mod models;

pub use models::*;

use crate::monitor::Monitor;
use crate::status::{HeartbeatSample, IgnorePolicy};

use regex::Regex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Acquisition error types.
#[derive(Error, Debug)]
pub enum KumaError {
    #[error("Dashboard unavailable: not connected to kuma at {0}")]
    Unavailable(String),
    #[error("Dashboard unavailable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Dashboard unavailable: {url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("Dashboard unavailable: unable to get dashboard {0}")]
    MissingPreload(String),
    #[error("Dashboard unavailable: malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// HTTP client bound to one Kuma instance.
#[derive(Debug, Clone)]
pub struct KumaClient {
    client: reqwest::Client,
    base: String,
}

impl KumaClient {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, KumaError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Check that the instance answers `HEAD /dashboard` with 200.
    pub async fn check_availability(&self) -> Result<(), KumaError> {
        let url = format!("{}/dashboard", self.base);
        match self.client.head(&url).send().await {
            Ok(r) if r.status() == reqwest::StatusCode::OK => Ok(()),
            Ok(r) => {
                tracing::debug!("Kuma: {} answered {}", url, r.status());
                Err(KumaError::Unavailable(self.base.clone()))
            }
            Err(e) => {
                tracing::debug!("Kuma: {} unreachable: {}", url, e);
                Err(KumaError::Unavailable(self.base.clone()))
            }
        }
    }

    /// Monitor titles of a status page.
    pub async fn fetch_titles(&self, slug: &str) -> Result<HashMap<String, MonitorInfo>, KumaError> {
        let body = self.get_text(&format!("{}/status/{}", self.base, slug)).await?;
        parse_preload(&body, slug)
    }

    /// Heartbeat history of a status page, oldest beat first per monitor.
    pub async fn fetch_heartbeats(
        &self,
        slug: &str,
    ) -> Result<HashMap<String, Vec<HeartbeatSample>>, KumaError> {
        let body = self
            .get_text(&format!("{}/api/status-page/heartbeat/{}", self.base, slug))
            .await?;
        parse_heartbeats(&body)
    }

    /// Fetch titles and heartbeats and build classified monitors.
    pub async fn fetch_dashboard(
        &self,
        slug: &str,
        policy: &IgnorePolicy,
    ) -> Result<Vec<Monitor>, KumaError> {
        let titles = self.fetch_titles(slug).await?;
        let heartbeats = self.fetch_heartbeats(slug).await?;

        let monitors = build_monitors(&titles, heartbeats, policy);
        tracing::debug!("Kuma: Dashboard {} has {} monitors", slug, monitors.len());
        Ok(monitors)
    }

    async fn get_text(&self, url: &str) -> Result<String, KumaError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KumaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Extract monitor titles from a status page's HTML.
pub fn parse_preload(html: &str, slug: &str) -> Result<HashMap<String, MonitorInfo>, KumaError> {
    static PRELOAD: OnceLock<Regex> = OnceLock::new();
    let re = PRELOAD.get_or_init(|| Regex::new(r"window\.preloadData\s*=\s*(\{.*\});").unwrap());

    let blob = re
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| KumaError::MissingPreload(slug.to_string()))?;

    // Older pages embed the blob with single quotes.
    let json = blob.as_str().replace('\'', "\"");
    let preload: PreloadData = serde_json::from_str(&json)?;
    Ok(preload.titles())
}

/// Parse the heartbeat feed.
pub fn parse_heartbeats(body: &str) -> Result<HashMap<String, Vec<HeartbeatSample>>, KumaError> {
    let payload: HeartbeatPayload = serde_json::from_str(body)?;
    Ok(payload.heartbeat_list)
}

/// Join titles with heartbeats. A monitor without a title gets an empty
/// name and the default group.
pub fn build_monitors(
    titles: &HashMap<String, MonitorInfo>,
    heartbeats: HashMap<String, Vec<HeartbeatSample>>,
    policy: &IgnorePolicy,
) -> Vec<Monitor> {
    heartbeats
        .into_iter()
        .map(|(id, samples)| {
            let info = titles.get(&id).cloned().unwrap_or_default();
            Monitor::new(id, info.name, info.group, samples, policy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Group;
    use crate::status::{HeartbeatStatus, LocalState};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STATUS_PAGE: &str = r#"<html><script>
        window.preloadData = {'config':{'slug':'home','title':'Home'},'publicGroupList':[{'id':1,'name':' Web ','monitorList':[{'id':10,'name':'nginx '},{'id':11,'name':'api'}]},{'id':2,'name':'Databases','monitorList':[{'id':20,'name':'postgres'}]}],'maintenanceList':[]};
    </script></html>"#;

    const HEARTBEATS: &str = r#"{
        "heartbeatList": {
            "10": [
                {"status":1,"time":"2024-01-01 10:00:00.000","msg":"","ping":12},
                {"status":0,"time":"2024-01-01 10:01:00.000","msg":"timeout","ping":null}
            ],
            "11": [{"status":1,"time":"2024-01-01 10:00:00.000","msg":"","ping":5}],
            "20": [
                {"status":2,"time":"2024-01-01 10:00:00.000","msg":"pending","ping":null},
                {"status":1,"time":"2024-01-01 10:01:00.000","msg":"","ping":3}
            ],
            "99": []
        },
        "uptimeList": {"10_24": 0.5}
    }"#;

    #[test]
    fn test_parse_preload() {
        let titles = parse_preload(STATUS_PAGE, "home").unwrap();
        assert_eq!(titles.len(), 3);
        assert_eq!(
            titles["10"],
            MonitorInfo {
                name: "nginx".to_string(),
                group: Group::new(1, "Web"),
            }
        );
        assert_eq!(titles["20"].group, Group::new(2, "Databases"));
    }

    #[test]
    fn test_parse_preload_missing_blob() {
        match parse_preload("<html></html>", "home") {
            Err(KumaError::MissingPreload(slug)) => assert_eq!(slug, "home"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_public_groups_win_over_maintenance() {
        let page = r#"window.preloadData = {"publicGroupList":[{"id":1,"name":"Web","monitorList":[{"id":10,"name":"nginx"}]}],"maintenanceList":[{"id":7,"name":"Planned","monitorList":[{"id":10,"name":"nginx"}]}]};"#;
        let titles = parse_preload(page, "home").unwrap();
        assert_eq!(titles["10"].group, Group::new(1, "Web"));
    }

    #[test]
    fn test_parse_heartbeats() {
        let beats = parse_heartbeats(HEARTBEATS).unwrap();
        assert_eq!(beats["10"].len(), 2);
        assert_eq!(beats["10"][1].status, HeartbeatStatus::KO);
        assert_eq!(beats["10"][1].message, "timeout");
        assert_eq!(beats["11"][0].latency, Some(5.0));
        assert!(beats["99"].is_empty());

        assert!(matches!(
            parse_heartbeats(r#"{"heartbeatList":{"1":[{"status":1,"time":"soon"}]}}"#),
            Err(KumaError::Payload(_))
        ));
    }

    #[test]
    fn test_build_monitors_without_title() {
        let titles = parse_preload(STATUS_PAGE, "home").unwrap();
        let beats = parse_heartbeats(HEARTBEATS).unwrap();
        let monitors = build_monitors(&titles, beats, &IgnorePolicy::default());

        assert_eq!(monitors.len(), 4);
        let orphan = monitors.iter().find(|m| m.id == "99").unwrap();
        assert_eq!(orphan.name, "");
        assert_eq!(orphan.group, Group::default());
        assert_eq!(orphan.local_state(), LocalState::OK);

        let postgres = monitors.iter().find(|m| m.name == "postgres").unwrap();
        assert_eq!(postgres.local_state(), LocalState::WarnOk);
    }

    #[tokio::test]
    async fn test_fetch_dashboard() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status/home"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status-page/heartbeat/home"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HEARTBEATS))
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let base = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
        let client = KumaClient::new(&base, Duration::from_secs(5)).unwrap();
        client.check_availability().await.unwrap();

        let policy = IgnorePolicy::new(&["nginx"], &[]).unwrap();
        let monitors = client.fetch_dashboard("home", &policy).await.unwrap();
        let nginx = monitors.iter().find(|m| m.name == "nginx").unwrap();
        assert_eq!(nginx.local_state(), LocalState::Warn);
        assert_eq!(nginx.global_state(), HeartbeatStatus::OK);
    }

    #[tokio::test]
    async fn test_unavailable_dashboard() {
        let mock_server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/dashboard"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let base = Url::parse(&mock_server.uri()).unwrap();
        let client = KumaClient::new(&base, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.check_availability().await,
            Err(KumaError::Unavailable(_))
        ));
        assert!(matches!(
            client.fetch_titles("gone").await,
            Err(KumaError::Status { status: 404, .. })
        ));
    }
}
