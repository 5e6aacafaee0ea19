use anyhow::Context;
use gearspin_manifest::{manifest, CheckResult, ManifestEntry, TestReport, CONTENT_CHECKS};
use std::time::Duration;


/// Per-entry probe timeout. Each entry is probed exactly once, no retries.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The root-page check gets longer since it also downloads the body for
/// content validation.
const ROOT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes the fixed asset manifest against a running server and validates the
/// root page content. Checks run sequentially in declared order so reports
/// are reproducible.
#[derive(Debug, Clone)]
pub struct Verifier {
    client: reqwest::Client,
    base_url: String,
}

impl Verifier {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One GET against a manifest entry. Any 2xx response is reachable, even
    /// with an empty body; everything else becomes a failed result with a
    /// human-readable reason.
    pub async fn probe(&self, entry: &ManifestEntry) -> CheckResult {
        let url = format!("{}/{}", self.base_url, entry.path);
        let sent = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match sent {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(body) => CheckResult::passed_file(&entry.description, body.len() as u64),
                Err(e) => CheckResult::failed(&entry.description, format!("read body: {e}")),
            },
            Ok(resp) => CheckResult::failed(&entry.description, format!("HTTP {}", resp.status())),
            Err(e) => CheckResult::failed(&entry.description, request_reason(&e)),
        }
    }

    /// Probes every manifest entry in declared order.
    pub async fn check_assets(&self) -> Vec<CheckResult> {
        let mut results = Vec::new();
        for entry in manifest() {
            let result = self.probe(&entry).await;
            if let gearspin_manifest::CheckOutcome::Failed { reason } = &result.outcome {
                tracing::warn!(path = %entry.path, %reason, "asset probe failed");
            }
            results.push(result);
        }
        results
    }

    /// Fetches the root page and checks each expected substring independently.
    ///
    /// The returned flag reports only whether the GET itself succeeded; a
    /// missing substring is a per-item failure, not a server failure.
    pub async fn check_root_page(&self) -> (bool, Vec<CheckResult>) {
        let url = format!("{}/", self.base_url);
        let body = match self
            .client
            .get(&url)
            .timeout(ROOT_PAGE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, "root page body unreadable");
                    return (false, Vec::new());
                }
            },
            Err(e) => {
                tracing::warn!(reason = %request_reason(&e), "root page request failed");
                return (false, Vec::new());
            }
        };

        let results = CONTENT_CHECKS
            .iter()
            .map(|(needle, description)| {
                if body.contains(needle) {
                    CheckResult::passed(*description)
                } else {
                    CheckResult::failed(*description, format!("page body does not contain {needle:?}"))
                }
            })
            .collect();
        (true, results)
    }

    /// One full verification run: root-page check first, then the asset
    /// batch. Both are reported independently; neither gates the other.
    pub async fn run(&self) -> TestReport {
        let (server_ok, content) = self.check_root_page().await;
        let assets = self.check_assets().await;
        TestReport {
            server_ok,
            content,
            assets,
        }
    }
}

fn request_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
