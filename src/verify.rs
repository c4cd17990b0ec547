//! IP verification of self-declared Google crawlers.
//!
//! The vendor publishes its crawler prefixes as JSON. The list is fetched at
//! most once per process, the first time anything asks for it; a failed fetch
//! leaves an empty list in place for the rest of the run.

use ipnet::IpNet;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_RANGES_URL: &str = "https://developers.google.com/search/apis/ipranges/googlebot.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const VERIFIABLE_NAMES: &[&str] = &[
    "Google-InspectionTool",
    "Storebot-Google",
    "AdsBot-Google",
    "Mediapartners-Google",
    "APIs-Google",
];

/// Whether a canonical bot name belongs to the vendor whose ranges we hold.
pub fn is_verifiable_bot(bot_name: &str) -> bool {
    bot_name.starts_with("Googlebot") || VERIFIABLE_NAMES.contains(&bot_name)
}

#[derive(Debug, Error)]
pub enum RangeFetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("malformed prefix document: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid prefix {0:?}")]
    Prefix(String),
}

#[derive(Debug, Deserialize)]
struct PrefixDocument {
    #[serde(default)]
    prefixes: Vec<PrefixEntry>,
}

#[derive(Debug, Deserialize)]
struct PrefixEntry {
    #[serde(rename = "ipv4Prefix")]
    ipv4: Option<String>,
    #[serde(rename = "ipv6Prefix")]
    ipv6: Option<String>,
}

/// Parse the vendor's `{"prefixes": [{"ipv4Prefix": ..} | {"ipv6Prefix": ..}]}` document.
pub fn parse_prefix_document(body: &str) -> Result<Vec<IpNet>, RangeFetchError> {
    let doc: PrefixDocument = serde_json::from_str(body)?;
    let mut out = Vec::with_capacity(doc.prefixes.len());
    for entry in doc.prefixes {
        let Some(cidr) = entry.ipv4.or(entry.ipv6) else { continue };
        let net = cidr.trim().parse::<IpNet>().map_err(|_| RangeFetchError::Prefix(cidr.clone()))?;
        out.push(net);
    }
    Ok(out)
}

/// Where the verified network list comes from.
pub trait RangeSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<IpNet>, RangeFetchError>;
}

pub struct HttpRangeSource {
    url: String,
    timeout: Duration,
}

impl HttpRangeSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), timeout }
    }
}

impl Default for HttpRangeSource {
    fn default() -> Self {
        Self::new(DEFAULT_RANGES_URL, DEFAULT_FETCH_TIMEOUT)
    }
}

impl RangeSource for HttpRangeSource {
    fn fetch(&self) -> Result<Vec<IpNet>, RangeFetchError> {
        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;
        let resp = client.get(&self.url).send()?;
        if !resp.status().is_success() {
            return Err(RangeFetchError::Status(resp.status().as_u16()));
        }
        let body = resp.text()?;
        parse_prefix_document(&body)
    }
}

/// A fixed list, used when verification is disabled and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRangeSource(pub Vec<IpNet>);

impl StaticRangeSource {
    /// Builds from CIDR strings, skipping any that do not parse.
    pub fn from_cidrs<S: AsRef<str>>(cidrs: &[S]) -> Self {
        Self(cidrs.iter().filter_map(|c| c.as_ref().parse().ok()).collect())
    }
}

impl RangeSource for StaticRangeSource {
    fn fetch(&self) -> Result<Vec<IpNet>, RangeFetchError> {
        Ok(self.0.clone())
    }
}

pub struct VerifiedNetworkCache {
    source: Box<dyn RangeSource>,
    networks: OnceCell<Vec<IpNet>>,
}

impl VerifiedNetworkCache {
    pub fn new(source: impl RangeSource + 'static) -> Self {
        Self { source: Box::new(source), networks: OnceCell::new() }
    }

    /// Cache that never performs network I/O and verifies nothing.
    pub fn disabled() -> Self {
        Self::new(StaticRangeSource::default())
    }

    /// Resolved ranges; the first caller performs the fetch, concurrent callers wait for it.
    pub fn networks(&self) -> &[IpNet] {
        self.networks.get_or_init(|| match self.source.fetch() {
            Ok(nets) => {
                info!(prefixes = nets.len(), "loaded verified bot ranges");
                nets
            }
            Err(e) => {
                warn!(error = %e, "verified bot ranges unavailable, verification disabled for this run");
                Vec::new()
            }
        })
    }

    pub fn is_populated(&self) -> bool {
        self.networks.get().is_some()
    }

    pub fn is_verified(&self, address: &str) -> bool {
        let nets = self.networks();
        if nets.is_empty() {
            return false;
        }
        match address.trim().parse::<IpAddr>() {
            Ok(addr) => nets.iter().any(|n| n.contains(&addr)),
            Err(_) => false,
        }
    }
}

static GLOBAL: OnceCell<VerifiedNetworkCache> = OnceCell::new();

/// Install the process-wide cache. Fails (returning the cache back) once the
/// global has been installed or already lazily defaulted.
pub fn install_global(cache: VerifiedNetworkCache) -> Result<(), VerifiedNetworkCache> {
    GLOBAL.set(cache)
}

/// The process-wide cache, defaulting to the HTTP source.
pub fn global() -> &'static VerifiedNetworkCache {
    GLOBAL.get_or_init(|| VerifiedNetworkCache::new(HttpRangeSource::default()))
}

pub fn is_verified(address: &str) -> bool {
    global().is_verified(address)
}
