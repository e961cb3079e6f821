// Reachability gate in front of a download run
//
// Offline means wait and try again, forever. A playlist download resumes at
// the file level, so blocking is preferable to giving up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Kind of reachability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP handshake with a well-known host
    #[default]
    Tcp,
    /// HTTP GET of a well-known URL
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe: ProbeKind,
    /// host:port for the TCP probe
    pub probe_address: String,
    /// URL for the HTTP probe
    pub probe_url: String,
    pub probe_timeout_secs: u64,
    pub retry_delay_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe: ProbeKind::Tcp,
            probe_address: "8.8.8.8:53".to_string(),
            probe_url: "https://www.google.com/generate_204".to_string(),
            probe_timeout_secs: 3,
            retry_delay_secs: 10,
        }
    }
}

/// One reachability check; any failure (including errors) is just `false`
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match TcpStream::connect(self.address.as_str()).await {
            Ok(_) => true,
            Err(e) => {
                debug!(address = %self.address, error = %e, "tcp probe failed");
                false
            }
        }
    }
}

pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Build with an optional proxy; an unusable proxy URL falls back to direct
    pub fn new(url: impl Into<String>, proxy: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_url) = proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(proxy = %proxy_url, error = %e, "invalid proxy, probing directly"),
            }
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "http probe failed");
                false
            }
        }
    }
}

pub struct ConnectivityMonitor {
    probe: Box<dyn Probe>,
    probe_timeout: Duration,
    retry_delay: Duration,
}

impl ConnectivityMonitor {
    pub fn new(probe: Box<dyn Probe>, probe_timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            probe,
            probe_timeout,
            retry_delay,
        }
    }

    pub fn from_config(
        config: &ConnectivityConfig,
        proxy: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        let probe: Box<dyn Probe> = match config.probe {
            ProbeKind::Tcp => Box::new(TcpProbe::new(config.probe_address.clone())),
            ProbeKind::Http => Box::new(HttpProbe::new(config.probe_url.clone(), proxy)?),
        };
        Ok(Self::new(
            probe,
            Duration::from_secs(config.probe_timeout_secs),
            Duration::from_secs(config.retry_delay_secs),
        ))
    }

    /// Single probe bounded by the probe timeout
    pub async fn is_online(&self) -> bool {
        timeout(self.probe_timeout, self.probe.is_reachable())
            .await
            .unwrap_or(false)
    }

    /// Return once a probe succeeds, sleeping `retry_delay` after each failure.
    /// There is no attempt limit. Returns the number of failed probes.
    pub async fn wait_until_online(&self) -> u32 {
        let mut failures = 0u32;
        while !self.is_online().await {
            failures += 1;
            warn!(
                attempt = failures,
                "No internet connection. Retrying in {} seconds...",
                self.retry_delay.as_secs()
            );
            sleep(self.retry_delay).await;
        }
        info!("Internet connection available.");
        failures
    }
}
