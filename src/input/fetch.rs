use std::time::Duration;

use ureq::Agent;
use ureq::tls::TlsConfig;

use crate::error::FetchError;

/// Source of remote chart documents.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher. Certificates are not verified and the whole
/// exchange, body included, is bounded by `timeout_secs`.
pub struct UreqFetcher {
    agent: Agent,
    timeout_secs: u64,
}

impl UreqFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .tls_config(TlsConfig::builder().disable_verification(true).build())
            .build()
            .into();
        Self {
            agent,
            timeout_secs,
        }
    }
}

impl Fetch for UreqFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.agent.get(url).call().map_err(|err| self.classify(err))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|err| self.classify(err))
    }
}

impl UreqFetcher {
    fn classify(&self, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::Timeout(_) => FetchError::Timeout(self.timeout_secs),
            other => FetchError::Transport(other.to_string()),
        }
    }
}
