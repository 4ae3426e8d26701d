//! Network-origin reputation collaborator.

use std::net::IpAddr;

use {async_trait::async_trait, ipnet::IpNet};

use crate::Result;

/// Reputation source for source addresses. Implementations may consult
/// blocklists, proxy/VPN feeds, or an external reputation API.
#[async_trait]
pub trait NetworkIntel: Send + Sync {
    /// Returns a reason string when the address is flagged, `None` when clean.
    async fn check(&self, ip: IpAddr) -> Result<Option<String>>;
}

/// Static blocklist of networks with a reason per entry.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkIntel {
    entries: Vec<(IpNet, String)>,
}

impl StaticNetworkIntel {
    #[must_use]
    pub fn new(entries: Vec<(IpNet, String)>) -> Self {
        Self { entries }
    }

    /// Add a flagged network. Chainable for test setup.
    #[must_use]
    pub fn with_flagged(mut self, net: IpNet, reason: impl Into<String>) -> Self {
        self.entries.push((net, reason.into()));
        self
    }
}

#[async_trait]
impl NetworkIntel for StaticNetworkIntel {
    async fn check(&self, ip: IpAddr) -> Result<Option<String>> {
        Ok(self
            .entries
            .iter()
            .find(|(net, _)| net.contains(&ip))
            .map(|(net, reason)| format!("{reason} ({net})")))
    }
}
