//! Storage node multiaddress parsing

use reqwest::Url;
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::InitError;

/// Parsed `/ip4/<host>/tcp/<port>` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAddress {
    raw: String,
    host: Ipv4Addr,
    port: u16,
}

impl StorageAddress {
    pub fn parse(raw: &str) -> Result<Self, InitError> {
        let malformed = |reason: &str| InitError::MalformedAddress(format!("{}: {}", raw, reason));

        let trimmed = raw.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        let (host, port) = match segments.as_slice() {
            ["", "ip4", host, "tcp", port] => (*host, *port),
            _ => return Err(malformed("expected /ip4/<host>/tcp/<port>")),
        };

        let host = host
            .parse::<Ipv4Addr>()
            .map_err(|_| malformed("invalid IPv4 address"))?;
        let port = match port.parse::<u16>() {
            Ok(0) | Err(_) => return Err(malformed("invalid tcp port")),
            Ok(port) => port,
        };

        Ok(Self {
            raw: trimmed.to_string(),
            host,
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// RPC root of the node, e.g. `http://127.0.0.1:5001/api/v0/`
    pub fn rpc_url(&self) -> Result<Url, InitError> {
        let url = format!("http://{}:{}/api/v0/", self.host, self.port);
        Url::parse(&url).map_err(|e| InitError::MalformedAddress(format!("{}: {}", self.raw, e)))
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
