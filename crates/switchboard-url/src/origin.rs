//! Scheme/host/port prefix for absolute URLs.

use crate::error::{Result, UrlError};
use std::fmt;
use url::Url;

/// Default port for a scheme, omitted from rendered URLs.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// The `scheme://host[:port]` part of an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: String,
    host: String,
    /// `None` when the scheme's default port is used.
    port: Option<u16>,
}

impl Origin {
    /// Parse an origin such as `https://example.com:8443`.
    ///
    /// Only `http` and `https` are accepted, and the input must not carry a
    /// path, query or fragment.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| UrlError::InvalidOrigin {
            input: input.to_string(),
            reason,
        };

        let url = Url::parse(input).map_err(|e| invalid(e.to_string()))?;

        if default_port(url.scheme()).is_none() {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("origin must not carry a path, query or fragment".to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            // Url::port() already drops the scheme's default port
            port: url.port(),
        })
    }

    /// Build an origin from parts, dropping the port when it is the default.
    pub fn new(scheme: &str, host: &str, port: Option<u16>) -> Result<Self> {
        let rendered = match port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        };
        Self::parse(&rendered)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, `None` for the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Prefix `path` with this origin.
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{self}{path}")
        } else {
            format!("{self}/{path}")
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
