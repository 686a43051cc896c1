//! Host name resolution with a secondary fallback path.
//!
//! `FallbackResolver` asks the primary resolver (normally the operating
//! system) first and only consults the secondary one when the primary fails
//! or returns no addresses. It is plugged into reqwest through
//! `ReqwestResolver`, so every connection the default transport opens goes
//! through it. IP-literal URLs never reach a resolver.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use thiserror::Error;

use crate::config::DnsFallback;
use crate::error::BoxError;

/// A host name that could not be turned into addresses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not resolve `{host}`: {message}")]
pub struct ResolveError {
    pub host: String,
    pub message: String,
}

impl ResolveError {
    pub fn new(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            message: message.into(),
        }
    }
}

/// Something that maps a host name to IP addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;

    /// Short label used in logs and combined error messages.
    fn name(&self) -> &str;
}

/// The operating system's resolver (getaddrinfo and friends).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolveError::new(host, e.to_string()))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// A hickory resolver talking directly to public nameservers.
pub struct PublicResolver {
    name: &'static str,
    resolver: TokioResolver,
}

impl PublicResolver {
    pub fn google() -> Self {
        Self::with_nameservers(
            "google",
            &[
                SocketAddr::from(([8, 8, 8, 8], 53)),
                SocketAddr::from(([8, 8, 4, 4], 53)),
            ],
        )
    }

    pub fn cloudflare() -> Self {
        Self::with_nameservers(
            "cloudflare",
            &[
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([1, 0, 0, 1], 53)),
            ],
        )
    }

    pub fn for_fallback(fallback: DnsFallback) -> Option<Self> {
        match fallback {
            DnsFallback::None => None,
            DnsFallback::Google => Some(Self::google()),
            DnsFallback::Cloudflare => Some(Self::cloudflare()),
        }
    }

    fn with_nameservers(name: &'static str, nameservers: &[SocketAddr]) -> Self {
        let mut config = ResolverConfig::new();
        for addr in nameservers {
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
        }

        let mut opts = ResolverOpts::default();
        opts.attempts = 2;
        opts.timeout = Duration::from_secs(5);

        let resolver = Resolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { name, resolver }
    }
}

impl fmt::Debug for PublicResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicResolver").field("name", &self.name).finish()
    }
}

#[async_trait]
impl HostResolver for PublicResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ResolveError::new(host, e.to_string()))?;
        Ok(lookup.iter().collect())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Primary resolver first, secondary only if the primary comes back empty-handed.
#[derive(Clone)]
pub struct FallbackResolver {
    primary: Arc<dyn HostResolver>,
    secondary: Option<Arc<dyn HostResolver>>,
}

impl FallbackResolver {
    pub fn new(primary: Arc<dyn HostResolver>, secondary: Option<Arc<dyn HostResolver>>) -> Self {
        Self { primary, secondary }
    }
}

impl fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackResolver")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.as_ref().map(|r| r.name()))
            .finish()
    }
}

#[async_trait]
impl HostResolver for FallbackResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let primary_err = match non_empty(host, self.primary.resolve(host).await) {
            Ok(addrs) => return Ok(addrs),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            return Err(primary_err);
        };

        tracing::debug!(
            host,
            primary = self.primary.name(),
            secondary = secondary.name(),
            error = %primary_err.message,
            "primary resolution failed, trying fallback resolver"
        );

        non_empty(host, secondary.resolve(host).await).map_err(|secondary_err| {
            ResolveError::new(
                host,
                format!(
                    "{}: {}; {}: {}",
                    self.primary.name(),
                    primary_err.message,
                    secondary.name(),
                    secondary_err.message
                ),
            )
        })
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

fn non_empty(
    host: &str,
    result: Result<Vec<IpAddr>, ResolveError>,
) -> Result<Vec<IpAddr>, ResolveError> {
    match result {
        Ok(addrs) if addrs.is_empty() => Err(ResolveError::new(host, "no addresses found")),
        other => other,
    }
}

/// Adapter that lets reqwest's connector use any `HostResolver`.
pub(crate) struct ReqwestResolver(pub(crate) Arc<dyn HostResolver>);

impl reqwest::dns::Resolve for ReqwestResolver {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        let resolver = Arc::clone(&self.0);
        Box::pin(async move {
            let addrs = resolver.resolve(name.as_str()).await?;
            let addrs: reqwest::dns::Addrs =
                Box::new(addrs.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<_, BoxError>(addrs)
        })
    }
}
