//! DNS resolution primitive.
//!
//! The engine treats resolution as a black box returning address records,
//! an explicit "no record" answer, or a failure with a reason. Retry policy
//! belongs to the resolver configuration (`dns.attempts`), not to callers.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, ResolveErrorKind, TokioResolver};
use rblwatch_core::{RblError, RecordKind, Result};
use tracing::debug;

use crate::config::DnsConfig;

/// Raw result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// One or more records, in answer order
    Records(Vec<String>),
    /// NXDOMAIN or an empty answer
    NoRecord,
    /// Timeout, transport failure or server failure
    Failure(String),
}

/// Resolves a fully-qualified query name under a deadline.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Resolve `name` for `kind`; must return within `deadline`.
    async fn resolve(&self, name: &str, kind: RecordKind, deadline: Duration) -> Resolution;
}

/// [`DnsLookup`] backed by hickory's tokio resolver.
#[derive(Clone)]
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    /// Resolver using the system configuration (`/etc/resolv.conf` or platform equivalent).
    pub fn system() -> Result<Self> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| RblError::Dns(format!("failed to create resolver: {e}")))?
            .build();
        Ok(Self { resolver })
    }

    /// Resolver honouring configured nameservers, timeout and attempts.
    pub fn from_config(config: &DnsConfig) -> Result<Self> {
        let servers = config.socket_addrs()?;

        let mut builder = if servers.is_empty() {
            TokioResolver::builder_tokio()
                .map_err(|e| RblError::Dns(format!("failed to create resolver: {e}")))?
        } else {
            let name_servers: Vec<NameServerConfig> = servers
                .iter()
                .flat_map(|addr| {
                    [
                        NameServerConfig::new(*addr, Protocol::Udp),
                        NameServerConfig::new(*addr, Protocol::Tcp),
                    ]
                })
                .collect();
            let group = NameServerConfigGroup::from(name_servers);
            TokioResolver::builder_with_config(
                ResolverConfig::from_parts(None, vec![], group),
                TokioConnectionProvider::default(),
            )
        };

        let opts = builder.options_mut();
        opts.timeout = Duration::from_millis(config.timeout_ms);
        opts.attempts = config.attempts;

        Ok(Self {
            resolver: builder.build(),
        })
    }

    async fn lookup(&self, name: &str, kind: RecordKind) -> std::result::Result<Vec<String>, ResolveError> {
        match kind {
            RecordKind::A => {
                let response = self.resolver.ipv4_lookup(name).await?;
                Ok(response.iter().map(ToString::to_string).collect())
            }
            RecordKind::Txt => {
                let response = self.resolver.txt_lookup(name).await?;
                Ok(response
                    .iter()
                    .map(|txt| {
                        txt.iter()
                            .map(|data| String::from_utf8_lossy(data).to_string())
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .collect())
            }
        }
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn resolve(&self, name: &str, kind: RecordKind, deadline: Duration) -> Resolution {
        debug!(name, %kind, "DNSBL query");

        match tokio::time::timeout(deadline, self.lookup(name, kind)).await {
            Err(_) => Resolution::Failure("timeout".into()),
            Ok(Ok(records)) if records.is_empty() => Resolution::NoRecord,
            Ok(Ok(records)) => Resolution::Records(records),
            Ok(Err(e)) => resolution_for_error(&e),
        }
    }
}

/// Map a resolver error onto "no record" or a failure reason.
///
/// NXDOMAIN and NOERROR-without-answer are negative answers; SERVFAIL,
/// REFUSED and friends are failures.
fn resolution_for_error(err: &ResolveError) -> Resolution {
    if let ResolveErrorKind::Proto(proto) = err.kind() {
        match proto.kind() {
            ProtoErrorKind::NoRecordsFound { response_code, .. } => {
                return response_code_resolution(*response_code);
            }
            ProtoErrorKind::Timeout => return Resolution::Failure("timeout".into()),
            _ => {}
        }
    }
    Resolution::Failure(err.to_string())
}

fn response_code_resolution(code: ResponseCode) -> Resolution {
    match code {
        ResponseCode::NXDomain | ResponseCode::NoError => Resolution::NoRecord,
        other => Resolution::Failure(format!("server failure: {other}")),
    }
}
