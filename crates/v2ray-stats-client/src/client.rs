use async_trait::async_trait;
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;
use traffic_stats::{RawCounter, SnapshotSource, SourceError, TransportError, TransportErrorKind};

use crate::error::StatsClientError;
use crate::proto::{
    QueryStatsRequest, QueryStatsResponse, Stat, SysStatsRequest, SysStatsResponse,
};

pub const DEFAULT_SERVICE_NAME: &str = "v2ray.core.app.stats.command.StatsService";

/// Service names used by the different v2ray/xray releases. Shown to the
/// user when the configured one is rejected.
pub const KNOWN_SERVICE_NAMES: &[&str] = &[
    "v2ray.core.app.stats.command.StatsService",
    "xray.app.stats.command.StatsService",
    "experimental.v2rayapi.StatsService",
    "v2rayapi.StatsService",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsClientConfig {
    /// `host:port` of the API inbound, with or without a scheme
    pub address: String,
    pub service_name: String,
    /// Applied to connecting and to every call
    pub timeout: Duration,
}

impl Default for StatsClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// StatsService client over a lazily connected tonic channel.
///
/// The first call establishes the connection, so constructing a client never
/// fails because the proxy is down.
#[derive(Debug, Clone)]
pub struct StatsClient {
    inner: Grpc<Channel>,
    address: String,
    service_name: String,
}

impl StatsClient {
    pub fn connect_lazy(config: &StatsClientConfig) -> Result<Self, StatsClientError> {
        let uri = endpoint_uri(&config.address);
        let endpoint = Endpoint::from_shared(uri.clone()).map_err(|e| {
            StatsClientError::InvalidAddress {
                address: config.address.clone(),
                reason: e.to_string(),
            }
        })?;
        let channel = endpoint
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .connect_lazy();

        debug!(
            "Stats client configured for {} ({})",
            uri, config.service_name
        );

        Ok(Self {
            inner: Grpc::new(channel),
            address: config.address.clone(),
            service_name: config.service_name.clone(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// All counters whose name contains `pattern`; empty returns everything.
    pub async fn query_stats(
        &mut self,
        pattern: &str,
        reset: bool,
    ) -> Result<Vec<Stat>, StatsClientError> {
        let request = QueryStatsRequest {
            pattern: pattern.to_string(),
            reset,
        };
        let response: QueryStatsResponse = self.unary("QueryStats", request).await?;
        Ok(response.stat.into_iter().map(Stat::from).collect())
    }

    pub async fn sys_stats(&mut self) -> Result<SysStatsResponse, StatsClientError> {
        self.unary("GetSysStats", SysStatsRequest {}).await
    }

    async fn unary<Req, Resp>(
        &mut self,
        method: &str,
        request: Req,
    ) -> Result<Resp, StatsClientError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let path = method_path(&self.service_name, method)?;

        self.inner.ready().await.map_err(|e| {
            TransportError::new(
                TransportErrorKind::Unavailable,
                format!("Service was not ready: {}", e),
            )
        })?;

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = self
            .inner
            .unary(tonic::Request::new(request), path, codec)
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl SnapshotSource for StatsClient {
    async fn fetch(&mut self, pattern: &str, reset: bool) -> Result<Vec<RawCounter>, SourceError> {
        let stats = self.query_stats(pattern, reset).await?;
        debug!("Received {} counters from {}", stats.len(), self.address);
        Ok(stats
            .into_iter()
            .map(|stat| RawCounter::new(stat.name, stat.value))
            .collect())
    }
}

fn endpoint_uri(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

fn method_path(service_name: &str, method: &str) -> Result<PathAndQuery, StatsClientError> {
    let path = format!("/{}/{}", service_name, method);
    PathAndQuery::try_from(path.as_str()).map_err(|_| StatsClientError::InvalidMethodPath(path))
}
