//! [`RequestClient`] backed by `reqwest`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Version};

use crate::error::RequestError;
use crate::transport::{GetRequest, ProtocolVersion, RequestClient, Response, TransportSettings};

/// One `reqwest` client with its own connection pool.
///
/// A session creates one of these per worker, so each worker drives at most
/// one connection at a time.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Build a client configured from `settings`.
    pub fn new(settings: &TransportSettings) -> Result<Self, reqwest::Error> {
        let idle_per_host = if settings.keep_alive { 1 } else { 0 };

        let mut builder = Client::builder()
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(idle_per_host)
            .tcp_nodelay(true)
            .no_proxy();

        if let Some(connect_timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        builder = match settings.protocol {
            ProtocolVersion::Http2 => builder.http2_prior_knowledge(),
            ProtocolVersion::Http10 | ProtocolVersion::Http11 => builder.http1_only(),
        };

        Ok(Self {
            client: builder.build()?,
        })
    }
}

fn http_version(protocol: ProtocolVersion) -> Version {
    match protocol {
        ProtocolVersion::Http10 => Version::HTTP_10,
        ProtocolVersion::Http11 => Version::HTTP_11,
        ProtocolVersion::Http2 => Version::HTTP_2,
    }
}

#[async_trait]
impl RequestClient for ReqwestClient {
    async fn get(&self, request: &GetRequest) -> Result<Response, RequestError> {
        let mut builder = self
            .client
            .get(request.uri.clone())
            .version(http_version(request.protocol));

        // HTTP/2 forbids connection-specific headers
        if !request.keep_alive && request.protocol != ProtocolVersion::Http2 {
            builder = builder.header(header::CONNECTION, "close");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RequestError::from))
            .boxed();

        Ok(Response::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_http_version_mapping() {
        assert_eq!(http_version(ProtocolVersion::Http10), Version::HTTP_10);
        assert_eq!(http_version(ProtocolVersion::Http11), Version::HTTP_11);
        assert_eq!(http_version(ProtocolVersion::Http2), Version::HTTP_2);
    }

    #[test]
    fn test_builds_for_every_protocol() {
        for protocol in [
            ProtocolVersion::Http10,
            ProtocolVersion::Http11,
            ProtocolVersion::Http2,
        ] {
            let settings = TransportSettings {
                keep_alive: true,
                protocol,
                request_timeout: Duration::from_secs(5),
                connect_timeout: Some(Duration::from_secs(1)),
            };
            assert!(ReqwestClient::new(&settings).is_ok());
        }
    }
}
