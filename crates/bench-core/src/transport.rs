//! The interface the engine needs from an HTTP transport.
//!
//! The engine never speaks HTTP itself. It hands a [`GetRequest`] to a
//! [`RequestClient`] and consumes the returned [`Response`] as a stream of
//! body chunks.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BenchError, ReleaseError, RequestError};

/// HTTP protocol version requested for every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVersion {
    Http10,
    #[default]
    Http11,
    Http2,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "1.0",
            Self::Http11 => "1.1",
            Self::Http2 => "2.0",
        }
    }

    fn as_number(&self) -> f64 {
        match self {
            Self::Http10 => 1.0,
            Self::Http11 => 1.1,
            Self::Http2 => 2.0,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::Http10),
            "1.1" => Ok(Self::Http11),
            "2" | "2.0" => Ok(Self::Http2),
            other => Err(BenchError::config(format!(
                "unsupported protocol version '{}', expected 1.0, 1.1 or 2.0",
                other
            ))),
        }
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // YAML reads an unquoted `1.1` as a float
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Number(number) => [Self::Http10, Self::Http11, Self::Http2]
                .into_iter()
                .find(|version| version.as_number() == number)
                .ok_or_else(|| {
                    serde::de::Error::custom(format!("unsupported HTTP version {}", number))
                }),
        }
    }
}

/// Transport tuning handed to every client at construction.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Reuse connections between requests. When false every request carries
    /// `Connection: close`.
    pub keep_alive: bool,
    pub protocol: ProtocolVersion,
    /// Deadline for a whole request including the body.
    pub request_timeout: Duration,
    pub connect_timeout: Option<Duration>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            keep_alive: false,
            protocol: ProtocolVersion::default(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: None,
        }
    }
}

/// One GET request as issued by a worker.
#[derive(Debug, Clone)]
pub struct GetRequest {
    pub uri: Url,
    pub protocol: ProtocolVersion,
    pub keep_alive: bool,
}

/// Streamed response body.
pub type BodyStream = BoxStream<'static, Result<Bytes, RequestError>>;

/// Status line plus body stream of a completed request.
pub struct Response {
    pub status: u16,
    pub body: BodyStream,
}

impl Response {
    pub fn new(status: u16, body: BodyStream) -> Self {
        Self { status, body }
    }

    /// Response whose body is already in memory.
    pub fn full(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, stream::iter([Ok(body)]).boxed())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A request-issuing client. Each worker owns exactly one.
#[async_trait]
pub trait RequestClient: Send + Sync + 'static {
    /// Issue one GET request and return the response head with its body
    /// stream, or the failure that prevented it.
    async fn get(&self, request: &GetRequest) -> Result<Response, RequestError>;

    /// Release any resources held by the client. Called once when the owning
    /// session is closed or dropped.
    fn release(&self) -> Result<(), ReleaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_parse() {
        assert_eq!("1.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Http10);
        assert_eq!("1.1".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Http11);
        assert_eq!("2.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::Http2);
        assert!("3.0".parse::<ProtocolVersion>().is_err());
        assert_eq!(ProtocolVersion::default().to_string(), "1.1");
    }

    #[test]
    fn test_protocol_version_serde() {
        let v: ProtocolVersion = serde_json::from_str("\"2.0\"").unwrap();
        assert_eq!(v, ProtocolVersion::Http2);
        let v: ProtocolVersion = serde_json::from_str("1.0").unwrap();
        assert_eq!(v, ProtocolVersion::Http10);
        assert_eq!(serde_json::to_string(&ProtocolVersion::Http11).unwrap(), "\"1.1\"");
        assert!(serde_json::from_str::<ProtocolVersion>("\"0.9\"").is_err());
    }

    #[test]
    fn test_protocol_version_rejects_inexact_numbers() {
        assert_eq!(
            serde_json::from_str::<ProtocolVersion>("1.1").unwrap(),
            ProtocolVersion::Http11
        );
        assert_eq!(
            serde_json::from_str::<ProtocolVersion>("2").unwrap(),
            ProtocolVersion::Http2
        );
        assert!(serde_json::from_str::<ProtocolVersion>("1.05").is_err());
        assert!(serde_json::from_str::<ProtocolVersion>("2.04").is_err());
        assert!(serde_json::from_str::<ProtocolVersion>("1.14").is_err());
    }

    #[tokio::test]
    async fn test_full_response_yields_body() {
        let mut response = Response::full(200, vec![7u8; 42]);
        assert!(response.is_success());
        let chunk = response.body.next().await.unwrap().unwrap();
        assert_eq!(chunk.len(), 42);
        assert!(response.body.next().await.is_none());
        assert!(!Response::full(404, Bytes::new()).is_success());
    }
}
