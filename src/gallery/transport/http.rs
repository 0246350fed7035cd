use super::Transport;
use crate::endpoints::{Method, RequestDescriptor};
use crate::error::{GalleryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    latency: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            latency: Duration::ZERO,
        }
    }

    /// Waits this long before every request. Off unless configured.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &RequestDescriptor) -> String {
        format!("{}{}", self.base_url, request.path)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut builder = self
            .client
            .request(request.method.into(), self.url_for(request))
            .query(&request.params);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GalleryError::Network(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GalleryError::Network(e.to_string()))?;
        debug!(%request, status = status.as_u16(), len = bytes.len(), "response received");

        if !status.is_success() {
            return Err(GalleryError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let transport = HttpTransport::new("http://localhost:3005/");
        assert_eq!(transport.base_url(), "http://localhost:3005");
        assert_eq!(
            transport.url_for(&RequestDescriptor::delete("/albums/4")),
            "http://localhost:3005/albums/4"
        );
    }

    #[test]
    fn methods_map_onto_reqwest() {
        assert_eq!(reqwest::Method::from(Method::Delete), reqwest::Method::DELETE);
        assert_eq!(reqwest::Method::from(Method::Post), reqwest::Method::POST);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = HttpTransport::new(format!("http://127.0.0.1:{}", port));
        let err = transport
            .execute(&RequestDescriptor::get("/users"))
            .await
            .unwrap_err();
        // A proxy from the environment may answer with a gateway error instead.
        assert!(matches!(
            err,
            GalleryError::Network(_) | GalleryError::Http { status: 500.., .. }
        ));
    }
}
