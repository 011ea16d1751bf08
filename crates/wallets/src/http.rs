//! An [`Eip1193Provider`] that forwards requests as JSON-RPC over HTTP.
//!
//! Useful for talking to a node directly, or to a bridge that relays requests to a browser
//! wallet. Plain HTTP has no push channel, so subscriptions never yield events.

use crate::{
    error::ProviderRpcError,
    provider::{Eip1193Provider, ProviderEvent, RequestArguments},
};
use async_trait::async_trait;
use reqwest::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use url::Url;

/// JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct HttpProvider {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ProviderRpcError>,
}

impl HttpProvider {
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::with_client(reqwest::Client::new(), url.parse()?))
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        let (events, _) = broadcast::channel(1);
        Self { client, url, next_id: AtomicU64::new(1), events }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(target: "wallets::http", url = %self.url, id, method = %args.method, "POST");
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": args.method,
            "params": args.params.unwrap_or_else(|| json!([])),
        });
        let body = serde_json::to_vec(&payload).map_err(transport_error)?;

        let res = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(transport_error)?;

        parse_response(status, &bytes)
    }
}

/// Turns a JSON-RPC reply into the call's outcome.
///
/// A structured `error` wins over the HTTP status so wallet codes such as `4001` survive a
/// bridge that answers with `4xx`.
fn parse_response(status: StatusCode, bytes: &[u8]) -> Result<Value, ProviderRpcError> {
    match serde_json::from_slice::<Response>(bytes) {
        Ok(Response { error: Some(err), .. }) => Err(err),
        _ if !status.is_success() => Err(ProviderRpcError::internal_error_with(format!(
            "HTTP {status}: {}",
            String::from_utf8_lossy(bytes).trim()
        ))),
        // `"result": null` deserializes to `None`; that is a valid answer
        Ok(Response { result, .. }) => Ok(result.unwrap_or(Value::Null)),
        Err(err) => {
            Err(ProviderRpcError::internal_error_with(format!("invalid JSON-RPC response: {err}")))
        }
    }
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        self.send(args).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn transport_error(err: impl std::fmt::Display) -> ProviderRpcError {
    ProviderRpcError::internal_error_with(err.to_string())
}
