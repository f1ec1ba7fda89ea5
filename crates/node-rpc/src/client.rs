use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use std::pin::Pin;
use std::time::Duration;

use crate::error::NodeError;
use crate::types::{parse_ndjson, AddedObject, LocalRef, RpcErrorBody};

/// Streamed object bytes from `cat`
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NodeError>> + Send>>;

/// Timeouts applied to node calls
#[derive(Debug, Clone)]
pub struct NodeClientOptions {
    pub connect_timeout: Duration,
    /// Whole-request bound for `add` and `refs/local`
    pub request_timeout: Duration,
    /// Bound on each read while streaming `cat`
    pub read_timeout: Duration,
}

impl Default for NodeClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle to one storage node's RPC endpoint
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: Client,
    base: Url,
    options: NodeClientOptions,
}

impl NodeClient {
    /// `base` is the RPC root, e.g. `http://127.0.0.1:5001/api/v0/`
    pub fn new(base: Url, options: NodeClientOptions) -> Result<Self, NodeError> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.read_timeout)
            .build()?;

        // Url::join drops the last segment unless the base ends with '/'
        let base = if base.path().ends_with('/') {
            base
        } else {
            let mut base = base;
            let path = format!("{}/", base.path());
            base.set_path(&path);
            base
        };

        Ok(Self {
            http,
            base,
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, NodeError> {
        self.base
            .join(path)
            .map_err(|e| NodeError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// List references stored on the node
    pub async fn refs_local(&self) -> Result<Vec<LocalRef>, NodeError> {
        let url = self.endpoint("refs/local")?;
        let response = self
            .http
            .post(url)
            .timeout(self.options.request_timeout)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let refs: Vec<LocalRef> = parse_ndjson(&body)?;
        debug!("node_refs_local: {} refs={}", self.base, refs.len());
        Ok(refs)
    }

    /// Store `body` as a single pinned object and return the node's record of it
    pub async fn add(
        &self,
        body: Body,
        file_name: &str,
        length: Option<u64>,
    ) -> Result<AddedObject, NodeError> {
        let mut url = self.endpoint("add")?;
        url.query_pairs_mut()
            .append_pair("pin", "true")
            .append_pair("cid-version", "0");

        let part = match length {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(file_name.to_string())
        .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .timeout(self.options.request_timeout)
            .send()
            .await?;
        let text = check_status(response).await?.text().await?;

        let added: Vec<AddedObject> = parse_ndjson(&text)?;
        let object = added.into_iter().next().ok_or(NodeError::EmptyResponse)?;
        debug!(
            "node_add: {} name={} size={}",
            object.hash, object.name, object.size
        );
        Ok(object)
    }

    /// Open a byte stream for the object addressed by `hash`
    pub async fn cat(&self, hash: &str) -> Result<ByteStream, NodeError> {
        let mut url = self.endpoint("cat")?;
        url.query_pairs_mut().append_pair("arg", hash);

        let response = self.http.post(url).send().await?;
        let response = check_status(response).await?;
        debug!(
            "node_cat: {} content_length={:?}",
            hash,
            response.content_length()
        );

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(NodeError::from));
        Ok(Box::pin(stream))
    }
}

/// Turn a non-success response into `NodeError::Status`, preferring the node's own message
async fn check_status(response: Response) -> Result<Response, NodeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<RpcErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) if text.trim().is_empty() => status.to_string(),
        Err(_) => text.trim().to_string(),
    };
    Err(NodeError::Status {
        status: status.as_u16(),
        message,
    })
}
