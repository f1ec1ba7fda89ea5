//! HTTP calls to the scanning service

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::types::{Envelope, Submitted};
use crate::config::ScanConfig;
use crate::error::ScanError;

const API_KEY_HEADER: &str = "x-apikey";

pub(crate) struct ScanApi {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ScanApi {
    pub(crate) fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Upload file content for analysis and return the analysis id
    pub(crate) async fn submit(&self, content: Vec<u8>) -> Result<String, ScanError> {
        let size = content.len();
        let part = Part::bytes(content)
            .file_name("file")
            .mime_str("application/octet-stream")
            .map_err(|e| ScanError::UploadFailed(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScanError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::UploadFailed(format!("HTTP {}", status.as_u16())));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ScanError::UploadFailed(format!("Failed to read response: {}", e)))?;
        let submitted: Envelope<Submitted> = serde_json::from_str(&text)
            .map_err(|e| ScanError::UploadFailed(format!("Unexpected response: {}", e)))?;

        debug!("scan_submit: {} bytes={}", submitted.data.id, size);
        Ok(submitted.data.id)
    }

    /// Fetch the raw analysis report. Errors are per-attempt and not terminal.
    pub(crate) async fn fetch_report(&self, analysis_id: &str) -> Result<String, String> {
        let url = format!(
            "{}/analyses/{}",
            self.base_url,
            urlencoding::encode(analysis_id)
        );
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("API error: {}", response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read report: {}", e))
    }
}
