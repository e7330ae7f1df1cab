use std::time::Duration;

use base64::Engine;
use tracing::{debug, info, warn};

use crate::convert::check_image;
use crate::{RenderError, RenderFormat, Theme, inject_theme};

const KROKI: &str = "kroki";
const MERMAID_INK: &str = "mermaid.ink";

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub kroki_url: String,
    pub mermaid_ink_url: String,
    pub theme: Theme,
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            kroki_url: "https://kroki.io".to_string(),
            mermaid_ink_url: "https://mermaid.ink".to_string(),
            theme: Theme::Default,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct RenderClient {
    config: RenderConfig,
    http: reqwest::Client,
}

impl RenderClient {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `source` with Kroki, falling back to mermaid.ink when Kroki
    /// fails for any reason. The fallback's error is the one reported.
    pub async fn render(&self, source: &str, format: RenderFormat) -> Result<Vec<u8>, RenderError> {
        match self.render_kroki(source, format).await {
            Ok(bytes) => {
                info!("Rendered {} bytes of {} via {}", bytes.len(), format, KROKI);
                return Ok(bytes);
            }
            Err(e) => warn!("{} render failed, trying {}: {}", KROKI, MERMAID_INK, e),
        }

        let bytes = self.render_mermaid_ink(source, format).await?;
        info!("Rendered {} bytes of {} via {}", bytes.len(), format, MERMAID_INK);
        Ok(bytes)
    }

    async fn render_kroki(&self, source: &str, format: RenderFormat) -> Result<Vec<u8>, RenderError> {
        let url = kroki_url(&self.config.kroki_url, format);
        debug!("Render request to {}", url);
        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(inject_theme(source, self.config.theme));
        self.fetch(KROKI, request, format).await
    }

    async fn render_mermaid_ink(
        &self,
        source: &str,
        format: RenderFormat,
    ) -> Result<Vec<u8>, RenderError> {
        let url = mermaid_ink_url(&self.config.mermaid_ink_url, source, self.config.theme, format);
        debug!("Render request to {}", url);
        let request = self.http.get(&url);
        self.fetch(MERMAID_INK, request, format).await
    }

    async fn fetch(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
        format: RenderFormat,
    ) -> Result<Vec<u8>, RenderError> {
        let response = request
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(service, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Http {
                service,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(service, e))?;
        check_image(bytes.to_vec(), format, service)
    }

    fn transport_error(&self, service: &'static str, e: reqwest::Error) -> RenderError {
        if e.is_timeout() {
            RenderError::Timeout {
                service,
                timeout: self.config.timeout,
            }
        } else {
            RenderError::Transport {
                service,
                message: e.to_string(),
            }
        }
    }
}

fn kroki_url(base: &str, format: RenderFormat) -> String {
    format!("{}/mermaid/{}", base.trim_end_matches('/'), format)
}

/// URL of a mermaid.ink rendering: the source and theme travel in the path as
/// URL-safe base64 of a JSON state object.
pub fn mermaid_ink_url(base: &str, source: &str, theme: Theme, format: RenderFormat) -> String {
    let state = serde_json::json!({
        "code": source,
        "mermaid": {
            "theme": theme.as_str(),
            "securityLevel": "loose",
        },
    });
    let encoded =
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(state.to_string().as_bytes());
    let base = base.trim_end_matches('/');
    match format {
        RenderFormat::Png => format!("{base}/img/{encoded}?type=png"),
        RenderFormat::Svg => format!("{base}/svg/{encoded}"),
    }
}
