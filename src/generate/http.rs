use std::time::Duration;

use crate::assets::decode::decode_frame;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{ReelError, ReelResult};
use crate::generate::model::{GenerationRequest, ModelError, ModelOutput, VideoModel};

/// Model served over HTTP.
///
/// The endpoint receives `{"inputs": <prompt>, "parameters": {...}}` and answers with
/// `{"frames": ["<image url>", ...], "fps": <number>}`. Each frame URL is fetched and decoded
/// with `image`.
#[derive(Debug, Clone)]
pub struct HttpVideoModel {
    endpoint: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
}

#[derive(serde::Serialize)]
struct EndpointPayload<'a> {
    inputs: &'a str,
    parameters: EndpointParameters<'a>,
}

#[derive(serde::Serialize)]
struct EndpointParameters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    width: u32,
    height: u32,
    num_frames: u32,
    num_inference_steps: u32,
    fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(serde::Deserialize)]
struct EndpointResponse {
    frames: Vec<String>,
    #[serde(default)]
    fps: Option<f64>,
}

impl HttpVideoModel {
    /// Client for `endpoint`. Individual calls are bounded by the generator's timeout.
    pub fn new(endpoint: impl Into<String>) -> ReelResult<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ReelError::validation(format!(
                "model endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReelError::Other(anyhow::anyhow!("build http client: {e}")))?;
        Ok(Self {
            endpoint,
            client,
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_frame(&self, url: &str) -> Result<FrameRGBA, ModelError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ModelError::Transient(format!("fetch frame '{url}': {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &format!("frame '{url}'")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::Transient(format!("read frame '{url}': {e}")))?;
        decode_frame(&bytes).map_err(|e| ModelError::Transient(format!("decode '{url}': {e}")))
    }
}

#[async_trait::async_trait]
impl VideoModel for HttpVideoModel {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<ModelOutput, ModelError> {
        let payload = EndpointPayload {
            inputs: &request.prompt,
            parameters: EndpointParameters {
                negative_prompt: request.negative_prompt.as_deref(),
                width: request.width,
                height: request.height,
                num_frames: request.num_frames,
                num_inference_steps: request.num_inference_steps,
                fps: request.fps,
                seed: request.seed,
            },
        };

        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ModelError::Transient(format!("send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %body, "model endpoint returned an error");
            return Err(classify_status(status.as_u16(), body.trim()));
        }

        let parsed = response
            .json::<EndpointResponse>()
            .await
            .map_err(|e| ModelError::Transient(format!("parse model response: {e}")))?;

        let mut frames = Vec::with_capacity(parsed.frames.len());
        for url in &parsed.frames {
            frames.push(self.fetch_frame(url).await?);
        }
        Ok(ModelOutput {
            frames,
            frame_rate: parsed.fps.unwrap_or(f64::from(request.fps)),
        })
    }
}

/// Map an HTTP status to retryable or permanent.
pub(crate) fn classify_status(status: u16, detail: &str) -> ModelError {
    let msg = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    };
    match status {
        408 | 429 | 500..=599 => ModelError::Transient(msg),
        _ => ModelError::Rejected(msg),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/http.rs"]
mod tests;
