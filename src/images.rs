use std::sync::Mutex;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};
use url::Url;

/// Placeholder used whenever an image fails validation. Stored values are
/// either a well-formed URL, a sanitized data URI, or this.
pub const DEFAULT_IMAGE: &str = "/images/placeholder.png";

/// 2 MiB decoded; larger uploads are rejected rather than stored.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

const ALLOWED_FORMATS: [&str; 5] = ["png", "jpeg", "jpg", "gif", "webp"];

/// Result of checking a base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageValidation {
    pub is_valid: bool,
    /// Canonical `data:image/<fmt>;base64,<payload>` form when valid.
    pub sanitized: Option<String>,
    pub reason: Option<String>,
}

impl ImageValidation {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            sanitized: None,
            reason: Some(reason.into()),
        }
    }
}

/// Validates a `data:` URI claiming to be an image: the declared format
/// must be on the allowlist, the payload must decode as base64, and the
/// decoded size must stay under `max_bytes`. Valid input is re-encoded
/// into canonical form so nothing beyond the payload survives.
pub fn validate_and_sanitize_base64_image(input: &str, max_bytes: usize) -> ImageValidation {
    let Some(rest) = input.strip_prefix("data:image/") else {
        return ImageValidation::invalid("not an image data URI");
    };
    let Some((format, payload)) = rest.split_once(";base64,") else {
        return ImageValidation::invalid("missing base64 marker");
    };
    let format = format.to_ascii_lowercase();
    if !ALLOWED_FORMATS.contains(&format.as_str()) {
        return ImageValidation::invalid(format!("unsupported image format: {}", format));
    }
    let decoded = match BASE64.decode(payload.trim()) {
        Ok(bytes) => bytes,
        Err(e) => return ImageValidation::invalid(format!("payload is not base64: {}", e)),
    };
    if decoded.is_empty() {
        return ImageValidation::invalid("empty image payload");
    }
    if decoded.len() > max_bytes {
        return ImageValidation::invalid(format!(
            "image too large: {} bytes (max {})",
            decoded.len(),
            max_bytes
        ));
    }
    ImageValidation {
        is_valid: true,
        sanitized: Some(format!(
            "data:image/{};base64,{}",
            format,
            BASE64.encode(&decoded)
        )),
        reason: None,
    }
}

/// Normalizes an image field for storage: accepts http(s) URLs and valid
/// data URIs, substitutes the default placeholder for everything else.
/// Call sites must never store the raw input on validation failure.
pub fn sanitize_or_default(input: Option<&str>) -> String {
    let Some(raw) = input else {
        return DEFAULT_IMAGE.to_string();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_IMAGE.to_string();
    }
    if raw.starts_with("data:") {
        let validation = validate_and_sanitize_base64_image(raw, MAX_IMAGE_BYTES);
        return match validation.sanitized {
            Some(clean) => clean,
            None => {
                debug!(reason = ?validation.reason, "Replacing invalid image with placeholder");
                DEFAULT_IMAGE.to_string()
            }
        };
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => raw.to_string(),
        _ if raw.starts_with('/') => raw.to_string(),
        _ => DEFAULT_IMAGE.to_string(),
    }
}

/// Reachability probe for external image URLs. Each probe supersedes the
/// previous one: starting a new probe aborts whatever is still in flight,
/// so only one answer can ever arrive.
pub struct ImageProbe {
    client: reqwest::Client,
    timeout: Duration,
    in_flight: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ImageProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            in_flight: Mutex::new(None),
        }
    }

    /// Default five-second window, matching the dashboard's probe.
    pub fn with_default_timeout() -> Self {
        Self::new(Duration::from_secs(5))
    }

    /// Checks whether `url` answers with a success status inside the
    /// timeout, aborting any previous probe first. The result is delivered
    /// through `on_result` on the probe task.
    pub fn probe(
        &self,
        url: impl Into<String>,
        on_result: impl FnOnce(bool) + Send + 'static,
    ) {
        let url = url.into();
        let client = self.client.clone();
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let reachable = match tokio::time::timeout(timeout, client.get(&url).send()).await {
                Ok(Ok(response)) => response.status().is_success(),
                Ok(Err(e)) => {
                    debug!(url = %url, error = %e, "Image probe failed");
                    false
                }
                Err(_) => {
                    debug!(url = %url, "Image probe timed out");
                    false
                }
            };
            on_result(reachable);
        });

        if let Ok(mut guard) = self.in_flight.lock() {
            if let Some(previous) = guard.replace(handle) {
                previous.abort();
            }
        } else {
            warn!("Image probe registry poisoned; probe not tracked");
        }
    }

    /// Cancels any probe still in flight.
    pub fn cancel(&self) {
        if let Ok(mut guard) = self.in_flight.lock() {
            if let Some(previous) = guard.take() {
                previous.abort();
            }
        }
    }
}
