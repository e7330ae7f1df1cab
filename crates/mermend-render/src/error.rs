use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{service} returned {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to reach {service}: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} timed out after {}s", .timeout.as_secs())]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("{service} did not return a {format} image")]
    NotAnImage {
        service: &'static str,
        format: &'static str,
    },

    #[error("image conversion failed: {0}")]
    Image(#[from] image::ImageError),
}
