// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Pull release images ahead of starting a color slot.

use crate::types::ImageRef;
use async_trait::async_trait;

#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("authentication failed for registry: {0}")]
    AuthenticationFailed(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ImageError {
    /// Classify a failed `pull` from the CLI's error output.
    pub fn from_pull_output(image: &str, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("unauthorized") || lower.contains("authentication required") {
            ImageError::AuthenticationFailed(image.to_string())
        } else if lower.contains("manifest unknown") || lower.contains("not found") {
            ImageError::NotFound(image.to_string())
        } else {
            ImageError::PullFailed(format!("{}: {}", image, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pull_failures() {
        assert!(matches!(
            ImageError::from_pull_output("rag:1", "Error response: unauthorized: access denied"),
            ImageError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ImageError::from_pull_output("rag:1", "manifest unknown"),
            ImageError::NotFound(_)
        ));
        assert!(matches!(
            ImageError::from_pull_output("rag:1", "i/o timeout"),
            ImageError::PullFailed(msg) if msg == "rag:1: i/o timeout"
        ));
    }
}
