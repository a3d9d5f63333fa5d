//! Headless rendering seam
//!
//! Rendering itself (driving a browser) lives outside this crate. The trait
//! only accepts a [`ValidatedUrl`], which nothing but the validator can
//! construct, so a renderer cannot be pointed at an unapproved address.

use crate::error::RenderError;
use crate::security::ValidatedUrl;
use async_trait::async_trait;

/// Alternate HTML source for pages that need JavaScript
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load `url` and return the rendered document
    async fn render(&self, url: &ValidatedUrl) -> Result<String, RenderError>;
}
