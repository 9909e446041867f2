//! Renderer abstraction
//!
//! The crawler never talks to a browser engine directly. It asks a
//! [`Renderer`] for an isolated [`RenderSession`] per visit, drives the page
//! through that session, and closes it on every exit path. The production
//! implementation is [`ChromeRenderer`]; tests substitute scripted fakes.

mod chrome;

pub use chrome::{ChromeOptions, ChromeRenderer};

use crate::config::WaitUntil;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a renderer
///
/// Timeouts are a distinct variant so the retry logic can branch on the kind
/// of failure instead of on message text.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{operation} timed out after {}ms", .budget.as_millis())]
    Timeout {
        operation: &'static str,
        budget: Duration,
    },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Builds a timeout error for `operation`
    pub fn timeout(operation: &'static str, budget: Duration) -> Self {
        Self::Timeout { operation, budget }
    }

    /// Returns true if this failure is eligible for the retry pass
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Rendered HTML of a nested frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDocument {
    /// The frame's own URL, used to resolve its relative links
    pub url: String,

    /// Serialized frame document
    pub html: String,
}

/// A browser engine that hands out isolated browsing contexts
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a fresh context (own cookies and storage) with a blank page
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// One isolated browsing context holding a single page
#[async_trait]
pub trait RenderSession: Send {
    /// Loads `url` and waits for `until`, returning the HTTP status if known
    async fn navigate(
        &mut self,
        url: &str,
        budget: Duration,
        until: WaitUntil,
    ) -> Result<Option<u16>, RenderError>;

    /// Waits until `selector` matches an element
    async fn wait_for_selector(&mut self, selector: &str, budget: Duration)
        -> Result<(), RenderError>;

    /// Waits until the JavaScript expression `predicate` evaluates truthy
    async fn wait_for_function(&mut self, predicate: &str, budget: Duration)
        -> Result<(), RenderError>;

    /// Evaluates a JavaScript expression and returns its JSON value
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError>;

    /// The document title
    async fn title(&mut self) -> Result<Option<String>, RenderError>;

    /// The current URL of the main frame
    async fn current_url(&mut self) -> Result<Option<String>, RenderError>;

    /// Serialized HTML of the main document after scripts ran
    async fn rendered_html(&mut self) -> Result<String, RenderError>;

    /// Documents of nested frames that can be inspected
    async fn frames(&mut self) -> Result<Vec<FrameDocument>, RenderError>;

    /// Writes a full-page PNG screenshot to `path`
    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError>;

    /// Tears down the page and its browsing context
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
