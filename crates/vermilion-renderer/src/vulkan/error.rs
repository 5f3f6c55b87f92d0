//! Typed errors for the backend.
//!
//! Internal code propagates these with `?`; the embedding layer decides
//! which of them are fatal to the process. Only swapchain staleness is ever
//! recovered from, and that never surfaces as an error — the screen
//! subsystem rebuilds itself at the next draw boundary.

use ash::vk;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    /// No device (or layer, extension, memory type) satisfies the minimum
    /// requirements.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A device call returned a non-success code where success was expected.
    #[error("{call} failed: {result:?}")]
    Driver {
        call: &'static str,
        result: vk::Result,
    },

    /// A fixed-capacity pool ran out of slots.
    #[error("{0} pool exhausted")]
    Exhausted(&'static str),

    /// The handle's slot has been released (and possibly reissued) since it
    /// was created.
    #[error("stale resource handle")]
    StaleHandle,

    #[error("window handle unavailable: {0}")]
    Window(#[from] raw_window_handle::HandleError),
}

impl RenderError {
    pub(crate) fn driver(call: &'static str, result: vk::Result) -> Self {
        Self::Driver { call, result }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}
