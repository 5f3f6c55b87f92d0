//! The seam to the windowing layer.
//!
//! The core never creates windows; it only needs raw handles for surface
//! creation and the drawable size when (re)building the swapchain.

use raw_window_handle::{
    HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
};

/// What the renderer needs from whoever owns the window.
pub trait WindowSource {
    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError>;
    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError>;
    /// Size of the drawable area in pixels, after DPI scaling.
    fn drawable_size(&self) -> (u32, u32);
}

impl WindowSource for winit::window::Window {
    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        Ok(self.display_handle()?.as_raw())
    }

    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        Ok(self.window_handle()?.as_raw())
    }

    fn drawable_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

impl<W: WindowSource> WindowSource for std::sync::Arc<W> {
    fn raw_display_handle(&self) -> Result<RawDisplayHandle, HandleError> {
        (**self).raw_display_handle()
    }

    fn raw_window_handle(&self) -> Result<RawWindowHandle, HandleError> {
        (**self).raw_window_handle()
    }

    fn drawable_size(&self) -> (u32, u32) {
        (**self).drawable_size()
    }
}
