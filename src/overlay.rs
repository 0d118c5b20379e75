// The overlay window: borderless, topmost, transparent, screen-sized.
// Visual expectation: nothing visible of the window itself, only the trail
// dots float above whatever is on screen.

use crate::error::Error;
use crate::render::pack_premultiplied_argb;
use crate::sample_loop::Surface;
use image::RgbaImage;
use minifb::{Window, WindowOptions};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tracing::debug;

pub struct Overlay {
    window: Window, // the on-screen window (destroyed on drop)
    width: u32,
    height: u32,
    argb: Vec<u32>, // packed copy of the last frame, reused
}

impl Overlay {
    /// Create the overlay covering (0,0)..(width,height).
    /// Visual: no decorations, no title bar; starts fully transparent.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        let opts = WindowOptions {
            borderless: true,
            title: false,
            resize: false,
            topmost: true,
            transparency: true,
            none: true,
            ..WindowOptions::default()
        };
        let mut window = Window::new("cursor-trail", width as usize, height as usize, opts)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_position(0, 0);
        debug!(width, height, "overlay window created");

        Ok(Self { window, width, height, argb: Vec::with_capacity((width * height) as usize) })
    }

    /// X11 id of the native window. Anything else cannot be made click-through.
    pub fn x11_window_id(&self) -> Result<u32, Error> {
        let handle = self.window.window_handle().map_err(|e| Error::WindowInit(e.to_string()))?;
        x11_id(handle.as_raw())
    }
}

fn x11_id(raw: RawWindowHandle) -> Result<u32, Error> {
    match raw {
        RawWindowHandle::Xlib(h) => Ok(h.window as u32),
        RawWindowHandle::Xcb(h) => Ok(h.window.get()),
        other => Err(Error::WindowInit(format!("overlay is not an X11 window ({other:?})"))),
    }
}

impl Surface for Overlay {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Push the pixels for this frame to the screen.
    fn present(&mut self, frame: &RgbaImage) -> Result<(), Error> {
        pack_premultiplied_argb(frame, &mut self.argb);
        self.window
            .update_with_buffer(&self.argb, self.width as usize, self.height as usize)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.window.is_open()
    }
}
