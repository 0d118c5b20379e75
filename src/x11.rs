// Direct X server access: screen geometry, pointer polling, and the window
// hints that turn the overlay into a click-through, always-on-top layer.

use crate::error::{Error, QueryError};
use crate::sample_loop::PointerQuery;
use crate::types::PointerState;
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shape::SK;
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, PropMode, VisualClass, Window};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

pub struct XDisplay {
    conn: RustConnection, // closed on drop
    screen_num: usize,
    root: Window,
    width: u16,
    height: u16,
}

fn request_err(e: impl std::fmt::Display) -> Error {
    Error::DisplayRequest(e.to_string())
}

impl XDisplay {
    /// Connect to $DISPLAY and check the default screen can show alpha.
    pub fn connect() -> Result<Self, Error> {
        let (conn, screen_num) = x11rb::connect(None).map_err(|e| Error::DisplayConnect(e.to_string()))?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::DisplayConnect(format!("screen {screen_num} not reported by server")))?;

        let has_argb = screen
            .allowed_depths
            .iter()
            .any(|d| d.depth == 32 && d.visuals.iter().any(|v| v.class == VisualClass::TRUE_COLOR));
        if !has_argb {
            return Err(Error::DisplayConnect(
                "no 32-bit TrueColor visual found; is a compositor running?".into(),
            ));
        }

        let (root, width, height) = (screen.root, screen.width_in_pixels, screen.height_in_pixels);
        debug!(screen_num, width, height, "connected to X server");
        let display = Self { conn, screen_num, root, width, height };
        display.warn_without_compositor();
        Ok(display)
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.width.into(), self.height.into())
    }

    fn atom(&self, name: &str) -> Result<Atom, Error> {
        Ok(self.conn.intern_atom(false, name.as_bytes()).map_err(request_err)?.reply().map_err(request_err)?.atom)
    }

    // Without a compositing manager the "transparent" pixels show up black.
    fn warn_without_compositor(&self) {
        let owner = self
            .atom(&format!("_NET_WM_CM_S{}", self.screen_num))
            .and_then(|a| self.conn.get_selection_owner(a).map_err(request_err))
            .and_then(|c| c.reply().map_err(request_err));
        match owner {
            Ok(reply) if reply.owner != x11rb::NONE => {}
            Ok(_) => warn!("no compositing manager detected; the overlay will not be transparent"),
            Err(e) => debug!(error = %e, "could not check for a compositing manager"),
        }
    }

    /// Give `window` an empty input shape so clicks fall through to what is
    /// underneath. Returns false if the server lacks XFixes.
    pub fn make_click_through(&self, window: Window) -> Result<bool, Error> {
        if self.conn.extension_information(xfixes::X11_EXTENSION_NAME).map_err(request_err)?.is_none() {
            return Ok(false);
        }
        // XFixes requires the version handshake before region requests.
        self.conn.xfixes_query_version(5, 0).map_err(request_err)?.reply().map_err(request_err)?;

        let region = self.conn.generate_id().map_err(request_err)?;
        self.conn.xfixes_create_region(region, &[]).map_err(request_err)?;
        self.conn.xfixes_set_window_shape_region(window, SK::INPUT, 0, 0, region).map_err(request_err)?;
        self.conn.xfixes_destroy_region(region).map_err(request_err)?;
        self.conn.flush().map_err(request_err)?;
        Ok(true)
    }

    /// Ask the window manager to keep `window` above everything and treat it
    /// like a dock (no taskbar entry, no focus).
    ///
    /// Window managers read the type and initial state only when a window is
    /// mapped, and the window arrives here already mapped. So it is withdrawn,
    /// given the hints, and mapped again.
    pub fn keep_above(&self, window: Window) -> Result<(), Error> {
        let window_type = self.atom("_NET_WM_WINDOW_TYPE")?;
        let dock = self.atom("_NET_WM_WINDOW_TYPE_DOCK")?;
        let wm_state = self.atom("_NET_WM_STATE")?;
        let above = self.atom("_NET_WM_STATE_ABOVE")?;

        self.conn.unmap_window(window).map_err(request_err)?;
        for (property, value) in dock_hints(window_type, dock, wm_state, above) {
            self.conn
                .change_property32(PropMode::REPLACE, window, property, AtomEnum::ATOM, &[value])
                .map_err(request_err)?;
        }
        self.conn.map_window(window).map_err(request_err)?;
        self.conn.flush().map_err(request_err)?;
        Ok(())
    }
}

/// (property, value) pairs written before the overlay is mapped.
fn dock_hints(window_type: Atom, dock: Atom, wm_state: Atom, above: Atom) -> [(Atom, Atom); 2] {
    [(window_type, dock), (wm_state, above)]
}

impl PointerQuery for XDisplay {
    /// Root-space pointer position plus button mask.
    fn query_pointer(&mut self) -> Result<PointerState, QueryError> {
        let reply = self
            .conn
            .query_pointer(self.root)
            .map_err(|e| QueryError::Connection(e.to_string()))?
            .reply()
            .map_err(|e| QueryError::Connection(e.to_string()))?;

        if !reply.same_screen {
            return Err(QueryError::OffScreen);
        }
        Ok(PointerState { x: reply.root_x.into(), y: reply.root_y.into(), buttons: u16::from(reply.mask) })
    }
}
