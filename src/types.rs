// Core value types shared by the ring buffer, renderer and loop.

/// X11 core button bits (Button1Mask .. Button5Mask). Any of them set means
/// the sample counts as a click; which button, or press vs. hold, is ignored.
pub const TRACKED_BUTTONS_MASK: u16 = 0x1F00;

/// One recorded observation of the pointer.
/// Visual: a single dot of the trail (once it is `valid`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    pub x: i32,
    pub y: i32,
    pub valid: bool,   // false only for slots that were never written
    pub clicked: bool, // a tracked button was down when sampled
}

/// What the host reports for the pointer right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    pub buttons: u16, // raw modifier/button mask as the server sends it
}

impl PointerState {
    pub fn any_button_held(&self) -> bool {
        self.buttons & TRACKED_BUTTONS_MASK != 0
    }
}

/// Straight (non-premultiplied) color with channels in [0,1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Channels as 0..=255 bytes.
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}
