// Fixed tunables. There is no runtime configuration: edit and rebuild.
// Visual expectation: these numbers decide how long the trail is, how fat
// each dot is, and which colors you see for moving vs. clicking.

use crate::types::Rgb;
use std::time::Duration;

/// Number of samples kept in the ring (the trail can never be longer).
pub const TRAIL_LENGTH: usize = 50;

/// Radius of every trail dot, in pixels.
pub const TRAIL_RADIUS: f32 = 3.0;

/// Plain movement color (soft blue).
pub const TRAIL_COLOR: Rgb = Rgb::new(0.2, 0.5, 1.0);

/// Color for samples taken while a button was held (red).
pub const CLICK_COLOR: Rgb = Rgb::new(1.0, 0.0, 0.0);

/// Opacity ceiling for plain samples, relative to their age alpha.
pub const TRAIL_OPACITY: f32 = 0.8;

/// Opacity ceiling for click samples; slightly stronger so clicks pop.
pub const CLICK_OPACITY: f32 = 0.9;

/// Age alpha below this is not drawn at all.
pub const MIN_VISIBLE_ALPHA: f32 = 0.05;

/// ~60 FPS.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_666);

/// Wait after a failed pointer query before trying again.
pub const QUERY_BACKOFF: Duration = Duration::from_millis(100);

/// Default log filter when RUST_LOG is not set.
pub const DEFAULT_LOG_FILTER: &str = "cursor_trail=info";
