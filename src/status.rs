// One console line, rewritten in place, showing where the mouse is.
// Visual (terminal): `Mouse Coordinates: X=812   Y=430  ` updating live.

use crate::sample_loop::StepOutcome;
use std::io::{self, Write};

pub struct StatusLine<W: Write> {
    out: W,
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn start(&mut self) -> io::Result<()> {
        writeln!(self.out, "Mouse trail overlay started. Press Ctrl+C to exit.")?;
        write!(self.out, "\rMouse Coordinates: X=      Y=      ")?;
        self.out.flush()
    }

    pub fn update(&mut self, outcome: &StepOutcome) -> io::Result<()> {
        match outcome {
            StepOutcome::Sampled(p) => write!(self.out, "\rMouse Coordinates: X={:<5} Y={:<5}", p.x, p.y)?,
            StepOutcome::QueryFailed(_) => write!(self.out, "\rMouse Coordinates: Query Failed!   ")?,
            StepOutcome::Stopped => writeln!(self.out, "\nCleaning up resources...")?,
        }
        self.out.flush()
    }

    /// End the in-place line so whatever prints next starts on a fresh one.
    pub fn break_line(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}
