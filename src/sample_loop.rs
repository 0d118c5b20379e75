// The driving loop: sample pointer -> push into ring -> redraw -> present -> wait.
// Visual expectation: while this runs, a dot trail chases the cursor at ~60 FPS.
// Exactly one frame is in flight; nothing here is shared with another thread
// except the shutdown flag.

use crate::config;
use crate::error::{Error, QueryError};
use crate::render::TrailRenderer;
use crate::trail::TrailBuffer;
use crate::types::PointerState;
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the pointer comes from (the X server in the real program).
pub trait PointerQuery {
    fn query_pointer(&mut self) -> Result<PointerState, QueryError>;
}

/// Where finished frames go (the overlay window in the real program).
pub trait Surface {
    /// Pixel size the canvas must have.
    fn size(&self) -> (u32, u32);
    /// Make this frame visible.
    fn present(&mut self, frame: &RgbaImage) -> Result<(), Error>;
    /// False once the surface went away on its own.
    fn is_open(&self) -> bool {
        true
    }
}

/// Cooperative stop request. Cloned into the signal handler; the loop polls it.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoopTiming {
    pub frame_interval: Duration,
    pub query_backoff: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self { frame_interval: config::FRAME_INTERVAL, query_backoff: config::QUERY_BACKOFF }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    QueryFailed,
    Stopped,
}

/// What one iteration did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Sampled(PointerState),
    QueryFailed(QueryError),
    Stopped,
}

// Field order is drop order: the surface goes before the pointer source,
// the reverse of how main acquires them.
pub struct SampleLoop<P, S> {
    surface: S,
    pointer: P,
    trail: TrailBuffer,
    renderer: TrailRenderer,
    canvas: RgbaImage, // reused every frame, sized to the surface
    timing: LoopTiming,
    shutdown: ShutdownFlag,
    state: LoopState,
}

impl<P: PointerQuery, S: Surface> SampleLoop<P, S> {
    pub fn new(
        pointer: P,
        surface: S,
        trail: TrailBuffer,
        renderer: TrailRenderer,
        timing: LoopTiming,
        shutdown: ShutdownFlag,
    ) -> Self {
        let (w, h) = surface.size();
        Self {
            surface,
            pointer,
            trail,
            renderer,
            canvas: RgbaImage::new(w, h),
            timing,
            shutdown,
            state: LoopState::Running,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    /// One full iteration. Errors only when presenting fails.
    pub fn step(&mut self) -> Result<StepOutcome, Error> {
        if self.state == LoopState::Stopped {
            return Ok(StepOutcome::Stopped);
        }
        let interrupted = self.shutdown.is_requested();
        if interrupted || !self.surface.is_open() {
            info!(interrupted, "stopping sample loop");
            self.state = LoopState::Stopped;
            return Ok(StepOutcome::Stopped);
        }

        if self.state == LoopState::QueryFailed {
            debug!("retrying pointer query");
            self.state = LoopState::Running;
        }

        let started = Instant::now();
        match self.pointer.query_pointer() {
            Ok(pointer) => {
                // 1) record, 2) redraw from the ring, 3) show it
                self.trail.push(pointer.x, pointer.y, pointer.any_button_held());
                self.renderer.render(&self.trail, &mut self.canvas);
                self.surface.present(&self.canvas)?;

                // Keep a steady cadence: only sleep what the frame did not use.
                pause(self.timing.frame_interval.saturating_sub(started.elapsed()));
                Ok(StepOutcome::Sampled(pointer))
            }
            Err(err) => {
                // Ring and canvas stay untouched; nothing synthetic is recorded.
                // The state stays QueryFailed until the next step retries.
                self.state = LoopState::QueryFailed;
                warn!(error = %err, backoff_ms = self.timing.query_backoff.as_millis() as u64, "pointer query failed");
                pause(self.timing.query_backoff);
                Ok(StepOutcome::QueryFailed(err))
            }
        }
    }

    /// Step until stopped, handing every outcome to `observe`.
    pub fn run(&mut self, mut observe: impl FnMut(&StepOutcome)) -> Result<(), Error> {
        info!(capacity = self.trail.capacity(), "sample loop running");
        loop {
            let outcome = self.step()?;
            observe(&outcome);
            if outcome == StepOutcome::Stopped {
                return Ok(());
            }
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TrailStyle;
    use crate::types::Sample;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Replays a script, then asks for shutdown (like Ctrl+C arriving mid-run).
    struct ScriptedPointer {
        script: VecDeque<Result<PointerState, QueryError>>,
        shutdown: ShutdownFlag,
        probe: Rc<Probe>,
    }

    impl Drop for ScriptedPointer {
        fn drop(&mut self) {
            self.probe.released.borrow_mut().push("pointer");
        }
    }

    impl PointerQuery for ScriptedPointer {
        fn query_pointer(&mut self) -> Result<PointerState, QueryError> {
            self.script.pop_front().unwrap_or_else(|| {
                self.shutdown.request();
                Err(QueryError::OffScreen)
            })
        }
    }

    #[derive(Default)]
    struct Probe {
        presented: Cell<usize>,
        released: RefCell<Vec<&'static str>>, // drop log, in drop order
        last_frame: RefCell<Option<RgbaImage>>,
    }

    struct FakeSurface {
        probe: Rc<Probe>,
        open: Rc<Cell<bool>>,
        fail_present: bool,
    }

    impl Surface for FakeSurface {
        fn size(&self) -> (u32, u32) {
            (64, 48)
        }

        fn present(&mut self, frame: &RgbaImage) -> Result<(), Error> {
            if self.fail_present {
                return Err(Error::WindowUpdate("gone".into()));
            }
            self.probe.presented.set(self.probe.presented.get() + 1);
            *self.probe.last_frame.borrow_mut() = Some(frame.clone());
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open.get()
        }
    }

    impl Drop for FakeSurface {
        fn drop(&mut self) {
            self.probe.released.borrow_mut().push("surface");
        }
    }

    fn at(x: i32, y: i32, buttons: u16) -> Result<PointerState, QueryError> {
        Ok(PointerState { x, y, buttons })
    }

    fn instant() -> LoopTiming {
        LoopTiming { frame_interval: Duration::ZERO, query_backoff: Duration::ZERO }
    }

    fn build(
        script: Vec<Result<PointerState, QueryError>>,
    ) -> (SampleLoop<ScriptedPointer, FakeSurface>, Rc<Probe>, Rc<Cell<bool>>, ShutdownFlag) {
        let shutdown = ShutdownFlag::new();
        let probe = Rc::new(Probe::default());
        let open = Rc::new(Cell::new(true));
        let pointer = ScriptedPointer { script: script.into(), shutdown: shutdown.clone(), probe: probe.clone() };
        let surface = FakeSurface { probe: probe.clone(), open: open.clone(), fail_present: false };
        let lp = SampleLoop::new(
            pointer,
            surface,
            TrailBuffer::new(50),
            TrailRenderer::new(TrailStyle::default()),
            instant(),
            shutdown.clone(),
        );
        (lp, probe, open, shutdown)
    }

    #[test]
    fn failed_query_records_nothing_and_next_success_records_one() {
        let (mut lp, probe, _, _) = build(vec![Err(QueryError::OffScreen), at(12, 7, 0)]);

        assert_eq!(lp.step().unwrap(), StepOutcome::QueryFailed(QueryError::OffScreen));
        assert_eq!(lp.state(), LoopState::QueryFailed);
        assert_eq!(lp.trail().len(), 0);
        assert_eq!(probe.presented.get(), 0);

        assert_eq!(lp.step().unwrap(), StepOutcome::Sampled(PointerState { x: 12, y: 7, buttons: 0 }));
        assert_eq!(lp.state(), LoopState::Running);
        assert_eq!(lp.trail().len(), 1);
        let valid: Vec<Sample> = lp.trail().iter_by_age().map(|(_, s)| s).filter(|s| s.valid).collect();
        assert_eq!(valid, vec![Sample { x: 12, y: 7, valid: true, clicked: false }]);
    }

    #[test]
    fn button_mask_becomes_click_flag() {
        let (mut lp, _, _, _) = build(vec![at(1, 1, 0x0100), at(2, 2, 0x0001)]);
        lp.step().unwrap();
        lp.step().unwrap();
        let clicks: Vec<bool> = lp.trail().iter_by_age().take(2).map(|(_, s)| s.clicked).collect();
        // newest first: Shift only, then Button1
        assert_eq!(clicks, vec![false, true]);
    }

    #[test]
    fn presented_frame_already_contains_this_frames_sample() {
        let (mut lp, probe, _, _) = build(vec![at(30, 20, 0)]);
        lp.step().unwrap();
        let frame = probe.last_frame.borrow();
        let frame = frame.as_ref().unwrap();
        assert!(frame.get_pixel(30, 20)[3] > 0);
    }

    #[test]
    fn interrupt_mid_loop_stops_and_releases_everything_once_in_reverse_order() {
        let script = vec![at(1, 1, 0), at(2, 2, 0), Err(QueryError::Connection("eof".into())), at(3, 3, 0)];
        let (mut lp, probe, _, shutdown) = build(script);

        let mut seen = Vec::new();
        lp.run(|o| seen.push(o.clone())).unwrap();

        assert!(shutdown.is_requested());
        assert_eq!(lp.state(), LoopState::Stopped);
        // 4 scripted steps, 1 step where the interrupt lands, then Stopped.
        assert_eq!(seen.len(), 6);
        assert_eq!(seen.last(), Some(&StepOutcome::Stopped));
        assert_eq!(probe.presented.get(), 3);
        assert_eq!(lp.trail().len(), 3);

        assert!(probe.released.borrow().is_empty());
        drop(lp);
        // main acquires display then overlay; release runs the other way.
        assert_eq!(*probe.released.borrow(), vec!["surface", "pointer"]);
    }

    #[test]
    fn observer_sees_query_failed_state_during_backoff() {
        let (mut lp, _, _, _) = build(vec![at(1, 1, 0), Err(QueryError::OffScreen), at(2, 2, 0)]);
        let mut states = Vec::new();
        for _ in 0..3 {
            let outcome = lp.step().unwrap();
            states.push((outcome, lp.state()));
        }
        assert_eq!(
            states.iter().map(|(_, s)| *s).collect::<Vec<_>>(),
            vec![LoopState::Running, LoopState::QueryFailed, LoopState::Running]
        );
        assert_eq!(states[1].0, StepOutcome::QueryFailed(QueryError::OffScreen));
    }

    #[test]
    fn interrupt_during_query_failure_still_stops() {
        let (mut lp, _, _, shutdown) = build(vec![Err(QueryError::OffScreen), at(1, 1, 0)]);
        lp.step().unwrap();
        assert_eq!(lp.state(), LoopState::QueryFailed);
        shutdown.request();
        assert_eq!(lp.step().unwrap(), StepOutcome::Stopped);
        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(lp.trail().len(), 0);
    }

    #[test]
    fn stopped_is_terminal() {
        let (mut lp, probe, _, shutdown) = build(vec![at(1, 1, 0), at(2, 2, 0)]);
        shutdown.request();
        assert_eq!(lp.step().unwrap(), StepOutcome::Stopped);
        assert_eq!(lp.step().unwrap(), StepOutcome::Stopped);
        assert_eq!(probe.presented.get(), 0);
        assert_eq!(lp.trail().len(), 0);
    }

    #[test]
    fn closed_surface_stops_the_loop() {
        let (mut lp, _, open, _) = build(vec![at(1, 1, 0), at(2, 2, 0)]);
        lp.step().unwrap();
        open.set(false);
        assert_eq!(lp.step().unwrap(), StepOutcome::Stopped);
        assert_eq!(lp.state(), LoopState::Stopped);
    }

    #[test]
    fn present_failure_is_fatal() {
        let shutdown = ShutdownFlag::new();
        let probe = Rc::new(Probe::default());
        let surface = FakeSurface { probe: probe.clone(), open: Rc::new(Cell::new(true)), fail_present: true };
        let pointer =
            ScriptedPointer { script: vec![at(1, 1, 0)].into(), shutdown: shutdown.clone(), probe: probe.clone() };
        let mut lp = SampleLoop::new(
            pointer,
            surface,
            TrailBuffer::new(50),
            TrailRenderer::new(TrailStyle::default()),
            instant(),
            shutdown,
        );
        assert!(matches!(lp.run(|_| {}), Err(Error::WindowUpdate(_))));
    }

    #[test]
    fn successful_frame_waits_out_the_frame_interval() {
        let (mut lp, _, _, _) = build(vec![at(1, 1, 0)]);
        lp.timing = LoopTiming { frame_interval: Duration::from_millis(15), query_backoff: Duration::ZERO };
        let t = Instant::now();
        lp.step().unwrap();
        assert!(t.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn failed_query_waits_out_the_backoff() {
        let (mut lp, _, _, _) = build(vec![Err(QueryError::OffScreen)]);
        lp.timing = LoopTiming { frame_interval: Duration::ZERO, query_backoff: Duration::from_millis(20) };
        let t = Instant::now();
        lp.step().unwrap();
        assert!(t.elapsed() >= Duration::from_millis(20));
    }
}
