use crate::analyzer::SnapshotSource;
use crate::canvas::Canvas;
use crate::scene::Scene;

/// Identifies one scheduled frame callback
pub type FrameHandle = u64;

/// Schedules and cancels frame callbacks
///
/// The production implementation wraps the window's redraw request; tests
/// use a spy. A handle stays valid until its callback fires or it is
/// cancelled.
pub trait FrameScheduler {
    /// Requests the next frame callback and returns its handle
    fn schedule(&mut self) -> FrameHandle;
    /// Cancels a scheduled callback; unknown handles are ignored
    fn cancel(&mut self, handle: FrameHandle);
}

/// The frame-synchronized capture-visualize loop
///
/// Each `frame` call schedules its own successor before touching the
/// snapshot or the canvas, so a cancellation request always has a valid
/// handle even if drawing fails mid-frame. Output depends only on the
/// current snapshot plus the monotonically increasing phase.
pub struct RenderLoop {
    snapshot: Vec<u8>,
    phase: f32,
    phase_step: f32,
    pending: Option<FrameHandle>,
}

impl RenderLoop {
    pub fn new(bin_count: usize, phase_step: f32) -> Self {
        Self {
            snapshot: vec![0; bin_count],
            phase: 0.0,
            phase_step,
            pending: None,
        }
    }

    /// The latest snapshot, overwritten in place every frame
    pub fn snapshot(&self) -> &[u8] {
        &self.snapshot
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs one loop iteration
    pub fn frame(
        &mut self,
        scheduler: &mut dyn FrameScheduler,
        source: &mut dyn SnapshotSource,
        canvas: &mut dyn Canvas,
        scene: &Scene,
    ) {
        self.pending = Some(scheduler.schedule());

        source.fill_frequency_bytes(&mut self.snapshot);
        self.phase += self.phase_step;

        scene.draw(canvas, &self.snapshot, self.phase);
    }

    /// Cancels the next scheduled callback, if any
    ///
    /// Returns whether a callback was actually pending.
    pub fn cancel_pending(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        match self.pending.take() {
            Some(handle) => {
                scheduler.cancel(handle);
                true
            }
            None => false,
        }
    }
}
