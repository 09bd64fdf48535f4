pub mod app;
pub mod wgpu_canvas;
pub mod window;

pub use app::{run, RedrawScheduler, UiHandles};
