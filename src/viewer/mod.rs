//! Viewer core: viewport state, hit-testing, selection, rendering

mod hittest;
mod render;
mod selection;
mod shell;
mod state;
mod zoom;

pub use hittest::{HitTest, ImageHit, MAX_TRAVERSAL_DEPTH, image_at_point, tolerance_in_points};
pub use render::{DEFAULT_FRAME_CACHE_SIZE, RenderScheduler, RenderStats};
pub use selection::SelectionRegion;
pub use shell::{Modifiers, RenderedFrame, Viewer, ViewerError, ViewerEvent, ViewerStatus};
pub use state::{ContentGeometry, Effect, ViewportCmd, ViewportState};
pub use zoom::{MAX_FACTOR, MIN_FACTOR, WHEEL_STEP_IN, WHEEL_STEP_OUT, anchored_scroll, clamp_factor};
