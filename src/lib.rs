// Export modules for use in tests
pub mod config;
pub mod engine;
pub mod export;
pub mod geometry;
pub mod recent;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

// Re-export the shell surface
pub use engine::{EngineFault, RenderEngine};
pub use viewer::{HitTest, Modifiers, Viewer, ViewerError, ViewerEvent, ViewerStatus};
