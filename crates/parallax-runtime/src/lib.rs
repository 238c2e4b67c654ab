//! Parallax Runtime - the transition coordinator and its collaborators
//!
//! A transition moves the viewer from one level of detail to another:
//! 1. Admit (single flight, debounce)
//! 2. Prefetch the target level's data
//! 3. Select the target entity, start camera move and text reveal
//! 4. Wait for both, bounded by a timeout
//! 5. Swap the view level and mount the fetched scene
//! 6. Wait for the new scene's first paint, bounded by a timeout
//! 7. Reset to Idle, whatever happened before
//!
//! [`Viewer`] wires the coordinator to a tick scheduler, scene store, reveal
//! controller and camera rig, and runs the tick driver.

pub mod camera;
pub mod config;
pub mod coordinator;
pub mod host;
pub mod logging;
pub mod source;
pub mod viewer;

pub use camera::*;
pub use config::*;
pub use coordinator::*;
pub use host::*;
pub use logging::*;
pub use source::*;
pub use viewer::*;
