//! Inertial scrolling for the cover-flow strip
//!
//! Drags move the strip directly; a release with velocity starts a
//! constant-deceleration fling that always comes to rest on a whole tile.
//!
//! # Architecture
//!
//! ## L4 Atomic Layer
//! - `range` - Valid offset range, clamping and rounding
//! - `physics` - Pure fling math (snap plan, offset at time)
//! - `velocity` - Trailing-window release velocity
//!
//! ## L3 Molecular Layer
//! - `gesture` - Press/drag/tap state machine and per-frame animation tick
//!
//! # Usage
//!
//! ```ignore
//! use coverflu_core::scroll::{GestureController, HitRect};
//!
//! let mut controller = GestureController::new(config.scroll.clone(), observer);
//! controller.set_count(source.count());
//! controller.set_surface(width, HitRect::centered(width, height, 0.45, 1.2));
//!
//! controller.press_begin(x, y, Instant::now());
//! // ... press_move / press_end from the input layer
//!
//! // once per frame
//! controller.tick(Instant::now());
//! let offset = controller.offset();
//! ```

// L4 Atomic Layer
pub mod physics;
pub mod range;
pub mod velocity;

// L3 Molecular Layer
pub mod gesture;

pub use gesture::{GestureController, GesturePhase, HitRect};
pub use physics::{offset_at, snap_plan, SnapPlan};
pub use range::{round_offset, OffsetRange};
pub use velocity::VelocityTracker;
