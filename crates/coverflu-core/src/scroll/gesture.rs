//! L3 Molecular Layer: Touch gesture state machine
//!
//! Turns press/move/release samples into drags, taps and flings, and
//! advances the fling animation once per frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::physics::{offset_at, snap_plan};
use super::range::{round_offset, OffsetRange};
use super::velocity::VelocityTracker;
use crate::config::ScrollConfig;
use crate::observer::ScrollObserver;

/// Tap target in surface pixels; half-open like a platform rect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl HitRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle around the surface centre covering the centre tile
    pub fn centered(width: f32, height: f32, fraction: f32, scale: f32) -> Self {
        let half_w = width * fraction / scale / 2.0;
        let half_h = height * fraction / scale / 2.0;
        let (cx, cy) = (width / 2.0, height / 2.0);
        Self::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Externally visible gesture phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    /// Finger down, still inside the touch slop
    Pressed,
    Dragging,
    Animating,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    start_x: f32,
    start_y: f32,
    start_offset: f64,
    started_at: Instant,
}

/// Running fling toward an integer tile
#[derive(Debug, Clone, Copy)]
struct Animation {
    start_offset: f64,
    start_speed: f64,
    target: f64,
    duration: Duration,
    started_at: Instant,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Pressed(Press),
    Dragging(Press),
    Animating(Animation),
}

/// Gesture controller for a horizontal strip of tiles
///
/// Feed it `press_begin`/`press_move`/`press_end` from the input layer and
/// call `tick()` once per rendered frame. Poll `take_redraw_request()` to
/// know when the offset changed.
pub struct GestureController {
    config: ScrollConfig,
    observer: Arc<dyn ScrollObserver>,
    range: OffsetRange,
    offset: f64,
    /// Tile last reported through `on_top_tile_changed`
    last_top: usize,
    phase: Phase,
    velocity: VelocityTracker,
    surface_width: f32,
    hit_rect: Option<HitRect>,
    redraw: bool,
}

impl GestureController {
    pub fn new(config: ScrollConfig, observer: Arc<dyn ScrollObserver>) -> Self {
        let velocity = VelocityTracker::new(config.velocity_window());
        Self {
            config,
            observer,
            range: OffsetRange::default(),
            offset: 0.0,
            last_top: 0,
            phase: Phase::Idle,
            velocity,
            surface_width: 0.0,
            hit_rect: None,
            redraw: false,
        }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Current continuous offset in tile units
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn range(&self) -> OffsetRange {
        self.range
    }

    pub fn phase(&self) -> GesturePhase {
        match self.phase {
            Phase::Idle => GesturePhase::Idle,
            Phase::Pressed(_) => GesturePhase::Pressed,
            Phase::Dragging(_) => GesturePhase::Dragging,
            Phase::Animating(_) => GesturePhase::Animating,
        }
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating(_))
    }

    /// Offset the strip will settle on
    pub fn target_offset(&self) -> f64 {
        match self.phase {
            Phase::Animating(anim) => anim.target,
            _ => self.offset,
        }
    }

    /// Tile currently on top, `None` without tiles
    pub fn top_tile(&self) -> Option<usize> {
        self.range.tile_at(self.offset)
    }

    /// Whether the offset changed since the last call
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Update the tile count and re-clamp the offset
    pub fn set_count(&mut self, count: usize) {
        if self.range.count() == count {
            return;
        }
        self.range = OffsetRange::new(count);
        if count == 0 && self.is_animating() {
            self.phase = Phase::Idle;
        }
        self.set_offset(self.range.clamp(self.offset));
    }

    /// Surface size in pixels plus the tap rectangle of the centre tile
    pub fn set_surface(&mut self, width: f32, hit_rect: HitRect) {
        self.surface_width = width;
        self.hit_rect = Some(hit_rect);
    }

    /// Jump to a tile without animation and report it on top
    pub fn set_selection(&mut self, index: usize) {
        self.end_animation();
        self.set_offset(self.range.clamp(index as f64));
        if let Some(tile) = self.range.tile_at(self.offset) {
            self.last_top = tile;
            self.observer.on_top_tile_changed(tile);
        }
    }

    pub fn press_begin(&mut self, x: f32, y: f32, at: Instant) {
        self.end_animation();
        self.phase = Phase::Pressed(Press {
            start_x: x,
            start_y: y,
            start_offset: self.offset,
            started_at: at,
        });
        self.velocity.reset();
        self.velocity.add_sample(at, x);
    }

    pub fn press_move(&mut self, x: f32, y: f32, at: Instant) {
        let press = match self.phase {
            Phase::Pressed(press) => {
                let dx = (x - press.start_x).abs();
                let dy = (y - press.start_y).abs();
                if dx < self.config.touch_slop && dy < self.config.touch_slop {
                    return;
                }
                trace!(dx, dy, "press left touch slop");
                self.phase = Phase::Dragging(press);
                press
            }
            Phase::Dragging(press) => press,
            Phase::Idle | Phase::Animating(_) => return,
        };

        let offset = press.start_offset + self.drag_delta(x - press.start_x);
        self.set_offset(self.range.clamp(offset));
        self.redraw = true;
        self.velocity.add_sample(at, x);
    }

    pub fn press_end(&mut self, x: f32, y: f32, at: Instant) {
        match self.phase {
            Phase::Pressed(_) => {
                self.phase = Phase::Idle;
                let inside = self.hit_rect.is_some_and(|rect| rect.contains(x, y));
                if let (true, Some(tile)) = (inside, self.range.tile_at(self.offset)) {
                    debug!(tile, "tile tapped");
                    self.observer.on_tile_tapped(tile);
                }
            }
            Phase::Dragging(press) => {
                self.phase = Phase::Idle;
                let offset = press.start_offset + self.drag_delta(x - press.start_x);
                self.set_offset(self.range.clamp(offset));
                self.velocity.add_sample(at, x);

                let speed = self.release_speed();
                debug!(
                    speed,
                    held_ms = at.saturating_duration_since(press.started_at).as_millis() as u64,
                    "drag released"
                );
                self.start_animation(speed, at);
            }
            Phase::Idle | Phase::Animating(_) => {}
        }
    }

    /// Animate to the nearest tile from wherever the strip is now
    pub fn snap(&mut self, now: Instant) {
        if matches!(self.phase, Phase::Pressed(_) | Phase::Dragging(_)) {
            return;
        }
        self.start_animation(0.0, now);
    }

    /// Advance the fling and report a new top tile
    ///
    /// Call once per frame. Returns whether an animation is still running.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Phase::Animating(anim) = self.phase {
            let elapsed = now.saturating_duration_since(anim.started_at);
            if elapsed >= anim.duration {
                self.phase = Phase::Idle;
                self.set_offset(self.range.clamp(anim.target));
            } else {
                let offset = offset_at(
                    anim.start_offset,
                    anim.start_speed,
                    self.config.friction,
                    elapsed,
                    anim.duration,
                    self.range,
                );
                self.set_offset(offset);
            }
        }

        self.sync_top_tile();
        self.is_animating()
    }

    /// Stop a running fling on the nearest tile
    pub fn end_animation(&mut self) {
        if let Phase::Animating(_) = self.phase {
            self.phase = Phase::Idle;
            let snapped = self.range.clamp(round_offset(self.offset) as f64);
            self.set_offset(snapped);
            self.redraw = true;
        }
    }

    /// Starting while another animation is live is a no-op
    fn start_animation(&mut self, release_speed: f64, now: Instant) {
        if self.is_animating() {
            return;
        }

        let plan = snap_plan(self.offset, release_speed, self.config.friction, self.range);
        if plan.is_stationary() {
            self.set_offset(plan.target);
            self.redraw = true;
            return;
        }

        debug!(
            from = self.offset,
            to = plan.target,
            speed = plan.initial_speed,
            duration_ms = plan.duration.as_millis() as u64,
            "fling started"
        );
        self.phase = Phase::Animating(Animation {
            start_offset: self.offset,
            start_speed: plan.initial_speed,
            target: plan.target,
            duration: plan.duration,
            started_at: now,
        });
        self.redraw = true;
    }

    /// Release velocity in tiles/s, limited to `max_speed`
    fn release_speed(&self) -> f64 {
        let pixels_per_sec = f64::from(self.velocity.velocity());
        let speed = self.drag_delta_f64(pixels_per_sec);
        speed.clamp(-self.config.max_speed, self.config.max_speed)
    }

    /// Dragging right moves toward lower indices
    fn drag_delta(&self, dx: f32) -> f64 {
        self.drag_delta_f64(f64::from(dx))
    }

    fn drag_delta_f64(&self, dx: f64) -> f64 {
        if self.surface_width <= 0.0 {
            return 0.0;
        }
        -dx / f64::from(self.surface_width) * self.config.sensitivity
    }

    fn set_offset(&mut self, offset: f64) {
        if offset != self.offset {
            self.offset = offset;
            self.redraw = true;
        }
    }

    fn sync_top_tile(&mut self) {
        let Some(tile) = self.range.tile_at(self.offset) else {
            return;
        };
        if tile != self.last_top {
            self.last_top = tile;
            self.observer.on_top_tile_changed(tile);
        }
    }
}
