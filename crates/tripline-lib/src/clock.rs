//! Animation clock driving the trail shader
//!
//! The clock starts on its first tick and produces a looping current time in
//! trip timestamp units. A vertex glows while `time <= current_time` and
//! `current_time - time <= trail_length`.

use crate::projection::{Camera, Mat4};
use bytemuck::{Pod, Zeroable};

/// Animation parameters taken from the layer options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    /// Time-scale multiplier applied after wrapping
    pub speed: f64,
    /// Animation period; non-positive disables wrapping
    pub loop_time: f64,
    /// Glow window length in timestamp units
    pub trail_length: f64,
    pub opacity: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_time: 1800.0,
            trail_length: 5.0,
            opacity: 1.0,
        }
    }
}

/// Per-frame uniform set handed to the rendering engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub current_time: f64,
    pub trail_length: f64,
    pub opacity: f64,
    pub view_projection_matrix: Mat4,
}

impl FrameUniforms {
    /// Whether a vertex with this timestamp is inside the glowing trail
    #[inline]
    pub fn in_trail(&self, vertex_time: u16) -> bool {
        let time = f64::from(vertex_time);
        time <= self.current_time && self.current_time - time <= self.trail_length
    }

    /// Uniform block layout matching `TRAIL_SHADER_WGSL`
    pub fn to_gpu(&self) -> TrailUniforms {
        TrailUniforms {
            view_projection: self.view_projection_matrix,
            current_time: self.current_time as f32,
            trail_length: self.trail_length as f32,
            opacity: self.opacity as f32,
            _padding: 0.0,
        }
    }
}

/// `std140`-compatible uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TrailUniforms {
    pub view_projection: Mat4,
    pub current_time: f32,
    pub trail_length: f32,
    pub opacity: f32,
    pub _padding: f32,
}

/// Looping clock with a lazily recorded start time
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClock {
    config: ClockConfig,
    /// Seconds, recorded on the first tick
    start_time: Option<f64>,
}

impl AnimationClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            start_time: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Replace the configuration; the start time is kept
    pub fn set_config(&mut self, config: ClockConfig) {
        self.config = config;
    }

    #[inline]
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Forget the start time; the next tick restarts the loop
    pub fn reset(&mut self) {
        self.start_time = None;
    }

    /// Looping current time for monotonic timestamp `now` (seconds)
    pub fn current_time(&mut self, now: f64) -> f64 {
        let start = *self.start_time.get_or_insert(now);
        let elapsed = now - start;
        let loop_time = self.config.loop_time;
        let wrapped = if loop_time > 0.0 && loop_time.is_finite() {
            elapsed.rem_euclid(loop_time)
        } else {
            elapsed
        };
        wrapped * self.config.speed
    }

    /// Compute this frame's uniforms
    pub fn tick<C: Camera + ?Sized>(&mut self, now: f64, camera: &C) -> FrameUniforms {
        let current_time = self.current_time(now);
        tracing::trace!("Animation tick: current_time={:.3}", current_time);
        FrameUniforms {
            current_time,
            trail_length: self.config.trail_length,
            opacity: self.config.opacity,
            view_projection_matrix: camera.view_projection_matrix(),
        }
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCamera;

    impl Camera for FixedCamera {
        fn view_projection_matrix(&self) -> Mat4 {
            let mut m = [0.0; 16];
            m[0] = 1.0;
            m[5] = 1.0;
            m[10] = 1.0;
            m[15] = 1.0;
            m
        }
    }

    #[test]
    fn test_first_tick_records_start() {
        let mut clock = AnimationClock::default();
        assert_eq!(clock.start_time(), None);
        let uniforms = clock.tick(42.0, &FixedCamera);
        assert_eq!(clock.start_time(), Some(42.0));
        assert_eq!(uniforms.current_time, 0.0);
    }

    #[test]
    fn test_periodic_over_loop_time() {
        let mut clock = AnimationClock::default();
        let start = 100.0;
        let at_start = clock.current_time(start);
        let at_period = clock.current_time(start + 1800.0);
        assert!(at_start.abs() < 1e-9);
        assert!(at_period.abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_within_period() {
        let mut clock = AnimationClock::default();
        clock.current_time(0.0);
        let mut previous = -1.0;
        for step in 0..1800 {
            let t = clock.current_time(step as f64 + 0.5);
            assert!(t > previous);
            previous = t;
        }
    }

    #[test]
    fn test_speed_scales_after_wrapping() {
        let mut clock = AnimationClock::new(ClockConfig {
            speed: 2.0,
            loop_time: 10.0,
            ..Default::default()
        });
        clock.current_time(0.0);
        assert!((clock.current_time(3.0) - 6.0).abs() < 1e-9);
        assert!((clock.current_time(13.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_loop_disables_wrapping() {
        let mut clock = AnimationClock::new(ClockConfig {
            loop_time: 0.0,
            ..Default::default()
        });
        clock.current_time(0.0);
        assert!((clock.current_time(5000.0) - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_passthrough_uniforms() {
        let mut clock = AnimationClock::new(ClockConfig {
            trail_length: 12.0,
            opacity: 0.25,
            ..Default::default()
        });
        let uniforms = clock.tick(0.0, &FixedCamera);
        assert_eq!(uniforms.trail_length, 12.0);
        assert_eq!(uniforms.opacity, 0.25);
        assert_eq!(uniforms.view_projection_matrix, FixedCamera.view_projection_matrix());

        let gpu = uniforms.to_gpu();
        assert_eq!(bytemuck::bytes_of(&gpu).len(), 80);
    }

    #[test]
    fn test_trail_window() {
        let uniforms = FrameUniforms {
            current_time: 100.0,
            trail_length: 5.0,
            opacity: 1.0,
            view_projection_matrix: [0.0; 16],
        };
        assert!(uniforms.in_trail(100));
        assert!(uniforms.in_trail(95));
        assert!(!uniforms.in_trail(94));
        assert!(!uniforms.in_trail(101));
    }

    #[test]
    fn test_reset_restarts_loop() {
        let mut clock = AnimationClock::default();
        clock.current_time(10.0);
        clock.reset();
        assert_eq!(clock.current_time(50.0), 0.0);
    }
}
