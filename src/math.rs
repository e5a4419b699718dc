/// Horizontal image offset per degree of rotation, in pixels
pub const OFFSET_PX_PER_DEGREE: f64 = 2.0;

/// Horizontal hotspot shift per degree of rotation, in pixels
pub const HOTSPOT_PX_PER_DEGREE: f64 = 0.5;

/// Wraps an angle in degrees into `[0, 360)`
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative angles up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Adds `delta` to a zoom percentage and clamps the result to `[min, max]`
///
/// If `min > max` the result is `max`.
pub fn step_zoom(zoom: i32, delta: i32, min: i32, max: i32) -> i32 {
    zoom.saturating_add(delta).max(min).min(max)
}

/// Visual transform the view layer applies to the current scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Horizontal offset of the panorama image, in pixels
    pub offset_x: f64,
    /// Scale factor, 1.0 at 100% zoom
    pub magnification: f64,
    /// Horizontal offset of every hotspot marker, in pixels
    pub hotspot_shift_x: f64,
}

impl ViewTransform {
    pub fn new(rotation: f64, zoom: i32) -> Self {
        ViewTransform {
            offset_x: -rotation * OFFSET_PX_PER_DEGREE,
            magnification: f64::from(zoom) / 100.0,
            hotspot_shift_x: -rotation * HOTSPOT_PX_PER_DEGREE,
        }
    }
}

/// Linear interpolation between `a` and `b`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Smooth Hermite easing of `t` in `[0, 1]`
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_angles_in_range() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-5.0), 355.0);
        assert_eq!(wrap_degrees(720.0), 0.0);
        assert_eq!(wrap_degrees(-1e-17), 0.0);
        for step in -1000..1000 {
            let angle = wrap_degrees(f64::from(step) * 7.3);
            assert!((0.0..360.0).contains(&angle), "{angle} out of range");
        }
    }

    #[test]
    fn zoom_steps_clamp_at_bounds() {
        assert_eq!(step_zoom(190, 20, 50, 200), 200);
        assert_eq!(step_zoom(60, -20, 50, 200), 50);
        assert_eq!(step_zoom(100, 10, 50, 200), 110);
        assert_eq!(step_zoom(i32::MAX, 1, 50, 200), 200);
        assert_eq!(step_zoom(100, 0, 150, 80), 80);
    }

    #[test]
    fn transform_follows_rotation_and_zoom() {
        let t = ViewTransform::new(90.0, 150);
        assert_eq!(t.offset_x, -180.0);
        assert_eq!(t.magnification, 1.5);
        assert_eq!(t.hotspot_shift_x, -45.0);
    }

    #[test]
    fn smoothstep_is_clamped() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
    }
}
