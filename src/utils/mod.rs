pub mod state;

pub fn deg2rad(x: f64) -> f64 {
    const DEG2RAD_FACTOR: f64 = std::f64::consts::PI / 180.0;
    x * DEG2RAD_FACTOR
}

/// Wraps an angle into `(-pi, pi]`.
pub fn normalize_angle(mut theta: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    theta %= TAU;
    if theta > PI {
        theta -= TAU;
    } else if theta <= -PI {
        theta += TAU;
    }
    theta
}
