use crate::landmarks::{Joint, Landmark, LandmarkFrame};

/// Interior angle at `b`, in degrees, between the rays `b -> a` and `b -> c`.
///
/// The result is folded into `[0, 180]`. Non-finite input yields `0.0`.
pub fn angle_degrees(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }

    if angle.is_finite() {
        angle
    } else {
        0.0
    }
}

/// Angle at joint `b` of `frame`. Returns `0.0` when any of the three points is
/// missing from the frame.
pub fn joint_angle(frame: &LandmarkFrame, a: Joint, b: Joint, c: Joint) -> f64 {
    match (frame.get(a), frame.get(b), frame.get(c)) {
        (Some(a), Some(b), Some(c)) => angle_degrees(a, b, c),
        _ => 0.0,
    }
}

/// Absolute vertical distance between two joints, or `0.0` if either is absent.
pub fn vertical_gap(frame: &LandmarkFrame, a: Joint, b: Joint) -> f64 {
    match (frame.get(a), frame.get(b)) {
        (Some(a), Some(b)) => (a.y - b.y).abs(),
        _ => 0.0,
    }
}
