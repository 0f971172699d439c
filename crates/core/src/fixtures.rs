//! Synthetic landmark frames shared by the unit tests.

use crate::{
    clock::ManualClock,
    landmarks::{Joint, Landmark, LandmarkFrame},
};

/// Upright, symmetric body facing the camera with straight limbs.
pub fn standing() -> LandmarkFrame {
    LandmarkFrame::filled(Landmark::new(0.5, 0.5))
        .with(Joint::Nose, Landmark::new(0.5, 0.12))
        .with(Joint::LeftShoulder, Landmark::new(0.42, 0.3))
        .with(Joint::RightShoulder, Landmark::new(0.58, 0.3))
        .with(Joint::LeftElbow, Landmark::new(0.42, 0.42))
        .with(Joint::RightElbow, Landmark::new(0.58, 0.42))
        .with(Joint::LeftWrist, Landmark::new(0.42, 0.54))
        .with(Joint::RightWrist, Landmark::new(0.58, 0.54))
        .with(Joint::LeftHip, Landmark::new(0.45, 0.55))
        .with(Joint::RightHip, Landmark::new(0.55, 0.55))
        .with(Joint::LeftKnee, Landmark::new(0.45, 0.72))
        .with(Joint::RightKnee, Landmark::new(0.55, 0.72))
        .with(Joint::LeftAnkle, Landmark::new(0.45, 0.9))
        .with(Joint::RightAnkle, Landmark::new(0.55, 0.9))
}

/// Moves `c` around the vertex `b` so that the angle `a-b-c` equals `degrees`,
/// keeping the `b-c` segment length.
pub fn bend(mut frame: LandmarkFrame, a: Joint, b: Joint, c: Joint, degrees: f64) -> LandmarkFrame {
    let points = (
        frame.get(a).copied(),
        frame.get(b).copied(),
        frame.get(c).copied(),
    );
    let (Some(pa), Some(pb), Some(pc)) = points else {
        return frame;
    };

    let (ux, uy) = (pa.x - pb.x, pa.y - pb.y);
    let norm = (ux * ux + uy * uy).sqrt();
    let (ux, uy) = (ux / norm, uy / norm);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (dx, dy) = (ux * cos - uy * sin, ux * sin + uy * cos);
    let length = pb.distance_to(&pc);

    frame.set(
        c,
        Landmark {
            x: pb.x + dx * length,
            y: pb.y + dy * length,
            ..pc
        },
    );
    frame
}

/// Standing frame with both knees at `degrees`.
pub fn squat(degrees: f64) -> LandmarkFrame {
    let frame = bend(standing(), Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle, degrees);
    bend(frame, Joint::RightHip, Joint::RightKnee, Joint::RightAnkle, degrees)
}

/// Standing frame with both elbows at `degrees`.
pub fn pushup(degrees: f64) -> LandmarkFrame {
    let frame = bend(
        standing(),
        Joint::LeftShoulder,
        Joint::LeftElbow,
        Joint::LeftWrist,
        degrees,
    );
    bend(
        frame,
        Joint::RightShoulder,
        Joint::RightElbow,
        Joint::RightWrist,
        degrees,
    )
}

/// Side-on plank. A sagging plank drops the hips well below the line.
pub fn plank(straight: bool) -> LandmarkFrame {
    let hip_y = if straight { 0.6 } else { 0.8 };
    LandmarkFrame::filled(Landmark::new(0.5, 0.5))
        .with(Joint::LeftShoulder, Landmark::new(0.2, 0.6))
        .with(Joint::LeftHip, Landmark::new(0.45, hip_y))
        .with(Joint::LeftKnee, Landmark::new(0.65, 0.6))
        .with(Joint::LeftAnkle, Landmark::new(0.85, 0.6))
}

/// Tree pose standing on the left leg with the right knee folded.
pub fn tree() -> LandmarkFrame {
    bend(standing(), Joint::RightHip, Joint::RightKnee, Joint::RightAnkle, 60.0)
}

/// Warrior II with the left leg in front, arms level with the shoulders.
pub fn warrior(front_knee_degrees: f64) -> LandmarkFrame {
    let frame = standing()
        .with(Joint::LeftWrist, Landmark::new(0.2, 0.3))
        .with(Joint::RightWrist, Landmark::new(0.8, 0.3))
        .with(Joint::LeftKnee, Landmark::new(0.25, 0.7))
        .with(Joint::LeftAnkle, Landmark::new(0.25, 0.88))
        .with(Joint::RightKnee, Landmark::new(0.65, 0.72))
        .with(Joint::RightAnkle, Landmark::new(0.75, 0.89));
    bend(
        frame,
        Joint::LeftHip,
        Joint::LeftKnee,
        Joint::LeftAnkle,
        front_knee_degrees,
    )
}

pub fn with_confidence(mut frame: LandmarkFrame, joint: Joint, confidence: f64) -> LandmarkFrame {
    if let Some(point) = frame.get(joint).copied() {
        frame.set(joint, point.with_confidence(confidence));
    }
    frame
}

pub fn clock() -> ManualClock {
    ManualClock::new()
}
