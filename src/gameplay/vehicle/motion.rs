use super::*;
use crate::config::VehicleConfig;

pub const DEFAULT_ACCELERATION: f32 = 0.005;
pub const DEFAULT_MAX_SPEED: f32 = 0.5;
pub const DEFAULT_TURN_RATE: f32 = 0.05;
pub const DEFAULT_WHEEL_SPIN_RATE: f32 = 0.1;

/// Per-frame driving constants. All rates are applied once per rendered frame.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct VehicleTuning {
    pub acceleration: f32,
    pub max_speed: f32,
    /// Yaw radians per frame while a turn is active.
    pub turn_rate: f32,
    /// Wheel radians per frame while the vehicle moves.
    pub wheel_spin_rate: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            acceleration: DEFAULT_ACCELERATION,
            max_speed: DEFAULT_MAX_SPEED,
            turn_rate: DEFAULT_TURN_RATE,
            wheel_spin_rate: DEFAULT_WHEEL_SPIN_RATE,
        }
    }
}

impl VehicleTuning {
    pub fn from_config(vehicle: &VehicleConfig) -> Self {
        Self {
            acceleration: vehicle.acceleration,
            max_speed: vehicle.max_speed,
            turn_rate: vehicle.turn_rate,
            wheel_spin_rate: vehicle.wheel_spin_rate,
        }
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleMotion {
    /// Signed; positive drives forward.
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFrame {
    /// Steering in radians, clockwise seen from above: a left turn is negative.
    pub heading_delta: f32,
    pub throttle_active: bool,
}

impl MotionFrame {
    /// Rotation about +Y for the body. Bevy yaw is counter-clockwise from above.
    pub fn body_yaw(&self) -> f32 {
        -self.heading_delta
    }
}

impl VehicleMotion {
    pub fn step(&mut self, input: &ControlInputState, tuning: &VehicleTuning) -> MotionFrame {
        let forward = input.is_held(ControlAction::Forward);
        let backward = input.is_held(ControlAction::Backward);
        let left = input.is_held(ControlAction::Left);
        let right = input.is_held(ControlAction::Right);

        let mut speed = self.speed;
        let mut throttle_active = false;

        if forward {
            speed = (speed + tuning.acceleration).min(tuning.max_speed);
            throttle_active = true;
        }
        if backward {
            speed = (speed - tuning.acceleration).max(-tuning.max_speed);
            throttle_active = true;
        }

        let mut heading_delta = 0.0;
        if (left && forward) || (right && backward) {
            heading_delta -= tuning.turn_rate;
        }
        if (right && forward) || (left && backward) {
            heading_delta += tuning.turn_rate;
        }

        if !throttle_active {
            speed = drag_toward_zero(speed, tuning.acceleration);
        }

        self.speed = speed;

        MotionFrame {
            heading_delta,
            throttle_active,
        }
    }

    /// Translation request along a body whose nose points down local -X.
    pub fn translation_along(&self, right: Vec3) -> Option<Vec3> {
        (self.speed != 0.0).then(|| right * -self.speed)
    }
}

fn drag_toward_zero(speed: f32, drag: f32) -> f32 {
    if speed > 0.0 {
        (speed - drag).max(0.0)
    } else if speed < 0.0 {
        (speed + drag).min(0.0)
    } else {
        0.0
    }
}

pub(super) fn apply_vehicle_motion(
    input: Res<ControlInputState>,
    tuning: Res<VehicleTuning>,
    link: Res<VehicleLink>,
    mut motion: ResMut<VehicleMotion>,
    mut body_query: Query<(&mut Transform, &mut KinematicCharacterController), With<PlayerVehicle>>,
) {
    let frame = motion.step(&input, &tuning);

    let Some(rig) = link.rig() else {
        return;
    };
    let Ok((mut transform, mut controller)) = body_query.get_mut(rig.body) else {
        return;
    };

    if frame.heading_delta != 0.0 {
        transform.rotate_local_y(frame.body_yaw());
    }
    controller.translation = motion.translation_along(*transform.right());
}
