use super::*;

#[derive(Component, Debug, Clone, Copy)]
pub struct WheelNode {
    /// Neutral orientation, forced back whenever the vehicle stands still.
    pub rest_rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelPose {
    Spin(f32),
    Neutral,
}

/// Spin is uniform while moving; speed magnitude never scales it.
pub fn wheel_pose(speed: f32, spin_rate: f32) -> WheelPose {
    if speed != 0.0 {
        WheelPose::Spin(spin_rate)
    } else {
        WheelPose::Neutral
    }
}

pub(super) fn animate_wheels(
    link: Res<VehicleLink>,
    motion: Res<VehicleMotion>,
    tuning: Res<VehicleTuning>,
    mut wheel_query: Query<(&WheelNode, &mut Transform)>,
) {
    let Some(rig) = link.rig() else {
        return;
    };

    let pose = wheel_pose(motion.speed, tuning.wheel_spin_rate);
    for (_, entity) in rig.wheels.iter() {
        let Ok((wheel, mut transform)) = wheel_query.get_mut(entity) else {
            continue;
        };
        match pose {
            WheelPose::Spin(angle) => transform.rotate_local_y(angle),
            WheelPose::Neutral => transform.rotation = wheel.rest_rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_depends_only_on_whether_speed_is_zero() {
        assert_eq!(wheel_pose(0.0, 0.1), WheelPose::Neutral);
        assert_eq!(wheel_pose(0.005, 0.1), WheelPose::Spin(0.1));
        assert_eq!(wheel_pose(0.5, 0.1), WheelPose::Spin(0.1));
        assert_eq!(wheel_pose(-0.2, 0.3), WheelPose::Spin(0.3));
    }
}
