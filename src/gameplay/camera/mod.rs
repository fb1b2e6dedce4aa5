use crate::config::{GameConfig, VehicleConfig};
use crate::gameplay::vehicle::{PlayerVehicle, VehicleLink, VehicleUpdateSet};
use bevy::prelude::*;

const CAMERA_START: Vec3 = Vec3::new(5.0, 0.0, 0.0);

pub struct ChaseCameraPlugin;

impl Plugin for ChaseCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_chase_camera).add_systems(
            Update,
            (
                sync_chase_camera_config.run_if(resource_exists::<GameConfig>),
                bind_camera_lock_target,
                follow_lock_target,
            )
                .chain()
                .after(VehicleUpdateSet),
        );
    }
}

/// Follow parameters of a camera trailing a target.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ChaseCamera {
    pub radius: f32,
    pub height_offset: f32,
    pub rotation_offset_degrees: f32,
    /// Fraction of the remaining offset closed per frame.
    pub acceleration: f32,
    pub max_speed: f32,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        Self {
            radius: 10.0,
            height_offset: 8.0,
            rotation_offset_degrees: 0.0,
            acceleration: 0.0075,
            max_speed: 10.0,
        }
    }
}

impl ChaseCamera {
    fn from_config(vehicle: &VehicleConfig) -> Self {
        Self {
            radius: vehicle.camera_radius,
            height_offset: vehicle.camera_height_offset,
            rotation_offset_degrees: vehicle.camera_rotation_offset_degrees,
            acceleration: vehicle.camera_acceleration,
            max_speed: vehicle.camera_max_speed,
        }
    }
}

/// Entity the camera trails; assigned once and never replaced.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTarget(pub Entity);

fn spawn_chase_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("ChaseCamera"),
        Camera3d::default(),
        ChaseCamera::default(),
        Transform::from_translation(CAMERA_START).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn sync_chase_camera_config(config: Res<GameConfig>, mut cameras: Query<&mut ChaseCamera>) {
    if !config.is_changed() {
        return;
    }

    let Some(vehicle) = config.active_vehicle() else {
        return;
    };
    for mut camera in &mut cameras {
        *camera = ChaseCamera::from_config(vehicle);
    }
}

fn bind_camera_lock_target(
    mut commands: Commands,
    link: Res<VehicleLink>,
    unbound_cameras: Query<Entity, (With<ChaseCamera>, Without<LockTarget>)>,
) {
    let Some(rig) = link.rig() else {
        return;
    };

    for camera in &unbound_cameras {
        commands.entity(camera).insert(LockTarget(rig.body));
        info!("Chase camera locked onto vehicle body {:?}.", rig.body);
    }
}

fn follow_lock_target(
    mut cameras: Query<(&mut Transform, &ChaseCamera, &LockTarget), Without<PlayerVehicle>>,
    targets: Query<&Transform, With<PlayerVehicle>>,
) {
    for (mut camera_transform, camera, lock_target) in &mut cameras {
        let Ok(target) = targets.get(lock_target.0) else {
            continue;
        };

        let target_yaw = target.rotation.to_euler(EulerRot::YXZ).0;
        camera_transform.translation = follow_step(
            camera_transform.translation,
            target.translation,
            target_yaw,
            camera,
        );
        camera_transform.look_at(target.translation, Vec3::Y);
    }
}

/// Moves the camera one frame toward its goal behind the target.
pub fn follow_step(camera: Vec3, target: Vec3, target_yaw: f32, params: &ChaseCamera) -> Vec3 {
    let yaw = params.rotation_offset_degrees.to_radians() + target_yaw;
    let goal = target
        + Vec3::new(
            yaw.sin() * params.radius,
            params.height_offset,
            yaw.cos() * params.radius,
        );

    let delta = goal - camera;
    let velocity = Vec3::new(
        delta.x * params.acceleration * 2.0,
        delta.y * params.acceleration,
        delta.z * params.acceleration * 2.0,
    )
    .clamp(Vec3::splat(-params.max_speed), Vec3::splat(params.max_speed));

    camera + velocity
}
