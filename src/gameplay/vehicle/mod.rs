use crate::assets::AssetRegistry;
use crate::config::GameConfig;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

mod input;
mod motion;
mod rig;
mod scene;
mod wheels;

pub use input::{ControlAction, ControlInputState, VehicleInputBindings};
pub use motion::{VehicleMotion, VehicleTuning};
pub use rig::{
    RigBindingError, RigBindingStatus, VehicleLink, VehicleModelScene, VehicleRig, WheelRole,
    WheelSet,
};
pub use wheels::WheelNode;

use input::track_control_input;
use motion::apply_vehicle_motion;
use rig::bind_vehicle_rig;
use scene::spawn_vehicle_scene;
use wheels::animate_wheels;

// Below this the controller counts a move as unobstructed.
const BLOCKED_TRANSLATION_EPSILON: f32 = 1e-4;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControlInputState>()
            .init_resource::<VehicleInputBindings>()
            .init_resource::<VehicleTuning>()
            .init_resource::<VehicleMotion>()
            .init_resource::<VehicleLink>()
            .init_resource::<RigBindingStatus>()
            .init_resource::<VehicleTelemetry>()
            .add_systems(
                Update,
                (
                    sync_vehicle_tuning.run_if(resource_exists::<GameConfig>),
                    spawn_vehicle_scene
                        .run_if(resource_exists::<GameConfig>)
                        .run_if(resource_exists::<AssetRegistry>),
                )
                    .before(VehicleUpdateSet),
            )
            .add_systems(
                Update,
                (
                    track_control_input,
                    bind_vehicle_rig,
                    apply_vehicle_motion,
                    animate_wheels,
                    update_vehicle_telemetry,
                )
                    .chain()
                    .in_set(VehicleUpdateSet),
            );
    }
}

/// Per-frame vehicle update; camera follow is ordered after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct VehicleUpdateSet;

#[derive(Component)]
pub struct PlayerVehicle;

#[derive(Resource, Debug, Clone, Default)]
pub struct VehicleTelemetry {
    pub speed: f32,
    pub distance: f32,
    pub desired_translation: Vec3,
    pub effective_translation: Vec3,
    pub blocked: bool,
}

fn sync_vehicle_tuning(config: Res<GameConfig>, mut tuning: ResMut<VehicleTuning>) {
    if !config.is_changed() {
        return;
    }

    let Some(vehicle) = config.active_vehicle() else {
        return;
    };
    *tuning = VehicleTuning::from_config(vehicle);
    debug!(
        "Vehicle tuning for `{}`: accel {} max {} turn {} wheel spin {}.",
        vehicle.id,
        tuning.acceleration,
        tuning.max_speed,
        tuning.turn_rate,
        tuning.wheel_spin_rate
    );
}

fn update_vehicle_telemetry(
    motion: Res<VehicleMotion>,
    mut telemetry: ResMut<VehicleTelemetry>,
    output_query: Query<Option<Ref<KinematicCharacterControllerOutput>>, With<PlayerVehicle>>,
) {
    telemetry.speed = motion.speed;

    let Ok(Some(output)) = output_query.single() else {
        return;
    };
    if !output.is_changed() {
        return;
    }

    telemetry.desired_translation = output.desired_translation;
    telemetry.effective_translation = output.effective_translation;
    telemetry.distance += output.effective_translation.length();
    telemetry.blocked = output.desired_translation.length() - output.effective_translation.length()
        > BLOCKED_TRANSLATION_EPSILON;
}
