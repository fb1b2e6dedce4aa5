use super::*;

const CONTROLLER_SKIN_WIDTH: f32 = 0.02;

pub(super) fn spawn_vehicle_scene(
    mut commands: Commands,
    config: Res<GameConfig>,
    registry: Res<AssetRegistry>,
    existing_player: Query<Entity, With<PlayerVehicle>>,
) {
    if !existing_player.is_empty() {
        return;
    }

    let Some(vehicle) = config.active_vehicle() else {
        return;
    };
    let [hx, hy, hz] = vehicle.collider_half_extents;

    let body = commands
        .spawn((
            Name::new("PlayerVehicle"),
            PlayerVehicle,
            Transform::from_translation(Vec3::from_array(config.game.scene.vehicle_spawn)),
            Visibility::default(),
            RigidBody::KinematicPositionBased,
            Collider::cuboid(hx, hy, hz),
            KinematicCharacterController {
                up: Vec3::Y,
                offset: CharacterLength::Absolute(CONTROLLER_SKIN_WIDTH),
                slide: true,
                ..default()
            },
        ))
        .id();

    let Some(model) = registry.models.get(&vehicle.model) else {
        warn!(
            "Vehicle `{}` model `{}` is not in the asset registry.",
            vehicle.id, vehicle.model
        );
        return;
    };
    let (Some(handle), Some(rig)) = (model.handle.clone(), model.rig.clone()) else {
        warn!(
            "Vehicle `{}` spawned without its model `{}`; controls stay inactive.",
            vehicle.id, vehicle.model
        );
        return;
    };

    commands.entity(body).with_children(|parent| {
        parent.spawn((
            Name::new("PlayerVehicleModel"),
            SceneRoot(handle),
            VehicleModelScene {
                model_id: vehicle.model.clone(),
                rig,
            },
            Transform::default(),
        ));
    });

    info!(
        "Spawned vehicle `{}` with model `{}` at {:?}.",
        vehicle.id, vehicle.model, config.game.scene.vehicle_spawn
    );
}
