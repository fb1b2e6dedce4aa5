use crate::assets::AssetRegistry;
use crate::config::{GameConfig, SceneConfig};
use bevy::prelude::*;
use bevy::window::WindowResized;
use bevy_rapier3d::prelude::*;

pub struct EnvironmentPlugin;

impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                apply_scene_lighting,
                spawn_city_environment.run_if(resource_exists::<AssetRegistry>),
            )
                .run_if(resource_exists::<GameConfig>),
        )
        .add_systems(Update, log_viewport_resize);
    }
}

#[derive(Component)]
struct SceneSun;

#[derive(Component)]
pub struct CityEnvironment;

fn apply_scene_lighting(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut sun_query: Query<(&mut DirectionalLight, &mut Transform), With<SceneSun>>,
) {
    if !config.is_changed() {
        return;
    }

    let scene = &config.game.scene;
    commands.insert_resource(ClearColor(clear_color(scene)));
    commands.insert_resource(ambient_light(scene));

    let sun_transform = light_transform(scene.sun_direction);
    match sun_query.single_mut() {
        Ok((mut light, mut transform)) => {
            light.illuminance = scene.sun_illuminance;
            *transform = sun_transform;
        }
        Err(_) => {
            commands.spawn((
                Name::new("SceneSun"),
                SceneSun,
                DirectionalLight {
                    illuminance: scene.sun_illuminance,
                    shadows_enabled: true,
                    ..default()
                },
                sun_transform,
            ));
        }
    }
}

/// Sky fill; stands in for a hemispheric light.
fn ambient_light(scene: &SceneConfig) -> AmbientLight {
    AmbientLight {
        color: Color::WHITE,
        brightness: scene.ambient_brightness,
        affects_lightmapped_meshes: true,
    }
}

fn clear_color(scene: &SceneConfig) -> Color {
    let [r, g, b] = scene.clear_color;
    Color::srgb(r, g, b)
}

/// Places a directional light at `position` shining toward the origin.
fn light_transform(position: [f32; 3]) -> Transform {
    let position = Vec3::from_array(position);
    let up = if position.normalize_or_zero().y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Transform::from_translation(position).looking_at(Vec3::ZERO, up)
}

fn spawn_city_environment(
    mut commands: Commands,
    config: Res<GameConfig>,
    registry: Res<AssetRegistry>,
    existing: Query<Entity, With<CityEnvironment>>,
) {
    if !existing.is_empty() {
        return;
    }

    let model_id = &config.game.app.environment_model;
    let Some(handle) = registry
        .models
        .get(model_id)
        .and_then(|model| model.handle.clone())
    else {
        warn!("Environment model `{model_id}` is unavailable; driving over empty space.");
        commands.spawn((Name::new("CityEnvironment"), CityEnvironment));
        return;
    };

    commands.spawn((
        Name::new("CityEnvironment"),
        CityEnvironment,
        SceneRoot(handle),
        Transform::from_scale(Vec3::splat(config.game.scene.environment_scale)),
        RigidBody::Fixed,
        AsyncSceneCollider {
            shape: Some(ComputedColliderShape::TriMesh(TriMeshFlags::default())),
            ..default()
        },
    ));
    info!(
        "Spawned environment `{model_id}` at scale {}.",
        config.game.scene.environment_scale
    );
}

fn log_viewport_resize(mut resize_events: MessageReader<WindowResized>) {
    for event in resize_events.read() {
        debug!("Viewport resized to {}x{}.", event.width, event.height);
    }
}
