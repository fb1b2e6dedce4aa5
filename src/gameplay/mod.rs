pub mod camera;
pub mod environment;
pub mod vehicle;

use bevy::prelude::*;
use camera::ChaseCameraPlugin;
use environment::EnvironmentPlugin;
use vehicle::VehicleGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EnvironmentPlugin)
            .add_plugins(VehicleGameplayPlugin)
            .add_plugins(ChaseCameraPlugin);
    }
}
