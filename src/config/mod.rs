use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = "config";
pub const MIN_ACCELERATION: f32 = 0.000_1;

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} vehicles, {} models, driving `{}` through `{}`.",
        config.vehicles_by_id.len(),
        config.model_assets_by_id.len(),
        config.game.app.default_vehicle,
        config.game.app.environment_model
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub assets: AssetsFile,
    pub vehicles: VehiclesFile,
    pub vehicles_by_id: HashMap<String, VehicleConfig>,
    pub model_assets_by_id: HashMap<String, ModelAssetConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let assets: AssetsFile = read_toml(&config_dir.join("assets.toml"))?;
        let vehicles: VehiclesFile = read_toml(&config_dir.join("vehicles.toml"))?;

        let config = Self {
            model_assets_by_id: to_index("assets.toml::models", &assets.models)?,
            vehicles_by_id: to_index("vehicles.toml::vehicles", &vehicles.vehicles)?,
            game,
            assets,
            vehicles,
        };

        config.validate_references()?;
        Ok(config)
    }

    /// Row of the vehicle the player drives.
    pub fn active_vehicle(&self) -> Option<&VehicleConfig> {
        self.vehicles_by_id.get(&self.game.app.default_vehicle)
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        let Some(default_vehicle) = self.active_vehicle() else {
            return Err(ConfigError::Validation(format!(
                "game.toml::app.default_vehicle references unknown vehicle id `{}`",
                self.game.app.default_vehicle
            )));
        };

        match self.model_assets_by_id.get(&default_vehicle.model) {
            Some(model) if model.rig.is_none() => {
                return Err(ConfigError::Validation(format!(
                    "assets.toml::models `{}` is driven by `{}` but declares no [models.rig] section",
                    model.id, default_vehicle.id
                )));
            }
            Some(_) => {}
            None => {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml vehicle `{}` references unknown model id `{}`",
                    default_vehicle.id, default_vehicle.model
                )));
            }
        }

        if !self
            .model_assets_by_id
            .contains_key(&self.game.app.environment_model)
        {
            return Err(ConfigError::Validation(format!(
                "game.toml::app.environment_model references unknown model id `{}`",
                self.game.app.environment_model
            )));
        }

        if self.game.scene.environment_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::scene.environment_scale must be > 0".to_string(),
            ));
        }
        if self.game.scene.ambient_brightness < 0.0 || self.game.scene.sun_illuminance < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::scene light intensities must be >= 0".to_string(),
            ));
        }
        if Vec3::from_array(self.game.scene.sun_direction).length_squared() <= f32::EPSILON {
            return Err(ConfigError::Validation(
                "game.toml::scene.sun_direction must be a non-zero vector".to_string(),
            ));
        }

        for (index, vehicle) in self.vehicles.vehicles.iter().enumerate() {
            if !self.model_assets_by_id.contains_key(&vehicle.model) {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].model references unknown model id `{}`",
                    vehicle.model
                )));
            }
            if vehicle.acceleration < MIN_ACCELERATION {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].acceleration must be >= {MIN_ACCELERATION}"
                )));
            }
            if vehicle.max_speed <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].max_speed must be > 0"
                )));
            }
            if vehicle.acceleration > vehicle.max_speed {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].acceleration must not exceed max_speed"
                )));
            }
            if vehicle.turn_rate <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].turn_rate must be > 0"
                )));
            }
            if vehicle.wheel_spin_rate <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].wheel_spin_rate must be > 0"
                )));
            }
            if vehicle.collider_half_extents.iter().any(|extent| *extent <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].collider_half_extents must all be > 0"
                )));
            }
            if vehicle.camera_radius <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].camera_radius must be > 0"
                )));
            }
            if !(0.0 < vehicle.camera_acceleration && vehicle.camera_acceleration <= 0.5) {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].camera_acceleration must be in (0, 0.5]"
                )));
            }
            if vehicle.camera_max_speed <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "vehicles.toml::vehicles[{index}].camera_max_speed must be > 0"
                )));
            }
        }

        for (index, model) in self.assets.models.iter().enumerate() {
            if model.scene_path.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "assets.toml::models[{index}].scene_path cannot be empty"
                )));
            }

            let Some(rig) = &model.rig else {
                continue;
            };
            if rig.chassis_node.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "assets.toml::models[{index}].rig.chassis_node cannot be empty"
                )));
            }

            let mut seen = HashSet::new();
            for (field, node) in rig.wheels.named_fields() {
                if node.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "assets.toml::models[{index}].rig.wheels.{field} cannot be empty"
                    )));
                }
                if !seen.insert(node) {
                    return Err(ConfigError::Validation(format!(
                        "assets.toml::models[{index}].rig.wheels.{field} reuses node `{node}`"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub default_vehicle: String,
    pub environment_model: String,
    pub debug_overlay: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    pub clear_color: [f32; 3],
    pub ambient_brightness: f32,
    pub sun_direction: [f32; 3],
    pub sun_illuminance: f32,
    pub environment_scale: f32,
    #[serde(default)]
    pub vehicle_spawn: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesFile {
    pub vehicles: Vec<VehicleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    pub id: String,
    pub model: String,
    pub acceleration: f32,
    pub max_speed: f32,
    pub turn_rate: f32,
    pub wheel_spin_rate: f32,
    pub collider_half_extents: [f32; 3],
    #[serde(default = "default_camera_radius")]
    pub camera_radius: f32,
    #[serde(default = "default_camera_height_offset")]
    pub camera_height_offset: f32,
    #[serde(default)]
    pub camera_rotation_offset_degrees: f32,
    #[serde(default = "default_camera_acceleration")]
    pub camera_acceleration: f32,
    #[serde(default = "default_camera_max_speed")]
    pub camera_max_speed: f32,
}

fn default_camera_radius() -> f32 {
    10.0
}

fn default_camera_height_offset() -> f32 {
    8.0
}

fn default_camera_acceleration() -> f32 {
    0.0075
}

fn default_camera_max_speed() -> f32 {
    10.0
}

impl HasId for VehicleConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssetsFile {
    #[serde(default)]
    pub models: Vec<ModelAssetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelAssetConfig {
    pub id: String,
    pub scene_path: String,
    pub rig: Option<ModelRigConfig>,
}

impl HasId for ModelAssetConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelRigConfig {
    pub chassis_node: String,
    pub wheels: WheelNodeNames,
}

/// Scene node names of the eight wheel parts, two per corner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WheelNodeNames {
    pub front_left_outer: String,
    pub front_left_inner: String,
    pub front_right_outer: String,
    pub front_right_inner: String,
    pub rear_left_outer: String,
    pub rear_left_inner: String,
    pub rear_right_outer: String,
    pub rear_right_inner: String,
}

impl WheelNodeNames {
    pub fn named_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("front_left_outer", &self.front_left_outer),
            ("front_left_inner", &self.front_left_inner),
            ("front_right_outer", &self.front_right_outer),
            ("front_right_inner", &self.front_right_inner),
            ("rear_left_outer", &self.rear_left_outer),
            ("rear_left_inner", &self.rear_left_inner),
            ("rear_right_outer", &self.rear_right_outer),
            ("rear_right_inner", &self.rear_right_inner),
        ]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_wheel_nodes() -> WheelNodeNames {
        WheelNodeNames {
            front_left_outer: "TireL1".to_string(),
            front_left_inner: "TireL2".to_string(),
            front_right_outer: "TireR1".to_string(),
            front_right_inner: "TireR2".to_string(),
            rear_left_outer: "TireL3".to_string(),
            rear_left_inner: "TireL4".to_string(),
            rear_right_outer: "TireR3".to_string(),
            rear_right_inner: "TireR4".to_string(),
        }
    }

    fn sample_vehicle() -> VehicleConfig {
        VehicleConfig {
            id: "city_car".to_string(),
            model: "car".to_string(),
            acceleration: 0.005,
            max_speed: 0.5,
            turn_rate: 0.05,
            wheel_spin_rate: 0.1,
            collider_half_extents: [2.0, 0.6, 0.9],
            camera_radius: 10.0,
            camera_height_offset: 8.0,
            camera_rotation_offset_degrees: 0.0,
            camera_acceleration: 0.0075,
            camera_max_speed: 10.0,
        }
    }

    pub(crate) fn sample_config() -> GameConfig {
        let models = vec![
            ModelAssetConfig {
                id: "car".to_string(),
                scene_path: "models/Car.glb#Scene0".to_string(),
                rig: Some(ModelRigConfig {
                    chassis_node: "Car".to_string(),
                    wheels: sample_wheel_nodes(),
                }),
            },
            ModelAssetConfig {
                id: "city".to_string(),
                scene_path: "models/city.glb#Scene0".to_string(),
                rig: None,
            },
        ];
        let vehicles = vec![sample_vehicle()];

        GameConfig {
            game: GameFile {
                app: AppConfig {
                    default_vehicle: "city_car".to_string(),
                    environment_model: "city".to_string(),
                    debug_overlay: true,
                },
                scene: SceneConfig {
                    clear_color: [0.1, 0.1, 0.1],
                    ambient_brightness: 400.0,
                    sun_direction: [0.0, 100.0, 100.0],
                    sun_illuminance: 8_000.0,
                    environment_scale: 5.0,
                    vehicle_spawn: [0.0, 1.0, 0.0],
                },
            },
            model_assets_by_id: models
                .iter()
                .map(|model| (model.id.clone(), model.clone()))
                .collect(),
            vehicles_by_id: vehicles
                .iter()
                .map(|vehicle| (vehicle.id.clone(), vehicle.clone()))
                .collect(),
            assets: AssetsFile { models },
            vehicles: VehiclesFile { vehicles },
        }
    }

    #[test]
    fn sample_config_passes_validation() {
        sample_config()
            .validate_references()
            .expect("sample config should validate");
    }

    #[test]
    fn validation_fails_for_missing_environment_reference() {
        let mut config = sample_config();
        config.game.app.environment_model = "missing_city".to_string();

        let error = config
            .validate_references()
            .expect_err("validation should fail");
        let message = error.to_string();

        assert!(message.contains("environment_model"));
        assert!(message.contains("missing_city"));
    }

    #[test]
    fn validation_requires_rig_on_driven_model() {
        let mut config = sample_config();
        config.game.app.environment_model = "car".to_string();
        config.vehicles_by_id.get_mut("city_car").unwrap().model = "city".to_string();
        config.vehicles.vehicles[0].model = "city".to_string();

        let message = config.validate_references().unwrap_err().to_string();

        assert!(message.contains("declares no [models.rig]"));
    }

    #[test]
    fn validation_rejects_non_positive_tuning() {
        let mut config = sample_config();
        config.vehicles.vehicles[0].turn_rate = 0.0;

        let message = config.validate_references().unwrap_err().to_string();

        assert!(message.contains("vehicles[0].turn_rate"));
    }

    #[test]
    fn validation_rejects_reused_wheel_node() {
        let mut config = sample_config();
        if let Some(rig) = config.assets.models[0].rig.as_mut() {
            rig.wheels.rear_right_inner = "TireL1".to_string();
        }

        let message = config.validate_references().unwrap_err().to_string();

        assert!(message.contains("rear_right_inner"));
        assert!(message.contains("TireL1"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let rows = vec![sample_vehicle(), sample_vehicle()];

        let error = to_index("vehicles.toml::vehicles", &rows).unwrap_err();

        assert!(error.to_string().contains("duplicate id `city_car`"));
    }

    #[test]
    fn shipped_config_directory_loads() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_DIR);

        let config = GameConfig::load_from_dir(&config_dir).expect("shipped config should load");
        let vehicle = config.active_vehicle().expect("default vehicle row");

        assert_eq!(vehicle.acceleration, 0.005);
        assert_eq!(vehicle.max_speed, 0.5);
        assert_eq!(vehicle.turn_rate, 0.05);
        assert_eq!(vehicle.wheel_spin_rate, 0.1);
    }

    #[test]
    fn missing_file_reports_io_error_with_path() {
        let error = GameConfig::load_from_dir(Path::new("does/not/exist")).unwrap_err();

        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("game.toml"));
        assert!(error.source().is_some());
    }
}
