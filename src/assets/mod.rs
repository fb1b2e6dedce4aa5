use crate::config::{GameConfig, ModelAssetConfig, ModelRigConfig};
use bevy::asset::LoadState;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const ASSET_ROOT_DIR: &str = "assets";

pub struct AssetRegistryPlugin;

impl Plugin for AssetRegistryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReportedLoadFailures>().add_systems(
            Update,
            (sync_asset_registry, report_failed_model_loads)
                .chain()
                .run_if(resource_exists::<GameConfig>),
        );
    }
}

fn sync_asset_registry(
    mut commands: Commands,
    config: Res<GameConfig>,
    asset_server: Res<AssetServer>,
    registry: Option<ResMut<AssetRegistry>>,
) {
    if !config.is_changed() {
        return;
    }
    // Tuning edits also mark the config changed; only model rows matter here.
    if registry
        .as_ref()
        .is_some_and(|registry| registry.describes(&config.assets.models))
    {
        return;
    }

    let new_registry =
        AssetRegistry::from_config(&config, &asset_server, Path::new(ASSET_ROOT_DIR));

    match registry {
        Some(mut existing_registry) => {
            *existing_registry = new_registry;
            log_asset_registry_summary("Updated", &existing_registry);
        }
        None => {
            log_asset_registry_summary("Initialized", &new_registry);
            commands.insert_resource(new_registry);
        }
    }
}

fn log_asset_registry_summary(prefix: &str, registry: &AssetRegistry) {
    info!(
        "{prefix} asset registry: models {}/{} available.",
        registry.available_model_count(),
        registry.models.len(),
    );

    for (id, entry) in &registry.models {
        if !entry.available {
            warn!(
                "Model `{id}` is missing under `{ASSET_ROOT_DIR}` (`{}`); it will not be spawned.",
                entry.scene_path
            );
        } else if is_remote(&entry.scene_path) {
            info!("Model `{id}` streams from `{}`.", entry.scene_path);
        }
    }
}

#[derive(Resource, Debug, Default)]
struct ReportedLoadFailures {
    model_ids: HashSet<String>,
}

fn report_failed_model_loads(
    asset_server: Res<AssetServer>,
    registry: Option<Res<AssetRegistry>>,
    mut reported: ResMut<ReportedLoadFailures>,
) {
    let Some(registry) = registry else {
        return;
    };

    for (id, entry) in &registry.models {
        let Some(handle) = entry.handle.as_ref() else {
            continue;
        };
        if reported.model_ids.contains(id) {
            continue;
        }
        if let LoadState::Failed(error) = asset_server.load_state(handle.id()) {
            error!(
                "Model `{id}` failed to load from `{}`: {error}",
                entry.scene_path
            );
            reported.model_ids.insert(id.clone());
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct AssetRegistry {
    pub models: HashMap<String, ModelAssetEntry>,
}

impl AssetRegistry {
    pub fn from_config(config: &GameConfig, asset_server: &AssetServer, asset_root: &Path) -> Self {
        let models = config
            .assets
            .models
            .iter()
            .map(|entry| {
                let model = ModelAssetEntry::from_config(entry, asset_server, asset_root);
                (entry.id.clone(), model)
            })
            .collect();

        Self { models }
    }

    fn describes(&self, models: &[ModelAssetConfig]) -> bool {
        self.models.len() == models.len()
            && models.iter().all(|model| {
                self.models.get(&model.id).is_some_and(|entry| {
                    entry.scene_path == model.scene_path && entry.rig == model.rig
                })
            })
    }

    fn available_model_count(&self) -> usize {
        self.models
            .values()
            .filter(|entry| entry.available)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct ModelAssetEntry {
    pub scene_path: String,
    /// Remote paths count as available; their failures surface as load errors.
    pub available: bool,
    pub handle: Option<Handle<Scene>>,
    pub rig: Option<ModelRigConfig>,
}

impl ModelAssetEntry {
    fn from_config(
        config: &ModelAssetConfig,
        asset_server: &AssetServer,
        asset_root: &Path,
    ) -> Self {
        let available = model_available(asset_root, &config.scene_path);
        let handle = available.then(|| asset_server.load(config.scene_path.clone()));

        Self {
            scene_path: config.scene_path.clone(),
            available,
            handle,
            rig: config.rig.clone(),
        }
    }
}

fn is_remote(path: &str) -> bool {
    path.starts_with("https://") || path.starts_with("http://")
}

fn model_available(asset_root: &Path, path: &str) -> bool {
    is_remote(path) || asset_exists(asset_root, path)
}

fn asset_exists(asset_root: &Path, path: &str) -> bool {
    let file_path = path.split('#').next().unwrap_or(path);
    asset_root.join(file_path).exists()
}
