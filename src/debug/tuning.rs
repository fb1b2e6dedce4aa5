use crate::config::{ConfigError, GameConfig, VehicleConfig, CONFIG_DIR, MIN_ACCELERATION};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

const VEHICLES_FILE: &str = "vehicles.toml";

/// One editable `vehicles.toml` float and its accessor on a vehicle row.
struct TuningField {
    key: &'static str,
    group: TuningGroup,
    range: RangeInclusive<f32>,
    drag_speed: f64,
    value: fn(&mut VehicleConfig) -> &mut f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TuningGroup {
    Driving,
    Camera,
}

impl TuningGroup {
    fn title(self) -> &'static str {
        match self {
            Self::Driving => "Driving (per frame)",
            Self::Camera => "Chase Camera",
        }
    }
}

const TUNING_FIELDS: [TuningField; 9] = [
    TuningField {
        key: "acceleration",
        group: TuningGroup::Driving,
        range: MIN_ACCELERATION..=0.1,
        drag_speed: 0.0005,
        value: |vehicle| &mut vehicle.acceleration,
    },
    TuningField {
        key: "max_speed",
        group: TuningGroup::Driving,
        range: 0.01..=5.0,
        drag_speed: 0.005,
        value: |vehicle| &mut vehicle.max_speed,
    },
    TuningField {
        key: "turn_rate",
        group: TuningGroup::Driving,
        range: 0.001..=0.5,
        drag_speed: 0.001,
        value: |vehicle| &mut vehicle.turn_rate,
    },
    TuningField {
        key: "wheel_spin_rate",
        group: TuningGroup::Driving,
        range: 0.001..=1.0,
        drag_speed: 0.005,
        value: |vehicle| &mut vehicle.wheel_spin_rate,
    },
    TuningField {
        key: "camera_radius",
        group: TuningGroup::Camera,
        range: 1.0..=50.0,
        drag_speed: 0.1,
        value: |vehicle| &mut vehicle.camera_radius,
    },
    TuningField {
        key: "camera_height_offset",
        group: TuningGroup::Camera,
        range: -10.0..=40.0,
        drag_speed: 0.1,
        value: |vehicle| &mut vehicle.camera_height_offset,
    },
    TuningField {
        key: "camera_rotation_offset_degrees",
        group: TuningGroup::Camera,
        range: -180.0..=180.0,
        drag_speed: 0.5,
        value: |vehicle| &mut vehicle.camera_rotation_offset_degrees,
    },
    TuningField {
        key: "camera_acceleration",
        group: TuningGroup::Camera,
        range: 0.001..=0.5,
        drag_speed: 0.0005,
        value: |vehicle| &mut vehicle.camera_acceleration,
    },
    TuningField {
        key: "camera_max_speed",
        group: TuningGroup::Camera,
        range: 0.1..=50.0,
        drag_speed: 0.1,
        value: |vehicle| &mut vehicle.camera_max_speed,
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
enum PanelStatus {
    #[default]
    Idle,
    Live,
    Rejected(String),
    Saved(PathBuf),
    Failed(String),
}

impl PanelStatus {
    fn message(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Live => Some("Live-tuning active (in-memory config updated).".to_string()),
            Self::Rejected(reason) => Some(format!("Not applied: {reason}")),
            Self::Saved(path) => Some(format!("Saved to {}.", path.display())),
            Self::Failed(reason) => Some(reason.clone()),
        }
    }
}

#[derive(Resource, Debug, Default)]
pub(super) struct TuningPanel {
    pub(super) open: bool,
    draft: Option<VehicleConfig>,
    status: PanelStatus,
}

impl TuningPanel {
    pub(super) fn toggle(&mut self) {
        self.open = !self.open;
        self.draft = None;
        self.status = PanelStatus::Idle;
    }
}

#[derive(Debug)]
pub enum TuningPersistError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Document {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Serialize(toml::ser::Error),
    MissingRow(String),
    NonFinite(&'static str),
    Rejected(ConfigError),
}

impl Display for TuningPersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access `{}`: {source}", path.display())
            }
            Self::Document { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Serialize(source) => write!(f, "failed to serialize vehicles: {source}"),
            Self::MissingRow(id) => write!(f, "no vehicle row with id `{id}`"),
            Self::NonFinite(key) => write!(f, "`{key}` is not a finite number"),
            Self::Rejected(source) => {
                write!(f, "edited config was rejected ({source}); file reverted")
            }
        }
    }
}

impl Error for TuningPersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Document { source, .. } => Some(source),
            Self::Serialize(source) => Some(source),
            Self::Rejected(source) => Some(source),
            Self::MissingRow(_) | Self::NonFinite(_) => None,
        }
    }
}

pub(super) fn vehicle_tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel: ResMut<TuningPanel>,
    mut config: ResMut<GameConfig>,
) {
    if !panel.open {
        return;
    }

    let Some(active) = config.active_vehicle().cloned() else {
        panel.status = PanelStatus::Failed(format!(
            "Default vehicle `{}` not found in config.",
            config.game.app.default_vehicle
        ));
        return;
    };
    if panel.draft.as_ref().map(|draft| &draft.id) != Some(&active.id) {
        panel.draft = Some(active);
    }
    let Some(mut draft) = panel.draft.clone() else {
        return;
    };

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };

    let mut open = panel.open;
    let mut changed = false;
    let mut reload = false;
    let mut save = false;
    let status = panel.status.message();

    egui::Window::new("Vehicle Tuning")
        .open(&mut open)
        .resizable(true)
        .default_width(520.0)
        .show(ctx, |ui| {
            ui.label(format!("Active vehicle: {}", draft.id));
            ui.separator();

            for group in [TuningGroup::Driving, TuningGroup::Camera] {
                ui.collapsing(group.title(), |ui| {
                    for field in TUNING_FIELDS.iter().filter(|field| field.group == group) {
                        changed |= tuning_row(ui, field, (field.value)(&mut draft));
                    }
                });
            }

            ui.separator();
            ui.horizontal(|ui| {
                reload = ui.button("Reload From Config").clicked();
                save = ui.button("Apply To vehicles.toml").clicked();
            });

            if let Some(status) = status {
                ui.separator();
                ui.label(status);
            }
        });

    panel.open = open;

    if reload {
        panel.draft = None;
        panel.status = PanelStatus::Idle;
        return;
    }

    if changed {
        panel.status = match check_live_range(&draft) {
            Ok(()) => {
                apply_live(&mut config, &draft);
                PanelStatus::Live
            }
            Err(reason) => PanelStatus::Rejected(reason),
        };
    }
    panel.draft = Some(draft.clone());

    if save {
        let config_dir = Path::new(CONFIG_DIR);
        panel.status = match persist_vehicle_row(config_dir, &draft) {
            Ok(reloaded) => {
                *config = reloaded;
                panel.draft = None;
                info!("Vehicle tuning for `{}` saved.", draft.id);
                PanelStatus::Saved(config_dir.join(VEHICLES_FILE))
            }
            Err(error) => {
                warn!("Vehicle tuning save failed: {error}");
                PanelStatus::Failed(error.to_string())
            }
        };
    }
}

fn tuning_row(ui: &mut egui::Ui, field: &TuningField, value: &mut f32) -> bool {
    ui.horizontal(|ui| {
        ui.label(field.key);
        let slider = ui
            .add(egui::Slider::new(value, field.range.clone()).show_value(false))
            .changed();
        let drag = ui
            .add(egui::DragValue::new(value).speed(field.drag_speed))
            .changed();
        slider || drag
    })
    .inner
}

/// Live edits skip values the config loader would reject.
fn check_live_range(vehicle: &VehicleConfig) -> Result<(), String> {
    if vehicle.acceleration < MIN_ACCELERATION {
        return Err(format!("acceleration must be >= {MIN_ACCELERATION}"));
    }
    if vehicle.acceleration > vehicle.max_speed {
        return Err("acceleration must not exceed max_speed".to_string());
    }
    if vehicle.turn_rate <= 0.0 || vehicle.wheel_spin_rate <= 0.0 {
        return Err("turn_rate and wheel_spin_rate must be > 0".to_string());
    }
    if vehicle.camera_radius <= 0.0 || vehicle.camera_max_speed <= 0.0 {
        return Err("camera_radius and camera_max_speed must be > 0".to_string());
    }
    if !(0.0 < vehicle.camera_acceleration && vehicle.camera_acceleration <= 0.5) {
        return Err("camera_acceleration must be in (0, 0.5]".to_string());
    }
    Ok(())
}

fn apply_live(config: &mut GameConfig, draft: &VehicleConfig) {
    if let Some(row) = config.vehicles_by_id.get_mut(&draft.id) {
        *row = draft.clone();
    }
    if let Some(row) = config
        .vehicles
        .vehicles
        .iter_mut()
        .find(|row| row.id == draft.id)
    {
        *row = draft.clone();
    }
}

/// Writes the draft's tunable fields into `vehicles.toml` and reloads the whole config,
/// restoring the previous file when the result does not validate.
fn persist_vehicle_row(
    config_dir: &Path,
    draft: &VehicleConfig,
) -> Result<GameConfig, TuningPersistError> {
    let path = config_dir.join(VEHICLES_FILE);
    let original = fs::read_to_string(&path).map_err(|source| TuningPersistError::Io {
        path: path.clone(),
        source,
    })?;
    let mut document: toml::Value =
        toml::from_str(&original).map_err(|source| TuningPersistError::Document {
            path: path.clone(),
            source: Box::new(source),
        })?;

    write_tuning_fields(&mut document, draft)?;

    let updated = toml::to_string_pretty(&document).map_err(TuningPersistError::Serialize)?;
    fs::write(&path, updated).map_err(|source| TuningPersistError::Io {
        path: path.clone(),
        source,
    })?;

    GameConfig::load_from_dir(config_dir).map_err(|rejection| {
        if let Err(restore_error) = fs::write(&path, &original) {
            error!("Failed restoring `{}`: {restore_error}", path.display());
        }
        TuningPersistError::Rejected(rejection)
    })
}

fn write_tuning_fields(
    document: &mut toml::Value,
    draft: &VehicleConfig,
) -> Result<(), TuningPersistError> {
    let row = document
        .get_mut("vehicles")
        .and_then(toml::Value::as_array_mut)
        .and_then(|rows| {
            rows.iter_mut()
                .filter_map(toml::Value::as_table_mut)
                .find(|row| row_id(row) == Some(draft.id.as_str()))
        })
        .ok_or_else(|| TuningPersistError::MissingRow(draft.id.clone()))?;

    let mut source = draft.clone();
    for field in &TUNING_FIELDS {
        let value = *(field.value)(&mut source);
        if !value.is_finite() {
            return Err(TuningPersistError::NonFinite(field.key));
        }
        row.insert(field.key.to_string(), toml::Value::Float(value as f64));
    }

    Ok(())
}

fn row_id(row: &toml::map::Map<String, toml::Value>) -> Option<&str> {
    row.get("id").and_then(toml::Value::as_str)
}
