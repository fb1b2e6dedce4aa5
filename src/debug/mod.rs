mod tuning;

use crate::config::GameConfig;
use crate::gameplay::vehicle::{
    ControlInputState, PlayerVehicle, RigBindingStatus, VehicleLink, VehicleTelemetry,
};
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;
use tuning::{vehicle_tuning_panel_ui, TuningPanel};

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeybindHelpState>()
            .init_resource::<TuningPanel>()
            .add_systems(
                Update,
                (
                    spawn_debug_overlay,
                    handle_debug_hotkeys,
                    sync_keybind_help_visibility,
                    update_debug_overlay_text,
                )
                    .chain()
                    .run_if(debug_overlay_enabled),
            )
            .add_systems(
                EguiPrimaryContextPass,
                vehicle_tuning_panel_ui.run_if(debug_overlay_enabled),
            );
    }
}

fn debug_overlay_enabled(config: Option<Res<GameConfig>>) -> bool {
    config.is_some_and(|config| config.game.app.debug_overlay)
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindHelpText;

#[derive(Resource, Debug, Clone, Default)]
struct KeybindHelpState {
    visible: bool,
}

const KEYBIND_HELP: &str = "Keybinds\n\
W - Accelerate\n\
S - Brake / reverse\n\
A / D - Steer while W or S is held\n\
H - Toggle this panel\n\
V - Toggle vehicle tuning panel\n\
F5 - Hot-reload config";

fn spawn_debug_overlay(
    mut commands: Commands,
    help: Res<KeybindHelpState>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("DebugOverlay"),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(12.0),
                top: Val::Px(12.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(10.0),
                ..default()
            },
            ZIndex(100),
        ))
        .with_children(|parent| {
            parent.spawn((
                DebugOverlayText,
                Text::new("debug overlay initializing..."),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(0.92, 0.95, 0.97)),
            ));

            parent.spawn((
                KeybindHelpText,
                Text::new(KEYBIND_HELP),
                TextFont {
                    font_size: 15.0,
                    ..default()
                },
                TextColor(Color::srgb(0.90, 0.94, 0.97)),
                BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
                BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
                Node {
                    padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                help_visibility(help.visible),
            ));
        });
}

fn handle_debug_hotkeys(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut help: ResMut<KeybindHelpState>,
    mut tuning_panel: ResMut<TuningPanel>,
) {
    if keyboard.just_pressed(KeyCode::KeyH) {
        help.visible = !help.visible;
        info!(
            "Debug keybind panel {}.",
            if help.visible { "shown" } else { "hidden" }
        );
    }

    if keyboard.just_pressed(KeyCode::KeyV) {
        tuning_panel.toggle();
        info!(
            "Vehicle tuning panel {}.",
            if tuning_panel.open { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_help_visibility(
    help: Res<KeybindHelpState>,
    mut query: Query<&mut Visibility, With<KeybindHelpText>>,
) {
    if !help.is_changed() {
        return;
    }

    for mut visibility in &mut query {
        *visibility = help_visibility(help.visible);
    }
}

fn help_visibility(visible: bool) -> Visibility {
    if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    telemetry: Res<VehicleTelemetry>,
    link: Res<VehicleLink>,
    binding_status: Res<RigBindingStatus>,
    input_state: Res<ControlInputState>,
    player_query: Query<&Transform, With<PlayerVehicle>>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let position = player_query
        .single()
        .map(|transform| transform.translation)
        .unwrap_or(Vec3::ZERO);

    let link_line = match &binding_status.failure {
        Some(error) => format!("{} ({error})", link.label()),
        None => link.label().to_string(),
    };
    let held: Vec<&str> = input_state
        .held_actions()
        .map(|action| action.label())
        .collect();

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nVehicle: {link_line}\nSpeed: {speed:>6.3} /frame\nDistance: {distance:>7.1}\nPosition: {x:>7.1} {y:>6.1} {z:>7.1}\nBlocked: {blocked} (move {effective:.3} of {desired:.3})\nHeld: {held}\nHotkeys: H help | V vehicle tune | F5 reload config",
        speed = telemetry.speed,
        distance = telemetry.distance,
        x = position.x,
        y = position.y,
        z = position.z,
        blocked = if telemetry.blocked { "yes" } else { "no" },
        effective = telemetry.effective_translation.length(),
        desired = telemetry.desired_translation.length(),
        held = if held.is_empty() {
            "none".to_string()
        } else {
            held.join(", ")
        },
    ));
}
