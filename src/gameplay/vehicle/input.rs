use super::*;
use bevy::input::keyboard::KeyboardInput;

/// Driving intent decoupled from the physical key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Forward,
    Backward,
    Left,
    Right,
}

impl ControlAction {
    pub const ALL: [Self; 4] = [Self::Forward, Self::Backward, Self::Left, Self::Right];

    fn index(self) -> usize {
        match self {
            Self::Forward => 0,
            Self::Backward => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Held/released flag per control action, kept until the matching release arrives.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInputState {
    held: [bool; 4],
}

impl ControlInputState {
    pub fn set(&mut self, action: ControlAction, pressed: bool) {
        self.held[action.index()] = pressed;
    }

    pub fn is_held(&self, action: ControlAction) -> bool {
        self.held[action.index()]
    }

    pub fn held_actions(&self) -> impl Iterator<Item = ControlAction> + '_ {
        ControlAction::ALL
            .into_iter()
            .filter(|action| self.is_held(*action))
    }

    /// Records a key transition; keys without a binding are ignored.
    pub fn apply_key(
        &mut self,
        bindings: &VehicleInputBindings,
        key: KeyCode,
        pressed: bool,
    ) -> Option<ControlAction> {
        let action = bindings.action_for(key)?;
        self.set(action, pressed);
        Some(action)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct VehicleInputBindings {
    forward: KeyCode,
    backward: KeyCode,
    left: KeyCode,
    right: KeyCode,
}

impl Default for VehicleInputBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
        }
    }
}

impl VehicleInputBindings {
    pub fn action_for(&self, key: KeyCode) -> Option<ControlAction> {
        if key == self.forward {
            Some(ControlAction::Forward)
        } else if key == self.backward {
            Some(ControlAction::Backward)
        } else if key == self.left {
            Some(ControlAction::Left)
        } else if key == self.right {
            Some(ControlAction::Right)
        } else {
            None
        }
    }
}

pub(super) fn track_control_input(
    mut keyboard_events: MessageReader<KeyboardInput>,
    bindings: Res<VehicleInputBindings>,
    mut input_state: ResMut<ControlInputState>,
) {
    for event in keyboard_events.read() {
        input_state.apply_key(&bindings, event.key_code, event.state.is_pressed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::input::keyboard::{Key, NativeKey};
    use bevy::input::ButtonState;

    fn key_message(key_code: KeyCode, state: ButtonState) -> KeyboardInput {
        KeyboardInput {
            key_code,
            logical_key: Key::Unidentified(NativeKey::Unidentified),
            state,
            text: None,
            repeat: false,
            window: Entity::PLACEHOLDER,
        }
    }

    fn input_app() -> App {
        let mut app = App::new();
        app.add_message::<KeyboardInput>()
            .init_resource::<VehicleInputBindings>()
            .init_resource::<ControlInputState>()
            .add_systems(Update, track_control_input);
        app
    }

    fn held_in(app: &App) -> Vec<ControlAction> {
        app.world()
            .resource::<ControlInputState>()
            .held_actions()
            .collect()
    }

    #[test]
    fn unseen_actions_are_not_held() {
        let state = ControlInputState::default();

        for action in ControlAction::ALL {
            assert!(!state.is_held(action));
        }
        assert_eq!(state.held_actions().count(), 0);
    }

    #[test]
    fn press_and_release_round_trip_per_action() {
        let bindings = VehicleInputBindings::default();
        let mut state = ControlInputState::default();

        assert_eq!(
            state.apply_key(&bindings, KeyCode::KeyW, true),
            Some(ControlAction::Forward)
        );
        state.apply_key(&bindings, KeyCode::KeyA, true);
        assert!(state.is_held(ControlAction::Forward));
        assert!(state.is_held(ControlAction::Left));

        state.apply_key(&bindings, KeyCode::KeyW, false);
        assert!(!state.is_held(ControlAction::Forward));
        assert!(state.is_held(ControlAction::Left));
    }

    #[test]
    fn key_repeat_reasserts_pressed_harmlessly() {
        let bindings = VehicleInputBindings::default();
        let mut state = ControlInputState::default();

        for _ in 0..5 {
            state.apply_key(&bindings, KeyCode::KeyD, true);
        }

        assert_eq!(
            state.held_actions().collect::<Vec<_>>(),
            vec![ControlAction::Right]
        );
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let bindings = VehicleInputBindings::default();
        let mut state = ControlInputState::default();

        assert_eq!(state.apply_key(&bindings, KeyCode::ArrowUp, true), None);
        assert_eq!(state.apply_key(&bindings, KeyCode::Space, true), None);
        assert_eq!(state, ControlInputState::default());
    }

    #[test]
    fn keyboard_messages_drive_held_actions() {
        let mut app = input_app();
        for key in [KeyCode::KeyW, KeyCode::KeyA, KeyCode::Space] {
            app.world_mut()
                .write_message(key_message(key, ButtonState::Pressed));
        }

        app.update();
        assert_eq!(
            held_in(&app),
            vec![ControlAction::Forward, ControlAction::Left]
        );

        app.world_mut()
            .write_message(key_message(KeyCode::KeyW, ButtonState::Released));
        app.update();
        assert_eq!(held_in(&app), vec![ControlAction::Left]);

        // Held state persists across frames with no new messages.
        app.update();
        assert_eq!(held_in(&app), vec![ControlAction::Left]);
    }
}
