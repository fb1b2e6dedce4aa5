use super::*;
use crate::config::{ModelRigConfig, WheelNodeNames};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHASSIS_ROLE: &str = "chassis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelRole {
    FrontLeftOuter,
    FrontLeftInner,
    FrontRightOuter,
    FrontRightInner,
    RearLeftOuter,
    RearLeftInner,
    RearRightOuter,
    RearRightInner,
}

impl WheelRole {
    pub const ALL: [Self; 8] = [
        Self::FrontLeftOuter,
        Self::FrontLeftInner,
        Self::FrontRightOuter,
        Self::FrontRightInner,
        Self::RearLeftOuter,
        Self::RearLeftInner,
        Self::RearRightOuter,
        Self::RearRightInner,
    ];

    fn index(self) -> usize {
        match self {
            Self::FrontLeftOuter => 0,
            Self::FrontLeftInner => 1,
            Self::FrontRightOuter => 2,
            Self::FrontRightInner => 3,
            Self::RearLeftOuter => 4,
            Self::RearLeftInner => 5,
            Self::RearRightOuter => 6,
            Self::RearRightInner => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FrontLeftOuter => "wheel-front-left-outer",
            Self::FrontLeftInner => "wheel-front-left-inner",
            Self::FrontRightOuter => "wheel-front-right-outer",
            Self::FrontRightInner => "wheel-front-right-inner",
            Self::RearLeftOuter => "wheel-rear-left-outer",
            Self::RearLeftInner => "wheel-rear-left-inner",
            Self::RearRightOuter => "wheel-rear-right-outer",
            Self::RearRightInner => "wheel-rear-right-inner",
        }
    }

    pub fn node_name(self, names: &WheelNodeNames) -> &str {
        match self {
            Self::FrontLeftOuter => &names.front_left_outer,
            Self::FrontLeftInner => &names.front_left_inner,
            Self::FrontRightOuter => &names.front_right_outer,
            Self::FrontRightInner => &names.front_right_inner,
            Self::RearLeftOuter => &names.rear_left_outer,
            Self::RearLeftInner => &names.rear_left_inner,
            Self::RearRightOuter => &names.rear_right_outer,
            Self::RearRightInner => &names.rear_right_inner,
        }
    }
}

/// One entity per [`WheelRole`], complete by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSet {
    entities: [Entity; 8],
}

impl WheelSet {
    pub fn try_from_fn<E>(
        mut resolve: impl FnMut(WheelRole) -> Result<Entity, E>,
    ) -> Result<Self, E> {
        let mut entities = [Entity::PLACEHOLDER; 8];
        for role in WheelRole::ALL {
            entities[role.index()] = resolve(role)?;
        }
        Ok(Self { entities })
    }

    pub fn get(&self, role: WheelRole) -> Entity {
        self.entities[role.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (WheelRole, Entity)> + '_ {
        WheelRole::ALL
            .into_iter()
            .map(|role| (role, self.get(role)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleRig {
    /// Root entity carrying the character controller.
    pub body: Entity,
    pub chassis: Entity,
    pub wheels: WheelSet,
}

/// Lifecycle of the bond between frame logic and the loaded vehicle model.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VehicleLink {
    #[default]
    Uninitialized,
    Ready(VehicleRig),
}

impl VehicleLink {
    pub fn rig(&self) -> Option<&VehicleRig> {
        match self {
            Self::Ready(rig) => Some(rig),
            Self::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready(_) => "ready",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigBindingError {
    MissingNode {
        model: String,
        role: &'static str,
        node: String,
    },
}

impl Display for RigBindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingNode { model, role, node } => write!(
                f,
                "model `{model}` has no scene node named `{node}` for role `{role}`"
            ),
        }
    }
}

impl Error for RigBindingError {}

/// Last failed binding attempt; a failed model is not retried.
#[derive(Resource, Debug, Clone, Default)]
pub struct RigBindingStatus {
    pub failure: Option<RigBindingError>,
}

/// Marks the scene instance whose nodes make up the vehicle rig.
#[derive(Component, Debug, Clone)]
pub struct VehicleModelScene {
    pub model_id: String,
    pub rig: ModelRigConfig,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub entity: Entity,
    pub name: Option<String>,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigBinding {
    pub rig: VehicleRig,
    rest_rotations: [Quat; 8],
}

impl RigBinding {
    pub fn rest_rotation(&self, role: WheelRole) -> Quat {
        self.rest_rotations[role.index()]
    }
}

pub fn bind_rig(
    model_id: &str,
    body: Entity,
    rig: &ModelRigConfig,
    nodes: &[SceneNode],
) -> Result<RigBinding, RigBindingError> {
    let missing = |role: &'static str, node: &str| RigBindingError::MissingNode {
        model: model_id.to_string(),
        role,
        node: node.to_string(),
    };

    let chassis = find_named_node(nodes, &rig.chassis_node)
        .ok_or_else(|| missing(CHASSIS_ROLE, &rig.chassis_node))?;

    let mut rest_rotations = [Quat::IDENTITY; 8];
    let wheels = WheelSet::try_from_fn(|role| -> Result<Entity, RigBindingError> {
        let expected = role.node_name(&rig.wheels);
        let node =
            find_named_node(nodes, expected).ok_or_else(|| missing(role.label(), expected))?;
        rest_rotations[role.index()] = node.rotation;
        Ok(node.entity)
    })?;

    Ok(RigBinding {
        rig: VehicleRig {
            body,
            chassis: chassis.entity,
            wheels,
        },
        rest_rotations,
    })
}

fn find_named_node<'a>(nodes: &'a [SceneNode], expected_name: &str) -> Option<&'a SceneNode> {
    let named = || nodes.iter().filter_map(|node| Some((node, node.name.as_deref()?)));

    named()
        .find(|(_, name)| *name == expected_name)
        .or_else(|| named().find(|(_, name)| model_node_name_matches(name, expected_name)))
        .map(|(node, _)| node)
}

// glTF exporters suffix duplicated node names with `.NNN`.
fn model_node_name_matches(actual: &str, expected: &str) -> bool {
    actual == expected || actual.starts_with(format!("{expected}.").as_str())
}

fn collect_descendants(root: Entity, children_query: &Query<&Children>, out: &mut Vec<Entity>) {
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        let Ok(children) = children_query.get(entity) else {
            continue;
        };
        for child in children.iter() {
            out.push(child);
            stack.push(child);
        }
    }
}

pub(super) fn bind_vehicle_rig(
    mut commands: Commands,
    mut link: ResMut<VehicleLink>,
    mut status: ResMut<RigBindingStatus>,
    scene_query: Query<(Entity, &VehicleModelScene, &ChildOf)>,
    children_query: Query<&Children>,
    node_query: Query<(Option<&Name>, &Transform)>,
) {
    if link.is_ready() || status.failure.is_some() {
        return;
    }

    for (scene_entity, model_scene, child_of) in &scene_query {
        let mut descendants = Vec::new();
        collect_descendants(scene_entity, &children_query, &mut descendants);
        if descendants.is_empty() {
            continue;
        }

        let nodes: Vec<SceneNode> = descendants
            .iter()
            .filter_map(|entity| {
                node_query
                    .get(*entity)
                    .ok()
                    .map(|(name, transform)| SceneNode {
                        entity: *entity,
                        name: name.map(|name| name.as_str().to_string()),
                        rotation: transform.rotation,
                    })
            })
            .collect();

        match bind_rig(
            &model_scene.model_id,
            child_of.parent(),
            &model_scene.rig,
            &nodes,
        ) {
            Ok(binding) => {
                for (role, entity) in binding.rig.wheels.iter() {
                    commands.entity(entity).insert(WheelNode {
                        rest_rotation: binding.rest_rotation(role),
                    });
                }
                info!(
                    "Vehicle rig bound for model `{}`: chassis {:?}, 8 wheels from {} scene nodes.",
                    model_scene.model_id,
                    binding.rig.chassis,
                    nodes.len()
                );
                *link = VehicleLink::Ready(binding.rig);
            }
            Err(error) => {
                error!("Vehicle rig binding failed; vehicle stays uncontrollable: {error}");
                status.failure = Some(error);
            }
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_wheel_nodes;

    fn sample_rig() -> ModelRigConfig {
        ModelRigConfig {
            chassis_node: "Car".to_string(),
            wheels: sample_wheel_nodes(),
        }
    }

    fn node(world: &mut World, name: &str) -> SceneNode {
        SceneNode {
            entity: world.spawn_empty().id(),
            name: Some(name.to_string()),
            rotation: Quat::IDENTITY,
        }
    }

    fn sample_nodes(world: &mut World) -> Vec<SceneNode> {
        let mut nodes = vec![
            SceneNode {
                entity: world.spawn_empty().id(),
                name: None,
                rotation: Quat::IDENTITY,
            },
            node(world, "Car"),
        ];
        for name in [
            "TireR4", "TireR3", "TireR2", "TireR1", "TireL4", "TireL3", "TireL2", "TireL1",
        ] {
            nodes.push(node(world, name));
        }
        nodes
    }

    #[test]
    fn binds_every_role_by_name_regardless_of_order() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let nodes = sample_nodes(&mut world);

        let binding = bind_rig("car", body, &sample_rig(), &nodes).expect("rig should bind");

        assert_eq!(binding.rig.body, body);
        assert_eq!(binding.rig.chassis, nodes[1].entity);
        let rig = sample_rig();
        for (role, entity) in binding.rig.wheels.iter() {
            let expected = nodes
                .iter()
                .find(|node| node.name.as_deref() == Some(role.node_name(&rig.wheels)))
                .map(|node| node.entity);
            assert_eq!(Some(entity), expected, "{}", role.label());
        }
    }

    #[test]
    fn exporter_suffixed_names_still_bind() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let mut nodes = sample_nodes(&mut world);
        nodes[2].name = Some("TireR4.001".to_string());

        let binding = bind_rig("car", body, &sample_rig(), &nodes).expect("rig should bind");

        assert_eq!(
            binding.rig.wheels.get(WheelRole::RearRightInner),
            nodes[2].entity
        );
    }

    #[test]
    fn exact_name_wins_over_suffixed_duplicate() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let mut nodes = sample_nodes(&mut world);
        let duplicate = node(&mut world, "TireL1.002");
        nodes.insert(0, duplicate);

        let binding = bind_rig("car", body, &sample_rig(), &nodes).expect("rig should bind");

        assert_ne!(
            binding.rig.wheels.get(WheelRole::FrontLeftOuter),
            nodes[0].entity
        );
    }

    #[test]
    fn similar_prefix_is_not_a_match() {
        assert!(model_node_name_matches("TireL1.004", "TireL1"));
        assert!(!model_node_name_matches("TireL10", "TireL1"));
        assert!(!model_node_name_matches("Tire", "TireL1"));
    }

    #[test]
    fn missing_wheel_reports_role_and_node() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let nodes: Vec<SceneNode> = sample_nodes(&mut world)
            .into_iter()
            .filter(|node| node.name.as_deref() != Some("TireR3"))
            .collect();

        let error = bind_rig("car", body, &sample_rig(), &nodes).unwrap_err();

        assert_eq!(
            error,
            RigBindingError::MissingNode {
                model: "car".to_string(),
                role: "wheel-rear-right-outer",
                node: "TireR3".to_string(),
            }
        );
        assert!(error.to_string().contains("wheel-rear-right-outer"));
    }

    #[test]
    fn missing_chassis_fails_before_wheels() {
        let mut world = World::new();
        let body = world.spawn_empty().id();

        let error = bind_rig("car", body, &sample_rig(), &[]).unwrap_err();

        assert!(matches!(
            error,
            RigBindingError::MissingNode { role: "chassis", .. }
        ));
    }

    #[test]
    fn rest_rotation_is_captured_per_wheel() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        let mut nodes = sample_nodes(&mut world);
        let tilted = Quat::from_rotation_z(0.3);
        for node in &mut nodes {
            if node.name.as_deref() == Some("TireL3") {
                node.rotation = tilted;
            }
        }

        let binding = bind_rig("car", body, &sample_rig(), &nodes).expect("rig should bind");

        assert_eq!(binding.rest_rotation(WheelRole::RearLeftOuter), tilted);
        assert_eq!(binding.rest_rotation(WheelRole::FrontLeftOuter), Quat::IDENTITY);
    }

    #[test]
    fn link_starts_uninitialized() {
        let link = VehicleLink::default();

        assert!(!link.is_ready());
        assert!(link.rig().is_none());
        assert_eq!(link.label(), "uninitialized");
    }
}
