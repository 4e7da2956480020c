use crate::cluster::WithPosition;
use crate::position::{Area, Position};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub type ObjectId = u32;
pub type PlayerId = u8;

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[display(fmt = "group#{}", _0)]
pub struct GroupId(pub u32);

/// The engine's current order for a droid, and the orders we can give.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroidOrder {
    #[default]
    None,
    Stop,
    Move,
    Scout,
    Attack,
    Observe,
    Hold,
    /// Return to base.
    Rtb,
    /// Return to repair.
    Rtr,
    Rearm,
    CommanderSupport,
    Build,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroidType {
    #[default]
    Weapon,
    Sensor,
    Ecm,
    Construct,
    Person,
    Cyborg,
    CyborgConstruct,
    CyborgRepair,
    CyborgSuper,
    Transporter,
    SuperTransporter,
    Command,
    Repair,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propulsion {
    #[default]
    Wheeled,
    HalfTracked,
    Tracked,
    Legged,
    Hover,
    /// VTOL
    Lift,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureType {
    Hq,
    Factory,
    CyborgFactory,
    VtolFactory,
    PowerGen,
    ResourceExtractor,
    ResearchLab,
    RepairFacility,
    RearmPad,
    Defense,
    Wall,
    Generic,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureStatus {
    BeingBuilt,
    #[default]
    Built,
}

fn full() -> u32 {
    100
}

/// Snapshot of a droid, as the engine reports it at query time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Droid {
    pub id: ObjectId,
    pub player: PlayerId,
    pub position: Position,
    #[serde(default)]
    pub z: i32,
    /// Percent
    #[serde(default = "full")]
    pub health: u32,
    #[serde(default)]
    pub order: DroidOrder,
    #[serde(default)]
    pub droid_type: DroidType,
    #[serde(default)]
    pub propulsion: Propulsion,
    /// Ammunition of the first weapon in percent, only meaningful for VTOLs.
    #[serde(default = "full")]
    pub armed: u32,
    #[serde(default)]
    pub can_hit_air: bool,
    #[serde(default)]
    pub has_indirect: bool,
    #[serde(default)]
    pub is_cb: bool,
    #[serde(default)]
    pub group: Option<GroupId>,
}

impl Droid {
    pub fn new(id: ObjectId, player: PlayerId, position: Position, droid_type: DroidType) -> Self {
        Self {
            id,
            player,
            position,
            z: 0,
            health: 100,
            order: DroidOrder::None,
            droid_type,
            propulsion: Propulsion::default(),
            armed: 100,
            can_hit_air: false,
            has_indirect: false,
            is_cb: false,
            group: None,
        }
    }

    pub fn with_propulsion(mut self, propulsion: Propulsion) -> Self {
        self.propulsion = propulsion;
        self
    }

    pub fn with_z(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health;
        self
    }

    pub fn with_indirect(mut self) -> Self {
        self.has_indirect = true;
        self
    }

    pub fn with_anti_air(mut self) -> Self {
        self.can_hit_air = true;
        self
    }

    pub fn is_vtol(&self) -> bool {
        self.propulsion == Propulsion::Lift
    }

    pub fn is_sensor(&self) -> bool {
        self.droid_type == DroidType::Sensor
    }

    pub fn is_transporter(&self) -> bool {
        matches!(
            self.droid_type,
            DroidType::Transporter | DroidType::SuperTransporter
        )
    }

    pub fn is_truck(&self) -> bool {
        matches!(
            self.droid_type,
            DroidType::Construct | DroidType::CyborgConstruct
        )
    }

    /// Indirect fire, counter battery and sensors don't need line of sight to be useful.
    pub fn is_artillery_like(&self) -> bool {
        self.is_cb || self.has_indirect || self.is_sensor()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: ObjectId,
    pub player: PlayerId,
    pub position: Position,
    #[serde(default)]
    pub z: i32,
    pub stat: StructureType,
    #[serde(default)]
    pub status: StructureStatus,
    #[serde(default = "idle")]
    pub idle: bool,
    /// Dedicated anti air defense
    #[serde(default)]
    pub is_aa: bool,
}

fn idle() -> bool {
    true
}

impl Structure {
    pub fn new(id: ObjectId, player: PlayerId, position: Position, stat: StructureType) -> Self {
        Self {
            id,
            player,
            position,
            z: 0,
            stat,
            status: StructureStatus::Built,
            idle: true,
            is_aa: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameObject {
    Droid(Droid),
    Structure(Structure),
}

impl GameObject {
    pub fn id(&self) -> ObjectId {
        match self {
            GameObject::Droid(d) => d.id,
            GameObject::Structure(s) => s.id,
        }
    }

    pub fn player(&self) -> PlayerId {
        match self {
            GameObject::Droid(d) => d.player,
            GameObject::Structure(s) => s.player,
        }
    }

    pub fn z(&self) -> i32 {
        match self {
            GameObject::Droid(d) => d.z,
            GameObject::Structure(s) => s.z,
        }
    }

    pub fn as_droid(&self) -> Option<&Droid> {
        match self {
            GameObject::Droid(d) => Some(d),
            GameObject::Structure(_) => None,
        }
    }

    pub fn as_droid_mut(&mut self) -> Option<&mut Droid> {
        match self {
            GameObject::Droid(d) => Some(d),
            GameObject::Structure(_) => None,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, GameObject::Structure(_))
    }

    pub fn is_vtol_droid(&self) -> bool {
        self.as_droid().map(Droid::is_vtol).unwrap_or(false)
    }

    pub fn is_transporter(&self) -> bool {
        self.as_droid().map(Droid::is_transporter).unwrap_or(false)
    }
}

impl WithPosition for Droid {
    fn position(&self) -> Position {
        self.position
    }
}

impl WithPosition for Structure {
    fn position(&self) -> Position {
        self.position
    }
}

impl WithPosition for GameObject {
    fn position(&self) -> Position {
        match self {
            GameObject::Droid(d) => d.position,
            GameObject::Structure(s) => s.position,
        }
    }
}

/// What a map label refers to.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelTarget {
    Position(Position),
    Area(Area),
    Object(ObjectId),
}

/// Everything the tactics layer needs from the game engine.
///
/// Queries return snapshots; commands are fire and forget, the engine executes
/// them on its own schedule and never reports back through this trait.
pub trait Host {
    /// Simulation time in milliseconds, monotonically increasing.
    fn game_time(&self) -> u64;

    fn enum_group(&self, group: GroupId) -> Vec<Droid>;

    fn group_size(&self, group: GroupId) -> usize {
        self.enum_group(group).len()
    }

    /// Droids and structures of `player` within `radius` tiles. With `seen_only`,
    /// only objects currently visible to us are returned.
    fn enum_range(
        &self,
        center: Position,
        radius: f32,
        player: PlayerId,
        seen_only: bool,
    ) -> Vec<GameObject>;

    fn enum_struct(&self, player: PlayerId, stat: Option<StructureType>) -> Vec<Structure>;

    fn enum_droid(&self, player: PlayerId, droid_type: Option<DroidType>) -> Vec<Droid>;

    fn get_object(&self, id: ObjectId) -> Option<GameObject>;

    fn resolve_label(&self, label: &str) -> Option<LabelTarget>;

    fn propulsion_can_reach(&self, propulsion: Propulsion, from: Position, to: Position) -> bool;

    fn new_group(&mut self) -> GroupId;

    fn group_add_droid(&mut self, group: GroupId, droid: ObjectId);

    fn order_droid(&mut self, droid: ObjectId, order: DroidOrder);

    fn order_droid_loc(&mut self, droid: ObjectId, order: DroidOrder, at: Position);

    fn order_droid_obj(&mut self, droid: ObjectId, order: DroidOrder, target: ObjectId);

    /// Starts `research` in `lab` if possible.
    fn pursue_research(&mut self, lab: ObjectId, research: &str) -> bool;
}
