use crate::cluster::WithPosition;
use crate::host::{Host, LabelTarget, ObjectId};
use crate::FailureReason;
use derive_more::{Add, AddAssign, Display, Sub, SubAssign};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A map position in tiles.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Display,
    Serialize,
    Deserialize,
)]
#[display(fmt = "({}, {})", x, y)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Truncates towards negative infinity, the way the engine floors script coordinates.
    pub fn from_vec2(v: Vec2) -> Self {
        Self::new(v.x.floor() as i32, v.y.floor() as i32)
    }

    pub fn distance(self, other: Position) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Area {
    pub const fn new(x: i32, y: i32, x2: i32, y2: i32) -> Self {
        Self { x, y, x2, y2 }
    }

    pub fn center(&self) -> Position {
        Position::new((self.x + self.x2) / 2, (self.y + self.y2) / 2)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.x <= self.x2 && pos.y >= self.y && pos.y <= self.y2
    }
}

/// A place as a mission script names it.
///
/// Area must stay ahead of Position: untagged matching would otherwise accept an
/// area as a position and drop `x2`/`y2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PosSpec {
    Label(String),
    Area(Area),
    Position(Position),
}

impl PosSpec {
    /// Resolves to a concrete position.
    ///
    /// Areas resolve to their centre so that registering the same data twice
    /// always yields the same positions.
    pub fn resolve(&self, host: &impl Host) -> Result<Position, FailureReason> {
        match self {
            PosSpec::Position(pos) => Ok(*pos),
            PosSpec::Area(area) => Ok(area.center()),
            PosSpec::Label(label) => match host.resolve_label(label) {
                Some(LabelTarget::Position(pos)) => Ok(pos),
                Some(LabelTarget::Area(area)) => Ok(area.center()),
                Some(LabelTarget::Object(id)) => object_position(host, id),
                None => Err(FailureReason::UnknownLabel(label.clone())),
            },
        }
    }
}

fn object_position(host: &impl Host, id: ObjectId) -> Result<Position, FailureReason> {
    host.get_object(id)
        .map(|o| o.position())
        .ok_or(FailureReason::UnknownObject(id))
}

impl From<Position> for PosSpec {
    fn from(pos: Position) -> Self {
        PosSpec::Position(pos)
    }
}

impl From<Area> for PosSpec {
    fn from(area: Area) -> Self {
        PosSpec::Area(area)
    }
}

impl From<&str> for PosSpec {
    fn from(label: &str) -> Self {
        PosSpec::Label(label.to_owned())
    }
}

/// `pos`/`fallback` accept either one place or a list of places.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PosList {
    Many(Vec<PosSpec>),
    One(PosSpec),
}

impl PosList {
    /// Flattens into an ordered list of resolved positions.
    pub fn normalize(&self, host: &impl Host) -> Result<Vec<Position>, FailureReason> {
        match self {
            PosList::One(spec) => Ok(vec![spec.resolve(host)?]),
            PosList::Many(specs) => specs.iter().map(|s| s.resolve(host)).collect(),
        }
    }
}

impl From<PosSpec> for PosList {
    fn from(spec: PosSpec) -> Self {
        PosList::One(spec)
    }
}

impl From<Position> for PosList {
    fn from(pos: Position) -> Self {
        PosList::One(pos.into())
    }
}

impl From<&str> for PosList {
    fn from(label: &str) -> Self {
        PosList::One(label.into())
    }
}

impl<T: Into<PosSpec>> FromIterator<T> for PosList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        PosList::Many(iter.into_iter().map(Into::into).collect())
    }
}
