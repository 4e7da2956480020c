use crate::config::TacticsConfig;
use crate::host::{Host, LabelTarget, ObjectId};
use crate::position::{PosList, PosSpec, Position};
use crate::FailureReason;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// High level behavior of a managed group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOrder {
    /// Pursue the enemy, preferably around the given positions.
    Attack,
    /// Protect a position; units too far away return ignoring fire.
    Defend,
    /// Move between a list of positions.
    Patrol,
    /// Like attack, but stay near the listed positions instead of roaming the map.
    Compromise,
    /// Attach to a commander who executes a sub-order.
    Follow,
}

impl GroupOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupOrder::Attack => "ATTACK",
            GroupOrder::Defend => "DEFEND",
            GroupOrder::Patrol => "PATROL",
            GroupOrder::Compromise => "COMPROMISE",
            GroupOrder::Follow => "FOLLOW",
        }
    }

    pub fn code(self) -> i32 {
        match self {
            GroupOrder::Attack => 0,
            GroupOrder::Defend => 1,
            GroupOrder::Patrol => 2,
            GroupOrder::Compromise => 3,
            GroupOrder::Follow => 4,
        }
    }
}

impl fmt::Display for GroupOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupOrder {
    type Err = FailureReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ATTACK" => Ok(GroupOrder::Attack),
            "DEFEND" => Ok(GroupOrder::Defend),
            "PATROL" => Ok(GroupOrder::Patrol),
            "COMPROMISE" => Ok(GroupOrder::Compromise),
            "FOLLOW" => Ok(GroupOrder::Follow),
            _ => Err(FailureReason::UnknownOrder(s.to_owned())),
        }
    }
}

impl TryFrom<i32> for GroupOrder {
    type Error = FailureReason;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(GroupOrder::Attack),
            1 => Ok(GroupOrder::Defend),
            2 => Ok(GroupOrder::Patrol),
            3 => Ok(GroupOrder::Compromise),
            4 => Ok(GroupOrder::Follow),
            _ => Err(FailureReason::UnknownOrder(code.to_string())),
        }
    }
}

/// Diagnostic name for a raw order code, "UNKNOWN" if it isn't one.
pub fn order_to_string(code: i32) -> &'static str {
    GroupOrder::try_from(code)
        .map(GroupOrder::as_str)
        .unwrap_or("UNKNOWN")
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatrolType {
    /// Any waypoint but the current one.
    #[default]
    Random,
    /// Strict round robin.
    Cycle,
}

/// A droid named by id or by label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(ObjectId),
    Label(String),
}

impl ObjectRef {
    fn resolve(&self, host: &impl Host) -> Result<ObjectId, FailureReason> {
        let id = match self {
            ObjectRef::Id(id) => *id,
            ObjectRef::Label(label) => match host.resolve_label(label) {
                Some(LabelTarget::Object(id)) => id,
                _ => return Err(FailureReason::UnknownLabel(label.clone())),
            },
        };
        host.get_object(id)
            .map(|_| id)
            .ok_or(FailureReason::UnknownObject(id))
    }
}

/// Order configuration as mission scripts write it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct GroupData {
    pub pos: Option<PosList>,
    pub radius: Option<f32>,
    pub fallback: Option<PosList>,
    /// 1..=100 percent of the baseline that may die before falling back.
    pub morale: Option<u32>,
    /// Baseline unit count, -1 for "⅔ of the live group" when regrouping.
    pub count: Option<i32>,
    /// Health percent at which units go for repairs.
    pub repair: Option<u32>,
    pub repair_pos: Option<PosSpec>,
    pub regroup: Option<bool>,
    pub patrol_type: Option<PatrolType>,
    pub interval: Option<u64>,
    pub react_to_attack: Option<bool>,
    pub removable: Option<bool>,
    pub droid: Option<ObjectRef>,
    pub order: Option<GroupOrder>,
    pub data: Option<Box<GroupData>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BaselineCount {
    Fixed(usize),
    /// Regroup against ⅔ of the live group size.
    Auto,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FollowOrder {
    pub commander: ObjectId,
    pub order: GroupOrder,
    /// Kept raw so the group can be re-registered under it when the commander dies.
    pub data: GroupData,
}

/// Validated order configuration, positions already resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderData {
    pub pos: Vec<Position>,
    pub radius: Option<f32>,
    pub fallback: Vec<Position>,
    pub morale: Option<u32>,
    pub repair: Option<u32>,
    pub repair_pos: Option<Position>,
    pub regroup: bool,
    pub patrol_type: PatrolType,
    pub interval: u64,
    pub react_to_attack: bool,
    pub removable: bool,
    pub follow: Option<FollowOrder>,
}

impl OrderData {
    pub fn normalize(
        order: GroupOrder,
        raw: &GroupData,
        host: &impl Host,
        config: &TacticsConfig,
    ) -> Result<Self, FailureReason> {
        let pos = match &raw.pos {
            Some(list) => list.normalize(host)?,
            None => vec![],
        };
        let fallback = match &raw.fallback {
            Some(list) => list.normalize(host)?,
            None => vec![],
        };
        match order {
            GroupOrder::Defend | GroupOrder::Compromise if pos.is_empty() => {
                return Err(FailureReason::MissingPosition(order))
            }
            GroupOrder::Patrol if pos.is_empty() => return Err(FailureReason::EmptyPatrol),
            _ => (),
        }
        if let Some(morale) = raw.morale {
            if !(1..=100).contains(&morale) {
                return Err(FailureReason::InvalidMorale(morale));
            }
            if order == GroupOrder::Attack && fallback.is_empty() {
                return Err(FailureReason::MissingFallback);
            }
        }
        if let Some(repair) = raw.repair {
            if repair > 100 {
                return Err(FailureReason::InvalidRepair(repair));
            }
        }
        if matches!(raw.count, Some(c) if c < -1) {
            return Err(FailureReason::misc(format!(
                "count must be -1 or positive, got {:?}",
                raw.count
            )));
        }
        let react_to_attack = raw.react_to_attack.unwrap_or(false);
        if react_to_attack && !matches!(order, GroupOrder::Patrol | GroupOrder::Follow) {
            debug!("reactToAttack is ignored for {} orders", order);
        }
        let follow = if order == GroupOrder::Follow {
            let commander = raw
                .droid
                .as_ref()
                .ok_or(FailureReason::MissingCommander)?
                .resolve(host)?;
            let sub_order = raw
                .order
                .ok_or(FailureReason::misc("FOLLOW requires a sub-order"))?;
            let sub_data = raw.data.as_deref().cloned().unwrap_or_default();
            // Fail now rather than when the commander dies
            Self::normalize(sub_order, &sub_data, host, config)?;
            Some(FollowOrder {
                commander,
                order: sub_order,
                data: sub_data,
            })
        } else {
            None
        };
        Ok(Self {
            pos,
            radius: raw.radius,
            fallback,
            morale: raw.morale,
            repair: raw.repair,
            repair_pos: raw
                .repair_pos
                .as_ref()
                .map(|p| p.resolve(host))
                .transpose()?,
            regroup: raw.regroup.unwrap_or(false),
            patrol_type: raw.patrol_type.unwrap_or_default(),
            interval: raw.interval.unwrap_or(config.default_patrol_interval_ms),
            react_to_attack: react_to_attack
                && matches!(order, GroupOrder::Patrol | GroupOrder::Follow),
            removable: raw.removable.unwrap_or(true),
            follow,
        })
    }

    pub fn count(raw: &GroupData, live_size: usize) -> BaselineCount {
        match raw.count {
            Some(-1) => BaselineCount::Auto,
            Some(n) if n >= 0 => BaselineCount::Fixed(n as usize),
            _ => BaselineCount::Fixed(live_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Droid, DroidType};
    use crate::sim::SimWorld;

    fn world() -> SimWorld {
        let mut world = SimWorld::new();
        world.set_label("playerLZ", LabelTarget::Position(Position::new(40, 40)));
        world.set_label("safeSpot", LabelTarget::Position(Position::new(5, 5)));
        world
    }

    #[test]
    fn order_names() {
        assert_eq!(GroupOrder::Compromise.to_string(), "COMPROMISE");
        assert_eq!("defend".parse::<GroupOrder>().unwrap(), GroupOrder::Defend);
        assert!("RETREAT".parse::<GroupOrder>().is_err());
        assert_eq!(order_to_string(4), "FOLLOW");
        assert_eq!(order_to_string(17), "UNKNOWN");
        for order in [
            GroupOrder::Attack,
            GroupOrder::Defend,
            GroupOrder::Patrol,
            GroupOrder::Compromise,
            GroupOrder::Follow,
        ] {
            assert_eq!(GroupOrder::try_from(order.code()).unwrap(), order);
        }
    }

    #[test]
    fn group_data_from_json() {
        let data: GroupData = serde_json::from_str(
            r#"{"pos":"playerLZ","radius":10,"morale":50,"fallback":"safeSpot","patrolType":"CYCLE"}"#,
        )
        .unwrap();
        assert_eq!(data.morale, Some(50));
        assert_eq!(data.patrol_type, Some(PatrolType::Cycle));
        assert!(serde_json::from_str::<GroupData>(r#"{"moral":50}"#).is_err());
    }

    #[test]
    fn normalization_is_idempotent() {
        let world = world();
        let config = TacticsConfig::default();
        let raw = GroupData {
            pos: Some(PosList::from("playerLZ")),
            fallback: Some(PosList::from("safeSpot")),
            morale: Some(50),
            ..Default::default()
        };
        let a = OrderData::normalize(GroupOrder::Attack, &raw, &world, &config).unwrap();
        let b = OrderData::normalize(GroupOrder::Attack, &raw, &world, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pos, vec![Position::new(40, 40)]);
        assert_eq!(a.fallback, vec![Position::new(5, 5)]);
        assert_eq!(a.interval, config.default_patrol_interval_ms);
        assert!(a.removable);
    }

    #[test]
    fn validation_failures() {
        let world = world();
        let config = TacticsConfig::default();
        let check = |order, raw: GroupData| OrderData::normalize(order, &raw, &world, &config);

        assert!(matches!(
            check(GroupOrder::Defend, GroupData::default()),
            Err(FailureReason::MissingPosition(GroupOrder::Defend))
        ));
        assert!(matches!(
            check(GroupOrder::Patrol, GroupData::default()),
            Err(FailureReason::EmptyPatrol)
        ));
        assert!(matches!(
            check(
                GroupOrder::Attack,
                GroupData {
                    morale: Some(0),
                    ..Default::default()
                }
            ),
            Err(FailureReason::InvalidMorale(0))
        ));
        assert!(matches!(
            check(
                GroupOrder::Attack,
                GroupData {
                    morale: Some(50),
                    ..Default::default()
                }
            ),
            Err(FailureReason::MissingFallback)
        ));
        assert!(matches!(
            check(GroupOrder::Follow, GroupData::default()),
            Err(FailureReason::MissingCommander)
        ));
        assert!(matches!(
            check(
                GroupOrder::Follow,
                GroupData {
                    droid: Some(ObjectRef::Id(99)),
                    order: Some(GroupOrder::Attack),
                    ..Default::default()
                }
            ),
            Err(FailureReason::UnknownObject(99))
        ));
    }

    #[test]
    fn follow_checks_the_sub_order_up_front() {
        let mut world = world();
        world.add_droid(Droid::new(7, 1, Position::new(1, 1), DroidType::Command));
        let config = TacticsConfig::default();
        let raw = GroupData {
            droid: Some(ObjectRef::Id(7)),
            order: Some(GroupOrder::Defend),
            ..Default::default()
        };
        assert!(matches!(
            OrderData::normalize(GroupOrder::Follow, &raw, &world, &config),
            Err(FailureReason::MissingPosition(GroupOrder::Defend))
        ));
    }

    #[test]
    fn react_to_attack_only_sticks_for_patrol_and_follow() {
        let world = world();
        let config = TacticsConfig::default();
        let raw = GroupData {
            pos: Some(PosList::from("playerLZ")),
            react_to_attack: Some(true),
            ..Default::default()
        };
        let attack = OrderData::normalize(GroupOrder::Attack, &raw, &world, &config).unwrap();
        assert!(!attack.react_to_attack);
        let patrol = OrderData::normalize(GroupOrder::Patrol, &raw, &world, &config).unwrap();
        assert!(patrol.react_to_attack);
    }

    #[test]
    fn baseline_count() {
        let raw = GroupData {
            count: Some(-1),
            ..Default::default()
        };
        assert_eq!(OrderData::count(&raw, 9), BaselineCount::Auto);
        assert_eq!(
            OrderData::count(&GroupData::default(), 9),
            BaselineCount::Fixed(9)
        );
    }
}
