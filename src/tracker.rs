use crate::*;
use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Truck and research preferences of an AI personality.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Personality {
    pub min_builders: usize,
    pub max_builders: usize,
    pub min_oilers: usize,
    pub max_oilers: usize,
    pub abs_max_trucks: usize,
    pub research_path_primary: Vec<String>,
    pub research_path_fundamental: Vec<String>,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            min_builders: 3,
            max_builders: 5,
            min_oilers: 2,
            max_oilers: 4,
            abs_max_trucks: 10,
            research_path_primary: vec![],
            research_path_fundamental: vec![],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TruckRole {
    /// Builds the base
    Builder,
    /// Hunts for oil
    Oiler,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnemyCensus {
    pub tank: usize,
    pub borg: usize,
    pub vtol: usize,
    pub defs: usize,
    pub aa: usize,
}

#[derive(Debug, Default)]
pub struct Tracker {
    pub personality: Personality,
    builder_group: Option<GroupId>,
    oiler_group: Option<GroupId>,
    census: AHashMap<PlayerId, (u64, EnemyCensus)>,
}

impl Tracker {
    pub fn new(personality: Personality) -> Self {
        Self {
            personality,
            ..Default::default()
        }
    }

    pub fn builder_group(&self) -> Option<GroupId> {
        self.builder_group
    }

    pub fn oiler_group(&self) -> Option<GroupId> {
        self.oiler_group
    }

    pub(crate) fn forget(&mut self) {
        self.builder_group = None;
        self.oiler_group = None;
        self.census.clear();
    }
}

/// Built and not busy.
pub fn structure_ready(structure: &Structure) -> bool {
    structure.idle && structure.status == StructureStatus::Built
}

impl<H: Host> Tactics<H> {
    fn truck_groups(&mut self) -> (GroupId, GroupId) {
        let builders = match self.tracker.builder_group {
            Some(group) => group,
            None => *self.tracker.builder_group.insert(self.host.new_group()),
        };
        let oilers = match self.tracker.oiler_group {
            Some(group) => group,
            None => *self.tracker.oiler_group.insert(self.host.new_group()),
        };
        (builders, oilers)
    }

    /// Puts a new truck into the builder or the oiler group, filling minimums
    /// first, then maximums, then picking at random.
    pub fn assign_truck(&mut self, truck: ObjectId) -> TruckRole {
        let (builders, oilers) = self.truck_groups();
        let b = self.host.group_size(builders);
        let o = self.host.group_size(oilers);
        let p = &self.tracker.personality;
        let role = if b < p.min_builders {
            TruckRole::Builder
        } else if o < p.min_oilers {
            TruckRole::Oiler
        } else if b < p.max_builders {
            TruckRole::Builder
        } else if o < p.max_oilers || b + o > p.abs_max_trucks {
            TruckRole::Oiler
        } else if self.rand_below(2) == 0 {
            TruckRole::Builder
        } else {
            TruckRole::Oiler
        };
        let group = match role {
            TruckRole::Builder => builders,
            TruckRole::Oiler => oilers,
        };
        self.host.group_add_droid(group, truck);
        role
    }

    /// Makes sure we never sit without builders while oilers are around.
    pub fn balance_trucks(&mut self) {
        let (builders, oilers) = self.truck_groups();
        if self.host.group_size(builders) > 0 {
            return;
        }
        if let Some(truck) = self.host.enum_group(oilers).first() {
            debug!("Moving truck {} to builders", truck.id);
            self.host.group_add_droid(builders, truck.id);
        }
    }

    /// What `enemy` fields, refreshed at most every `enemy_census_ttl_ms`.
    pub fn enemy_census(&mut self, enemy: PlayerId) -> EnemyCensus {
        let now = self.host.game_time();
        if let Some((at, census)) = self.tracker.census.get(&enemy) {
            if now.saturating_sub(*at) < self.config.enemy_census_ttl_ms {
                return *census;
            }
        }
        let mut census = EnemyCensus::default();
        for droid in self.host.enum_droid(enemy, None) {
            if droid.is_vtol() {
                census.vtol += 1;
            } else if droid.droid_type == DroidType::Weapon {
                census.tank += 1;
            } else if droid.droid_type == DroidType::Cyborg {
                census.borg += 1;
            }
        }
        for defense in self.host.enum_struct(enemy, Some(StructureType::Defense)) {
            if defense.is_aa {
                census.aa += 1;
            } else {
                census.defs += 1;
            }
        }
        self.tracker.census.insert(enemy, (now, census));
        census
    }

    /// Starts the first research of `path` that `lab` can pursue.
    pub fn follow_research_path(&mut self, lab: ObjectId, path: &[String]) -> bool {
        path.iter().any(|research| self.host.pursue_research(lab, research))
    }

    /// Keeps every ready lab of `player` busy with the personality's primary
    /// path, falling back to the fundamental one. Returns how many labs started.
    pub fn do_research(&mut self, player: PlayerId) -> usize {
        let primary = self.tracker.personality.research_path_primary.clone();
        let fundamental = self.tracker.personality.research_path_fundamental.clone();
        let mut started = 0;
        for lab in self.host.enum_struct(player, Some(StructureType::ResearchLab)) {
            if !structure_ready(&lab) {
                continue;
            }
            if self.follow_research_path(lab.id, &primary)
                || self.follow_research_path(lab.id, &fundamental)
            {
                started += 1;
            }
        }
        started
    }

    pub fn count_structures(&self, player: PlayerId, stat: StructureType) -> usize {
        self.host.enum_struct(player, Some(stat)).len()
    }

    pub fn count_droids(&self, player: PlayerId, droid_type: Option<DroidType>) -> usize {
        self.host.enum_droid(player, droid_type).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimWorld;

    const ME: PlayerId = 1;

    fn tactics(personality: Personality) -> Tactics<SimWorld> {
        Tactics::new(SimWorld::new(), TacticsConfig::default()).with_personality(personality)
    }

    fn add_truck(tactics: &mut Tactics<SimWorld>, id: ObjectId) -> ObjectId {
        tactics
            .host
            .add_droid(Droid::new(id, ME, Position::new(1, 1), DroidType::Construct))
    }

    #[test]
    fn trucks_fill_minimums_then_maximums() {
        let mut tactics = tactics(Personality {
            min_builders: 2,
            max_builders: 3,
            min_oilers: 1,
            max_oilers: 2,
            ..Default::default()
        });
        let roles: Vec<_> = (1..=5)
            .map(|id| {
                let truck = add_truck(&mut tactics, id);
                tactics.assign_truck(truck)
            })
            .collect();
        use TruckRole::*;
        assert_eq!(roles, vec![Builder, Builder, Oiler, Builder, Oiler]);
    }

    #[test]
    fn too_many_trucks_become_oilers() {
        let mut tactics = tactics(Personality {
            min_builders: 0,
            max_builders: 0,
            min_oilers: 0,
            max_oilers: 0,
            abs_max_trucks: 1,
            ..Default::default()
        });
        for id in 1..=4 {
            let truck = add_truck(&mut tactics, id);
            tactics.assign_truck(truck);
        }
        let truck = add_truck(&mut tactics, 5);
        assert_eq!(tactics.assign_truck(truck), TruckRole::Oiler);
    }

    #[test]
    fn balance_moves_one_oiler() {
        let mut tactics = tactics(Personality {
            min_builders: 0,
            max_builders: 0,
            min_oilers: 3,
            ..Default::default()
        });
        for id in 1..=3 {
            let truck = add_truck(&mut tactics, id);
            assert_eq!(tactics.assign_truck(truck), TruckRole::Oiler);
        }
        tactics.balance_trucks();
        let builders = tactics.tracker.builder_group().unwrap();
        let oilers = tactics.tracker.oiler_group().unwrap();
        assert_eq!(tactics.host.group_size(builders), 1);
        assert_eq!(tactics.host.group_size(oilers), 2);
        tactics.balance_trucks();
        assert_eq!(tactics.host.group_size(builders), 1);
    }

    #[test]
    fn census_counts_and_caches() {
        let mut tactics = tactics(Personality::default());
        let host = &mut tactics.host;
        host.add_droid(Droid::new(1, 0, Position::new(5, 5), DroidType::Weapon));
        host.add_droid(Droid::new(2, 0, Position::new(5, 6), DroidType::Cyborg));
        host.add_droid(
            Droid::new(3, 0, Position::new(5, 7), DroidType::Weapon)
                .with_propulsion(Propulsion::Lift),
        );
        host.add_droid(Droid::new(4, 0, Position::new(5, 8), DroidType::Construct));
        host.add_structure(Structure::new(5, 0, Position::new(9, 9), StructureType::Defense));
        let mut aa = Structure::new(6, 0, Position::new(9, 10), StructureType::Defense);
        aa.is_aa = true;
        host.add_structure(aa);

        let census = tactics.enemy_census(0);
        assert_eq!(
            census,
            EnemyCensus {
                tank: 1,
                borg: 1,
                vtol: 1,
                defs: 1,
                aa: 1
            }
        );

        tactics
            .host
            .add_droid(Droid::new(7, 0, Position::new(6, 5), DroidType::Weapon));
        tactics.host.advance(59_999);
        assert_eq!(tactics.enemy_census(0).tank, 1);
        tactics.host.advance(1);
        assert_eq!(tactics.enemy_census(0).tank, 2);
    }

    #[test]
    fn research_follows_paths_in_order() {
        let mut tactics = tactics(Personality {
            research_path_primary: vec!["R-Vehicle-Prop-Hover".into(), "R-Wpn-MG1Mk1".into()],
            research_path_fundamental: vec!["R-Struc-Power-Upgrade01".into()],
            ..Default::default()
        });
        tactics.host.add_research("R-Wpn-MG1Mk1");
        tactics.host.add_research("R-Struc-Power-Upgrade01");
        tactics.host.add_structure(Structure::new(
            1,
            ME,
            Position::new(3, 3),
            StructureType::ResearchLab,
        ));
        tactics.host.add_structure(Structure::new(
            2,
            ME,
            Position::new(4, 3),
            StructureType::ResearchLab,
        ));
        let mut busy = Structure::new(3, ME, Position::new(5, 3), StructureType::ResearchLab);
        busy.idle = false;
        tactics.host.add_structure(busy);

        assert_eq!(tactics.do_research(ME), 2);
        assert_eq!(
            tactics.host.researching,
            vec![
                (1, "R-Wpn-MG1Mk1".to_owned()),
                (2, "R-Struc-Power-Upgrade01".to_owned())
            ]
        );
        assert_eq!(tactics.do_research(ME), 0);
    }

    #[test]
    fn counters() {
        let mut tactics = tactics(Personality::default());
        let host = &mut tactics.host;
        host.add_structure(Structure::new(1, ME, Position::new(3, 3), StructureType::Factory));
        host.add_structure(Structure::new(2, ME, Position::new(6, 3), StructureType::Factory));
        host.add_structure(Structure::new(3, 0, Position::new(9, 3), StructureType::Factory));
        host.add_droid(Droid::new(4, ME, Position::new(1, 1), DroidType::Construct));
        host.add_droid(Droid::new(5, ME, Position::new(1, 2), DroidType::Weapon));

        assert_eq!(tactics.count_structures(ME, StructureType::Factory), 2);
        assert_eq!(tactics.count_structures(ME, StructureType::Hq), 0);
        assert_eq!(tactics.count_droids(ME, None), 2);
        assert_eq!(tactics.count_droids(ME, Some(DroidType::Construct)), 1);
    }

    #[test]
    fn readiness() {
        let mut lab = Structure::new(1, ME, Position::new(3, 3), StructureType::ResearchLab);
        assert!(structure_ready(&lab));
        lab.status = StructureStatus::BeingBuilt;
        assert!(!structure_ready(&lab));
    }

    #[test]
    fn personality_from_yaml() {
        let personality: Personality =
            serde_yaml::from_str("minBuilders: 4\nresearchPathPrimary: [R-Sys-Sensor-Upgrade00]\n")
                .unwrap();
        assert_eq!(personality.min_builders, 4);
        assert_eq!(personality.max_oilers, 4);
        assert_eq!(personality.research_path_primary.len(), 1);
    }
}
