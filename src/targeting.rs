use crate::*;
use log::debug;
use ordered_float::OrderedFloat;

/// Something a group could go for: a live enemy object or a bare map spot.
#[derive(Clone, Debug, PartialEq)]
pub enum Candidate {
    Object(GameObject),
    Spot(Position),
}

impl Candidate {
    fn is_transporter(&self) -> bool {
        match self {
            Candidate::Object(obj) => obj.is_transporter(),
            Candidate::Spot(_) => false,
        }
    }
}

impl WithPosition for Candidate {
    fn position(&self) -> Position {
        match self {
            Candidate::Object(obj) => obj.position(),
            Candidate::Spot(pos) => *pos,
        }
    }
}

/// How far around itself a unit looks for something to shoot at, in tiles.
pub fn scan_range(config: &TacticsConfig, order: GroupOrder, droid_type: DroidType) -> f32 {
    let range = match order {
        GroupOrder::Attack | GroupOrder::Defend | GroupOrder::Follow => {
            config.target_tracking_radius
        }
        GroupOrder::Patrol => config.patrol_scan_range,
        // Small so they don't chase things far away from the compromised spot
        GroupOrder::Compromise => config.compromise_scan_range,
    };
    if droid_type == DroidType::Sensor {
        (range * config.sensor_range_factor).floor()
    } else {
        range
    }
}

/// Nearest candidate to `center`, the first one on ties.
pub fn nearest_to<T: WithPosition>(
    candidates: impl IntoIterator<Item = T>,
    center: Position,
) -> Option<T> {
    candidates
        .into_iter()
        .min_by_key(|c| OrderedFloat(c.position().distance(center)))
}

impl<H: Host> Tactics<H> {
    /// Picks where `group` should go next and caches it on the record.
    ///
    /// Returns `None` if the group is unmanaged or empty, if nothing suitable
    /// was found, or for orders that don't use targets.
    pub fn pick_target(&mut self, group: GroupId) -> Option<Position> {
        let droids = self.host.enum_group(group);
        let center = centroid(&droids)?;
        let record = self.groups.get(group)?;
        let enemy = self.config.enemy_player;
        let candidates = match record.order {
            GroupOrder::Attack | GroupOrder::Compromise => {
                let mut targets = vec![];
                if record.order == GroupOrder::Attack {
                    if let Some(last) = record.target {
                        targets = self
                            .host
                            .enum_range(last, self.config.target_tracking_radius, enemy, false)
                            .into_iter()
                            .filter(|o| o.is_structure() || !o.is_vtol_droid())
                            .map(Candidate::Object)
                            .collect();
                    }
                }
                if targets.is_empty() {
                    targets = self.scan_positions(&record.data);
                }
                if record.order == GroupOrder::Compromise && targets.is_empty() {
                    match record.data.pos.last() {
                        Some(pos) => targets.push(Candidate::Spot(*pos)),
                        None => {
                            debug!("'pos' is required for COMPROMISE order");
                            return None;
                        }
                    }
                }
                self.reachable_or_broader(&droids[0], targets)
            }
            GroupOrder::Defend => {
                let Some(&defend_pos) = record.data.pos.first() else {
                    debug!("'pos' is required for DEFEND order");
                    return None;
                };
                let radius = record.data.radius.unwrap_or(self.config.defense_radius);
                let mut targets = vec![];
                if let Some(last) = record.target {
                    if last.distance(defend_pos) < radius {
                        targets = self.host.enum_range(
                            last,
                            self.config.target_tracking_radius,
                            enemy,
                            false,
                        );
                    }
                }
                if targets.is_empty() {
                    targets = self.host.enum_range(defend_pos, radius, enemy, false);
                }
                let mut targets: Vec<_> = targets.into_iter().map(Candidate::Object).collect();
                if targets.is_empty() {
                    targets.push(Candidate::Spot(defend_pos));
                }
                targets
            }
            GroupOrder::Patrol | GroupOrder::Follow => {
                debug!("Unsupported group order {}", record.order);
                return None;
            }
        };
        let best = nearest_to(candidates, center)?;
        if best.is_transporter() {
            return None;
        }
        let pos = best.position();
        self.groups.get_mut(group)?.target = Some(pos);
        Some(pos)
    }

    /// Enemies around the configured positions, stopping at the first
    /// position that has any.
    fn scan_positions(&self, data: &OrderData) -> Vec<Candidate> {
        let radius = data.radius.unwrap_or(self.config.player_base_radius);
        data.pos
            .iter()
            .map(|pos| {
                self.host
                    .enum_range(*pos, radius, self.config.enemy_player, false)
            })
            .find(|found| !found.is_empty())
            .map(|found| found.into_iter().map(Candidate::Object).collect())
            .unwrap_or_default()
    }

    /// Keeps what `lead` can drive to. If that leaves nothing, widens to any
    /// reachable enemy structure, then ground droid, then droid at all.
    fn reachable_or_broader(&self, lead: &Droid, targets: Vec<Candidate>) -> Vec<Candidate> {
        let can_reach = |pos: Position| {
            self.host
                .propulsion_can_reach(lead.propulsion, lead.position, pos)
        };
        let targets: Vec<_> = targets
            .into_iter()
            .filter(|t| can_reach(t.position()))
            .collect();
        if !targets.is_empty() {
            return targets;
        }
        let enemy = self.config.enemy_player;
        let structures: Vec<_> = self
            .host
            .enum_struct(enemy, None)
            .into_iter()
            .filter(|s| can_reach(s.position))
            .map(|s| Candidate::Object(GameObject::Structure(s)))
            .collect();
        if !structures.is_empty() {
            return structures;
        }
        let droids: Vec<_> = self
            .host
            .enum_droid(enemy, None)
            .into_iter()
            .filter(|d| can_reach(d.position))
            .collect();
        let ground: Vec<_> = droids
            .iter()
            .filter(|d| !d.is_vtol())
            .cloned()
            .map(|d| Candidate::Object(GameObject::Droid(d)))
            .collect();
        if !ground.is_empty() {
            return ground;
        }
        droids
            .into_iter()
            .map(|d| Candidate::Object(GameObject::Droid(d)))
            .collect()
    }
}
