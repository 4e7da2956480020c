use crate::targeting::{nearest_to, scan_range};
use crate::*;
use log::{debug, trace, warn};

impl<H: Host> Tactics<H> {
    /// One dispatch of `group`: cleanup, repair triage, regroup gate, target
    /// resolution and finally orders for each healthy unit.
    pub fn tick_for_group(&mut self, group: GroupId) {
        let now = self.host.game_time();
        let Some(record) = self.groups.get(group) else {
            return;
        };
        let raw_droids = self.host.enum_group(group);
        if raw_droids.is_empty() {
            if record.data.removable {
                self.stop_managing_group(group);
            }
            return;
        }
        let order = record.order;
        let regroup = record.data.regroup;
        let Some(center) = centroid(&raw_droids) else {
            return;
        };

        let healthy = self.repair_triage(group, raw_droids);
        if regroup && !healthy.is_empty() && self.regroup_gate(group, &healthy, now) {
            return;
        }

        let mut target = match order {
            GroupOrder::Attack | GroupOrder::Defend | GroupOrder::Compromise => {
                match self.pick_target(group) {
                    Some(target) => Some(target),
                    None => return,
                }
            }
            GroupOrder::Patrol => self.patrol_waypoint(group, now),
            GroupOrder::Follow => None,
        };
        let Some(record) = self.groups.get(group) else {
            return;
        };
        if record.data.react_to_attack && record.hit_within(now, self.config.react_to_attack_ms) {
            if let Some(attacker) = record.last_attacker {
                target = Some(attacker);
            }
        }
        let follow = record.data.follow.clone();
        let defend = match order {
            GroupOrder::Defend => record.data.pos.first().map(|pos| {
                (
                    *pos,
                    record.data.radius.unwrap_or(self.config.defense_radius),
                )
            }),
            _ => None,
        };

        for droid in &healthy {
            if droid.player == self.config.enemy_player {
                warn!(
                    "{} contains droid {} of player {}, not controlling it",
                    group, droid.id, droid.player
                );
                continue;
            }
            if droid.is_vtol() && self.vtol_needs_rearm(droid) {
                continue;
            }
            if let Some(follow) = &follow {
                let Some(commander) = self.host.get_object(follow.commander) else {
                    trace!("Commander of {} is gone, executing its last order", group);
                    if let Err(e) = self.manage_group(group, follow.order, follow.data.clone()) {
                        debug!("Could not re-register {}: {}", group, e);
                    }
                    return;
                };
                if droid.droid_type != DroidType::Command
                    && droid.order != DroidOrder::CommanderSupport
                {
                    self.host.order_droid_obj(
                        droid.id,
                        DroidOrder::CommanderSupport,
                        commander.id(),
                    );
                    continue;
                }
            }
            if let (Some((post, radius)), Some(target)) = (defend, target) {
                if droid.position.distance(post) > radius {
                    self.host.order_droid_loc(droid.id, DroidOrder::Move, target);
                    continue;
                }
            }
            if let Some(target) = target {
                self.engage_or_advance(droid, order, target, center);
            }
        }
    }

    /// Sends damaged units to repair and returns the rest.
    ///
    /// Units already returning for repair are in neither set.
    fn repair_triage(&mut self, group: GroupId, droids: Vec<Droid>) -> Vec<Droid> {
        let Some(record) = self.groups.get(group) else {
            return droids;
        };
        let repair = record.data.repair;
        let repair_pos = record.data.repair_pos;
        let percent = repair.unwrap_or(self.config.default_repair_percent);
        let has_facility = !self
            .host
            .enum_struct(droids[0].player, Some(StructureType::RepairFacility))
            .is_empty();
        if !has_facility && repair_pos.is_none() {
            return droids;
        }
        let mut healthy = Vec::with_capacity(droids.len());
        for droid in droids {
            if droid.order == DroidOrder::Rtr {
                continue;
            }
            let mut repairing = false;
            if has_facility {
                if repair.is_some() && droid.health < percent {
                    self.host.order_droid(droid.id, DroidOrder::Rtr);
                    repairing = true;
                }
            } else if let Some(pos) = repair_pos {
                if droid.health < percent {
                    self.host.order_droid_loc(droid.id, DroidOrder::Move, pos);
                    repairing = true;
                }
            }
            if !repairing {
                healthy.push(droid);
            }
        }
        healthy
    }

    /// Pulls stragglers towards the largest cluster. Returns `true` if that
    /// cluster is still too small to advance, in which case it was told to
    /// hold or to fall back to HQ.
    fn regroup_gate(&mut self, group: GroupId, healthy: &[Droid], now: u64) -> bool {
        let Some(record) = self.groups.get(group) else {
            return false;
        };
        let clusters = find_clusters(healthy, self.config.cluster_size);
        let Some(largest) = clusters.largest() else {
            return false;
        };
        let rally = largest.center();
        let hit_recently = record.hit_within(now, self.config.fallback_time_on_regroup_ms);
        let live = self.host.group_size(group);
        let threshold = record.regroup_threshold(live, self.config.regroup_auto_ratio);

        for (i, cluster) in clusters.clusters.iter().enumerate() {
            if i == clusters.largest_index {
                continue;
            }
            for droid in cluster.units.iter().filter(|d| d.order != DroidOrder::Rtr) {
                self.host.order_droid_loc(droid.id, DroidOrder::Move, rally);
            }
        }
        if clusters.largest_count as f32 >= threshold {
            return false;
        }
        let fall_back = hit_recently
            && !self
                .host
                .enum_struct(healthy[0].player, Some(StructureType::Hq))
                .is_empty();
        for droid in largest.units.iter().filter(|d| d.order != DroidOrder::Rtr) {
            if fall_back {
                if droid.order != DroidOrder::Rtb {
                    self.host.order_droid(droid.id, DroidOrder::Rtb);
                }
            } else if droid.order != DroidOrder::Hold {
                self.host.order_droid(droid.id, DroidOrder::Hold);
            }
        }
        true
    }

    /// Current patrol waypoint, advancing it once `interval` has passed.
    fn patrol_waypoint(&mut self, group: GroupId, now: u64) -> Option<Position> {
        let record = self.groups.get(group)?;
        let waypoints = record.data.pos.len();
        let advance = match record.last_move {
            None => None,
            Some(last) => (now.saturating_sub(last) > record.data.interval).then(|| {
                match record.data.patrol_type {
                    PatrolType::Cycle => (record.last_spot + 1) % waypoints.max(1),
                    PatrolType::Random => record.last_spot,
                }
            }),
        };
        let patrol_type = record.data.patrol_type;
        let next = match (advance, patrol_type) {
            (Some(current), PatrolType::Random) if waypoints > 1 => {
                // Any waypoint but the current one
                let pick = self.rand_below(waypoints - 1);
                Some(if pick >= current { pick + 1 } else { pick })
            }
            (advance, _) => advance,
        };

        let record = self.groups.get_mut(group)?;
        match (record.last_move, next) {
            (None, _) => {
                record.last_spot = 0;
                record.last_move = Some(now);
            }
            (Some(_), Some(spot)) => {
                record.last_spot = spot;
                record.last_move = Some(now);
            }
            _ => (),
        }
        record.data.pos.get(record.last_spot).copied()
    }

    /// VTOLs that are out of ammo, or still topping up on a pad, sit this tick out.
    fn vtol_needs_rearm(&mut self, droid: &Droid) -> bool {
        let rearming = droid.order == DroidOrder::Rearm;
        if droid.armed >= 1 && !(rearming && (droid.armed < 100 || droid.health < 100)) {
            return false;
        }
        if !rearming
            && !self
                .host
                .enum_struct(droid.player, Some(StructureType::RearmPad))
                .is_empty()
        {
            self.host.order_droid(droid.id, DroidOrder::Rearm);
        }
        true
    }

    fn engage_or_advance(
        &mut self,
        droid: &Droid,
        order: GroupOrder,
        target: Position,
        center: Position,
    ) {
        if droid.position.distance(target) < self.config.close_radius {
            return;
        }
        let defending = order == GroupOrder::Defend;
        let vtol = droid.is_vtol();
        let artillery_like = droid.is_artillery_like();
        let range = scan_range(&self.config, order, droid.droid_type);
        let close_by = self.host.enum_range(
            droid.position,
            range,
            self.config.enemy_player,
            order == GroupOrder::Compromise,
        );
        let close_z = self.config.close_z;
        // Don't chase things up or down hills unless the unit doesn't care
        let close = nearest_to(close_by, center)
            .filter(|o| vtol || artillery_like || (droid.z - o.z()).abs() <= close_z)
            .filter(|o| !(o.is_vtol_droid() && (vtol || !droid.can_hit_air)));

        match close {
            Some(obj) if !defending => {
                let engage = if droid.is_sensor() {
                    DroidOrder::Observe
                } else {
                    DroidOrder::Attack
                };
                self.host.order_droid_obj(droid.id, engage, obj.id());
            }
            _ if defending || !(artillery_like || vtol) => {
                self.host.order_droid_loc(droid.id, DroidOrder::Move, target)
            }
            _ => self.host.order_droid_loc(droid.id, DroidOrder::Scout, target),
        }
    }
}
