use crate::*;
use log::trace;

impl<H: Host> Tactics<H> {
    /// Entry point the host calls on its update loop.
    ///
    /// Runs a sweep when one is due, then dispatches at most
    /// `max_dispatches_per_tick` groups whose turn has come.
    pub fn tick(&mut self) {
        let now = self.host.game_time();
        if self.scheduler.sweep_due(now) {
            self.sweep(now);
        }
        for _ in 0..self.config.max_dispatches_per_tick {
            let Some(group) = self.scheduler.pop_due(now) else {
                break;
            };
            self.tick_for_group(group);
        }
    }

    /// Queues every managed group one tick unit apart and rearms behind the
    /// last one. Groups still waiting for their turn keep it. Empty removable
    /// groups are dropped instead.
    fn sweep(&mut self, now: u64) {
        let step = self.config.tick_unit_ms;
        let mut due = now + step;
        for group in self.groups.ids() {
            let removable = self
                .groups
                .get(group)
                .map(|r| r.data.removable)
                .unwrap_or(true);
            if removable && self.host.group_size(group) == 0 {
                self.stop_managing_group(group);
                continue;
            }
            self.scheduler.schedule(group, due);
            due += step;
        }
        self.scheduler.rearm(due);
    }

    /// A group lost a member.
    pub fn on_group_loss(&mut self, group: GroupId) {
        if self.groups.contains(group) {
            self.check_group_morale(group);
        }
    }

    /// One of our droids got shot. Remembers when and from where on its group.
    pub fn on_attacked(&mut self, victim: ObjectId, attacker: Option<ObjectId>) {
        let Some(GameObject::Droid(droid)) = self.host.get_object(victim) else {
            return;
        };
        let Some(group) = droid.group else {
            return;
        };
        let from = attacker
            .and_then(|id| self.host.get_object(id))
            .map(|o| o.position());
        let now = self.host.game_time();
        if let Some(record) = self.groups.get_mut(group) {
            record.last_hit = Some(now);
            if from.is_some() {
                record.last_attacker = from;
            }
        }
    }

    /// New droid left a factory. Trucks are put to work.
    pub fn on_droid_built(&mut self, droid: ObjectId) {
        let Some(GameObject::Droid(built)) = self.host.get_object(droid) else {
            return;
        };
        if built.is_truck() && built.player != self.config.enemy_player {
            let role = self.assign_truck(built.id);
            trace!("Truck {} joins the {:?} group", built.id, role);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{OrderTarget, SimWorld};

    const ME: PlayerId = 1;

    fn world_with_groups(groups: usize, size: u32) -> (SimWorld, Vec<GroupId>) {
        let mut world = SimWorld::new();
        world.set_label("post", LabelTarget::Position(Position::new(30, 30)));
        let mut next = 100;
        let groups = (0..groups)
            .map(|_| {
                let ids: Vec<_> = (0..size)
                    .map(|_| {
                        next += 1;
                        world.add_droid(Droid::new(
                            next,
                            ME,
                            Position::new(next as i32 % 50, 10),
                            DroidType::Weapon,
                        ))
                    })
                    .collect();
                world.make_group(&ids)
            })
            .collect();
        (world, groups)
    }

    fn defend() -> GroupData {
        GroupData {
            pos: Some("post".into()),
            ..Default::default()
        }
    }

    #[test]
    fn sweep_staggers_groups_one_per_tick_unit() {
        let (world, groups) = world_with_groups(3, 2);
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        for group in &groups {
            tactics
                .manage_group(*group, GroupOrder::Defend, defend())
                .unwrap();
        }
        let mut busy_ticks = 0;
        for _ in 0..10 {
            tactics.tick();
            let mut touched: Vec<_> = tactics
                .host
                .issued
                .iter()
                .filter_map(|o| tactics.host.get_object(o.droid))
                .filter_map(|o| o.as_droid().and_then(|d| d.group))
                .collect();
            touched.dedup();
            assert!(touched.len() <= 1);
            busy_ticks += touched.len();
            tactics.host.clear_issued();
            tactics.host.advance(100);
        }
        // Registration queued each group once, the first sweep found them pending
        assert_eq!(busy_ticks, 7);
        // Sweeps ran at 0, 400 and 800
        assert_eq!(tactics.scheduler.next_sweep(), 1200);
    }

    #[test]
    fn slow_host_keeps_one_dispatch_per_group() {
        let (world, groups) = world_with_groups(5, 2);
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        for group in &groups {
            tactics
                .manage_group(*group, GroupOrder::Defend, defend())
                .unwrap();
        }
        let mut dispatched = std::collections::BTreeSet::new();
        for _ in 0..300 {
            tactics.tick();
            assert!(tactics.scheduler.pending() <= tactics.groups.len());
            for order in tactics.host.issued.drain(..).collect::<Vec<_>>() {
                if let Some(GameObject::Droid(d)) = tactics.host.get_object(order.droid) {
                    dispatched.extend(d.group);
                }
            }
            tactics.host.advance(1000);
        }
        assert_eq!(dispatched.into_iter().collect::<Vec<_>>(), groups);
    }

    #[test]
    fn sweep_drops_every_empty_removable_group() {
        let (world, groups) = world_with_groups(3, 1);
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        for group in &groups {
            tactics
                .manage_group(*group, GroupOrder::Defend, defend())
                .unwrap();
        }
        tactics
            .manage_group(
                groups[2],
                GroupOrder::Defend,
                GroupData {
                    removable: Some(false),
                    ..defend()
                },
            )
            .unwrap();
        for group in &groups {
            for droid in tactics.host.enum_group(*group) {
                tactics.host.kill(droid.id);
            }
        }
        tactics.tick();
        assert_eq!(tactics.groups.ids(), vec![groups[2]]);
    }

    #[test]
    fn group_loss_checks_morale() {
        let (mut world, groups) = world_with_groups(1, 4);
        world.set_label("fallback", LabelTarget::Position(Position::new(2, 2)));
        let group = groups[0];
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        tactics
            .manage_group(
                group,
                GroupOrder::Attack,
                GroupData {
                    morale: Some(50),
                    fallback: Some("fallback".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let members = tactics.host.enum_group(group);
        tactics.host.kill(members[0].id);
        tactics.on_group_loss(group);
        assert_eq!(tactics.groups.get(group).unwrap().order, GroupOrder::Attack);
        tactics.host.kill(members[1].id);
        tactics.on_group_loss(group);
        assert_eq!(tactics.groups.get(group).unwrap().order, GroupOrder::Defend);
    }

    #[test]
    fn attacks_are_remembered_on_the_group() {
        let (mut world, groups) = world_with_groups(1, 2);
        let group = groups[0];
        let shooter = world.add_droid(Droid::new(1, 0, Position::new(20, 3), DroidType::Weapon));
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        tactics
            .manage_group(group, GroupOrder::Defend, defend())
            .unwrap();
        tactics.host.advance(700);
        let victim = tactics.host.enum_group(group)[0].id;
        tactics.on_attacked(victim, Some(shooter));
        let record = tactics.groups.get(group).unwrap();
        assert_eq!(record.last_hit, Some(700));
        assert_eq!(record.last_attacker, Some(Position::new(20, 3)));
    }

    #[test]
    fn managed_group_reacts_within_one_tick_unit() {
        let (world, groups) = world_with_groups(1, 1);
        let group = groups[0];
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        // Burn the initial sweep while nothing is managed
        tactics.tick();
        tactics.host.advance(50);
        tactics
            .manage_group(group, GroupOrder::Defend, defend())
            .unwrap();
        tactics.host.advance(100);
        tactics.tick();
        let droid = tactics.host.enum_group(group)[0].id;
        let order = tactics.host.last_order(droid).unwrap();
        assert_eq!(order.target, OrderTarget::Location(Position::new(30, 30)));
    }

    #[test]
    fn new_trucks_get_a_role() {
        let (world, _) = world_with_groups(0, 0);
        let mut tactics = Tactics::new(world, TacticsConfig::default());
        let truck = tactics.host.add_droid(Droid::new(
            9,
            ME,
            Position::new(1, 1),
            DroidType::Construct,
        ));
        tactics.on_droid_built(truck);
        let builders = tactics.tracker.builder_group().unwrap();
        assert_eq!(tactics.host.enum_group(builders).len(), 1);
    }
}
