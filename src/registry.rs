use crate::*;
use ahash::AHashMap;
use log::{debug, trace};

/// Bookkeeping for one managed group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupOrderRecord {
    pub order: GroupOrder,
    pub data: OrderData,
    /// Where the last picked target was. Only a hint, rescanned every time.
    pub target: Option<Position>,
    pub count: BaselineCount,
    /// Live group size at registration.
    pub initial_size: usize,
    pub last_move: Option<u64>,
    pub last_spot: usize,
    pub last_hit: Option<u64>,
    pub last_attacker: Option<Position>,
}

impl GroupOrderRecord {
    pub fn new(order: GroupOrder, data: OrderData, count: BaselineCount, live: usize) -> Self {
        Self {
            order,
            data,
            target: None,
            count,
            initial_size: live,
            last_move: None,
            last_spot: 0,
            last_hit: None,
            last_attacker: None,
        }
    }

    /// Denominator for morale.
    pub fn baseline(&self) -> usize {
        match self.count {
            BaselineCount::Fixed(n) => n,
            BaselineCount::Auto => self.initial_size,
        }
    }

    /// Minimum size of the largest cluster before the group may advance.
    pub fn regroup_threshold(&self, live: usize, auto_ratio: f32) -> f32 {
        match self.count {
            BaselineCount::Fixed(n) => n as f32,
            BaselineCount::Auto => live as f32 * auto_ratio,
        }
    }

    pub fn hit_within(&self, now: u64, window: u64) -> bool {
        self.last_hit
            .map(|t| now.saturating_sub(t) < window)
            .unwrap_or(false)
    }

    /// Swaps `pos` and `fallback` and switches to `order`. Applying it twice
    /// restores the original positions.
    pub fn flip(&mut self, order: GroupOrder) {
        self.order = order;
        std::mem::swap(&mut self.data.pos, &mut self.data.fallback);
    }
}

#[derive(Debug, Default)]
pub struct GroupRegistry {
    records: AHashMap<GroupId, GroupOrderRecord>,
}

impl GroupRegistry {
    pub fn get(&self, group: GroupId) -> Option<&GroupOrderRecord> {
        self.records.get(&group)
    }

    pub fn get_mut(&mut self, group: GroupId) -> Option<&mut GroupOrderRecord> {
        self.records.get_mut(&group)
    }

    pub fn insert(
        &mut self,
        group: GroupId,
        record: GroupOrderRecord,
    ) -> Option<GroupOrderRecord> {
        self.records.insert(group, record)
    }

    pub fn remove(&mut self, group: GroupId) -> Option<GroupOrderRecord> {
        self.records.remove(&group)
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.records.contains_key(&group)
    }

    /// Managed group ids in ascending order.
    pub fn ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<_> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &GroupOrderRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<H: Host> Tactics<H> {
    /// Starts (or replaces) managing `group` under `order`.
    ///
    /// The new order is dispatched on the next tick unit.
    pub fn manage_group(
        &mut self,
        group: GroupId,
        order: GroupOrder,
        raw: GroupData,
    ) -> Result<(), FailureReason> {
        let data = OrderData::normalize(order, &raw, &self.host, &self.config)?;
        let live = self.host.group_size(group);
        let count = OrderData::count(&raw, live);
        if let Some(previous) = self.groups.get(group) {
            if previous.order != order {
                trace!("{} receives a new order: {}", group, order);
            }
        }
        let follow = data.follow.clone();
        self.groups
            .insert(group, GroupOrderRecord::new(order, data, count, live));
        if let Some(follow) = follow {
            let commander_group = self.host.new_group();
            self.host.group_add_droid(commander_group, follow.commander);
            self.manage_group(commander_group, follow.order, follow.data)?;
        }
        let due = self.host.game_time() + self.config.tick_unit_ms;
        self.scheduler.schedule(group, due);
        Ok(())
    }

    pub fn stop_managing_group(&mut self, group: GroupId) {
        self.scheduler.cancel(group);
        if self.groups.remove(group).is_some() {
            trace!("Cease managing {}", group);
        } else {
            debug!("Not managing {} anyway", group);
        }
    }
}
