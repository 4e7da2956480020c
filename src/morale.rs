use crate::*;
use log::{debug, trace};

impl<H: Host> Tactics<H> {
    /// Flips ATTACK to DEFEND once too many of the baseline units died, and
    /// back again when reinforcements arrive.
    ///
    /// Losses are allowed up to `floor((100 - morale) * baseline / 100)`. A
    /// group falls back when its size drops to that value but only restores
    /// once it is strictly above it.
    pub fn check_group_morale(&mut self, group: GroupId) {
        let now = self.host.game_time();
        let size = self.host.group_size(group);
        let Some(record) = self.groups.get_mut(group) else {
            debug!("Not managing {}", group);
            return;
        };
        let Some(morale) = record.data.morale else {
            return;
        };
        let allowed = (100 - morale.min(100)) as usize * record.baseline() / 100;
        match record.order {
            GroupOrder::Attack => {
                if size > allowed {
                    return;
                }
                trace!("{} falls back", group);
                record.flip(GroupOrder::Defend);
                record.last_hit = Some(now);
            }
            GroupOrder::Defend => {
                if size <= allowed {
                    return;
                }
                trace!("{} restores", group);
                record.flip(GroupOrder::Attack);
            }
            other => {
                debug!("Group order doesn't support morale: {}", other);
                return;
            }
        }
        self.scheduler
            .schedule(group, now + self.config.tick_unit_ms);
    }
}
