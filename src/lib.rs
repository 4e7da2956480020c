//! Group tactics for scripted Warzone 2100 opponents.
//!
//! Mission and AI scripts hand groups of droids to [`Tactics`] together with a
//! high level [`GroupOrder`]. A staggered sweep then re-evaluates every managed
//! group and issues unit level orders through the [`Host`] trait.
pub mod cluster;
pub mod config;
pub mod events;
pub mod host;
pub mod morale;
pub mod order;
pub mod position;
pub mod registry;
pub mod scheduler;
pub mod sim;
pub mod squad;
pub mod targeting;
pub mod tracker;

pub use cluster::*;
pub use config::*;
pub use host::*;
pub use order::*;
pub use position::*;
pub use registry::*;
pub use scheduler::*;
pub use tracker::*;

use derive_more::Display;
use oorandom::Rand32;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Display)]
pub enum FailureReason {
    #[display(fmt = "'pos' is required for {} order", _0)]
    MissingPosition(GroupOrder),
    #[display(fmt = "'fallback' is required when 'morale' is set")]
    MissingFallback,
    #[display(fmt = "FOLLOW requires a commander 'droid'")]
    MissingCommander,
    #[display(fmt = "unknown label '{}'", _0)]
    UnknownLabel(String),
    #[display(fmt = "no object with id {}", _0)]
    UnknownObject(ObjectId),
    #[display(fmt = "morale must be within 1..=100, got {}", _0)]
    InvalidMorale(u32),
    #[display(fmt = "repair must be within 0..=100, got {}", _0)]
    InvalidRepair(u32),
    #[display(fmt = "PATROL needs at least one position")]
    EmptyPatrol,
    #[display(fmt = "unknown group order {}", _0)]
    UnknownOrder(String),
    Misc(Cow<'static, str>),
}

impl FailureReason {
    pub fn misc(reason: impl Into<Cow<'static, str>>) -> FailureReason {
        FailureReason::Misc(reason.into())
    }
}

impl std::error::Error for FailureReason {}

pub struct Tactics<H: Host> {
    pub host: H,
    pub groups: GroupRegistry,
    pub scheduler: Scheduler,
    pub config: TacticsConfig,
    pub tracker: Tracker,
    rng: Rand32,
}

impl<H: Host> Tactics<H> {
    pub fn new(host: H, config: TacticsConfig) -> Self {
        let rng = Rand32::new(config.seed);
        let now = host.game_time();
        Self {
            host,
            groups: GroupRegistry::default(),
            scheduler: Scheduler::starting_at(now),
            config,
            tracker: Tracker::default(),
            rng,
        }
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.tracker = Tracker::new(personality);
        self
    }

    /// Forgets all managed groups and pending dispatches, e.g. at match end.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.scheduler = Scheduler::starting_at(self.host.game_time());
        self.tracker.forget();
        self.rng = Rand32::new(self.config.seed);
    }

    pub(crate) fn rand_below(&mut self, n: usize) -> usize {
        self.rng.rand_range(0..n as u32) as usize
    }
}
