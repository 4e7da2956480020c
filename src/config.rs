use crate::host::PlayerId;
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Player the campaign AI fights against.
pub const HUMAN_PLAYER: PlayerId = 0;

// Delay between two staggered group dispatches
pub const TICKS_PER_FRAME: u64 = 100;

/// Tuning knobs for the group command loop. All distances are in tiles, all
/// times in milliseconds of game time.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TacticsConfig {
    /// Whose objects are targets.
    pub enemy_player: PlayerId,
    pub tick_unit_ms: u64,
    /// Upper bound of group dispatches per `tick` call.
    pub max_dispatches_per_tick: usize,
    pub target_tracking_radius: f32,
    pub player_base_radius: f32,
    pub defense_radius: f32,
    pub close_radius: f32,
    pub cluster_size: f32,
    pub fallback_time_on_regroup_ms: u64,
    pub close_z: i32,
    pub patrol_scan_range: f32,
    pub compromise_scan_range: f32,
    pub sensor_range_factor: f32,
    pub default_repair_percent: u32,
    pub default_patrol_interval_ms: u64,
    pub regroup_auto_ratio: f32,
    pub react_to_attack_ms: u64,
    pub enemy_census_ttl_ms: u64,
    pub seed: u64,
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            enemy_player: HUMAN_PLAYER,
            tick_unit_ms: TICKS_PER_FRAME,
            max_dispatches_per_tick: 1,
            target_tracking_radius: 10.0,
            player_base_radius: 20.0,
            defense_radius: 4.0,
            close_radius: 2.0,
            cluster_size: 4.0,
            fallback_time_on_regroup_ms: 5000,
            close_z: 1,
            patrol_scan_range: 5.0,
            compromise_scan_range: 2.0,
            sensor_range_factor: 1.5,
            default_repair_percent: 66,
            default_patrol_interval_ms: 60_000,
            regroup_auto_ratio: 0.66,
            react_to_attack_ms: 5000,
            enemy_census_ttl_ms: 60_000,
            seed: 0x5747_3231,
        }
    }
}

impl TacticsConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Could not read config {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
