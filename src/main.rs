//! Replays a skirmish scenario against the in-memory host and prints every
//! order the tactics layer issued.
//!
//! Usage: `wz_tactics [scenario.yaml [config.yaml]]`. A config file replaces
//! the scenario's `config` section.
use anyhow::Context;
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::collections::BTreeMap;
use wz_tactics::sim::SimWorld;
use wz_tactics::*;

const DEFAULT_SCENARIO: &str = include_str!("../demos/skirmish.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioGroup {
    droids: Vec<ObjectId>,
    order: GroupOrder,
    #[serde(default)]
    data: GroupData,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ScenarioEvent {
    Kill {
        at: u64,
        droid: ObjectId,
    },
    Attacked {
        at: u64,
        victim: ObjectId,
        attacker: Option<ObjectId>,
    },
    Built {
        at: u64,
        droid: Droid,
    },
}

impl ScenarioEvent {
    fn at(&self) -> u64 {
        match self {
            ScenarioEvent::Kill { at, .. }
            | ScenarioEvent::Attacked { at, .. }
            | ScenarioEvent::Built { at, .. } => *at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct Scenario {
    #[serde(default)]
    config: TacticsConfig,
    #[serde(default)]
    personality: Personality,
    #[serde(default)]
    labels: BTreeMap<String, LabelTarget>,
    #[serde(default)]
    droids: Vec<Droid>,
    #[serde(default)]
    structures: Vec<Structure>,
    #[serde(default)]
    research: Vec<String>,
    #[serde(default)]
    groups: Vec<ScenarioGroup>,
    #[serde(default)]
    events: Vec<ScenarioEvent>,
    duration_ms: u64,
}

fn load_scenario() -> anyhow::Result<Scenario> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Could not read scenario {}", path))?;
            serde_yaml::from_str(&text).with_context(|| format!("Invalid scenario {}", path))
        }
        None => serde_yaml::from_str(DEFAULT_SCENARIO).context("Invalid built-in scenario"),
    }
}

fn build_world(scenario: &mut Scenario) -> SimWorld {
    let mut world = SimWorld::new();
    for (label, target) in std::mem::take(&mut scenario.labels) {
        world.set_label(label, target);
    }
    for droid in scenario.droids.drain(..) {
        world.add_droid(droid);
    }
    for structure in scenario.structures.drain(..) {
        world.add_structure(structure);
    }
    for research in scenario.research.drain(..) {
        world.add_research(research);
    }
    world
}

fn apply_event(tactics: &mut Tactics<SimWorld>, event: ScenarioEvent) {
    match event {
        ScenarioEvent::Kill { droid, .. } => {
            let group = tactics
                .host
                .get_object(droid)
                .and_then(|o| o.as_droid().and_then(|d| d.group));
            tactics.host.kill(droid);
            debug!("Droid {} destroyed", droid);
            if let Some(group) = group {
                tactics.on_group_loss(group);
            }
        }
        ScenarioEvent::Attacked {
            victim, attacker, ..
        } => tactics.on_attacked(victim, attacker),
        ScenarioEvent::Built { droid, .. } => {
            let id = tactics.host.add_droid(droid);
            tactics.on_droid_built(id);
        }
    }
}

fn main() -> anyhow::Result<()> {
    TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut scenario = load_scenario()?;
    if let Some(path) = std::env::args().nth(2) {
        scenario.config = TacticsConfig::load(path)?;
    }
    let me = scenario
        .droids
        .iter()
        .map(|d| d.player)
        .find(|p| *p != scenario.config.enemy_player);
    let world = build_world(&mut scenario);
    let config = std::mem::take(&mut scenario.config);
    let mut tactics =
        Tactics::new(world, config).with_personality(std::mem::take(&mut scenario.personality));

    for group in std::mem::take(&mut scenario.groups) {
        let id = tactics.host.make_group(&group.droids);
        tactics
            .manage_group(id, group.order, group.data)
            .with_context(|| format!("Could not manage {}", id))?;
        info!("Managing {} under {}", id, group.order);
    }

    let mut events = std::mem::take(&mut scenario.events);
    events.sort_by_key(ScenarioEvent::at);
    let mut events = events.into_iter().peekable();
    let step = tactics.config.tick_unit_ms.max(1);
    let research_player = me.unwrap_or(HUMAN_PLAYER + 1);
    while tactics.host.game_time() <= scenario.duration_ms {
        let now = tactics.host.game_time();
        while let Some(event) = events.next_if(|e| e.at() <= now) {
            apply_event(&mut tactics, event);
        }
        tactics.tick();
        if now % (step * TICKS_PER_FRAME) == 0 {
            tactics.balance_trucks();
            let started = tactics.do_research(research_player);
            if started > 0 {
                debug!("{} labs started research", started);
            }
        }
        tactics.host.advance(step);
    }

    info!(
        "{} orders issued to {} groups",
        tactics.host.issued.len(),
        tactics.groups.len()
    );
    print!("{}", serde_yaml::to_string(&tactics.host.issued)?);
    Ok(())
}
