//! Events and the bounded event log

use std::collections::VecDeque;
use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{ClanId, IndividualId, SpeciesId, Tick};
use crate::simulation::stats::{DeathCause, SimulationStats};

/// Why a clan gained members
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthCause {
    Feeding,
    Friendly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogEvent {
    // Combat
    Hunt { hunter: String, clan: ClanId, target: String, target_clan: Option<ClanId>, distance: u32 },
    ClanAttack { attacker: String, clan: ClanId, target: String, target_clan: ClanId, killed: u32 },
    IndividualKilled { attacker: String, clan: ClanId, target: String },
    Cannibalism { species: String, clan: ClanId, food: f32 },
    ClanDestroyed { species: String, clan: ClanId },

    // Foraging and growth
    ClanFed { species: String, clan: ClanId, consumed: f32, hp_gain: f32 },
    IndividualFed { species: String, consumed: f32, hp_gain: f32 },
    ClanGrew { species: String, clan: ClanId, added: u32, cause: GrowthCause },

    // Social
    Joined { species: String, clan: ClanId, hungry: bool, population: u32 },
    Formed { species: String, clan: ClanId, members: u32 },
    Converted { species: String, clan: ClanId },
    Split { species: String, parent: ClanId, child: ClanId, parent_population: u32, child_population: u32 },
    Emigrated { species: String, clan: ClanId },
    Spawned { species: String, count: u32 },

    // Deaths
    Starvation { species: String, clan: Option<ClanId>, deaths: u32 },
    Exposure { species: String, clan: Option<ClanId>, deaths: u32, temperature: f32 },

    // Environment
    DayBegins,
    NightBegins,
    TemperatureSet { temperature: f32 },
    Chaos,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Hunt { hunter, clan, target, target_clan, distance } => match target_clan {
                Some(t) => write!(f, "{} clan #{} hunts {} clan #{} ({}px away)", hunter, clan.0, target, t.0, distance),
                None => write!(f, "{} clan #{} hunts a lone {} ({}px away)", hunter, clan.0, target, distance),
            },
            LogEvent::ClanAttack { attacker, clan, target, target_clan, killed } => write!(
                f,
                "{} clan #{} attacks {} clan #{} (-{} member{})",
                attacker, clan.0, target, target_clan.0, killed, plural(*killed)
            ),
            LogEvent::IndividualKilled { attacker, clan, target } => {
                write!(f, "{} clan #{} kills a lone {}", attacker, clan.0, target)
            }
            LogEvent::Cannibalism { species, clan, food } => {
                write!(f, "{} clan #{} feeds on its kill (+{} food)", species, clan.0, food)
            }
            LogEvent::ClanDestroyed { species, clan } => write!(f, "{} clan #{} was wiped out", species, clan.0),
            LogEvent::ClanFed { species, clan, consumed, hp_gain } => write!(
                f,
                "{} clan #{} eats {:.1} food (+{:.0} hp)",
                species, clan.0, consumed, hp_gain
            ),
            LogEvent::IndividualFed { species, consumed, hp_gain } => {
                write!(f, "A lone {} eats {:.1} food (+{:.0} hp)", species, consumed, hp_gain)
            }
            LogEvent::ClanGrew { species, clan, added, cause } => {
                let why = match cause {
                    GrowthCause::Feeding => "after eating",
                    GrowthCause::Friendly => "after a friendly encounter",
                };
                write!(f, "{} clan #{} grows {} (+{} member{})", species, clan.0, why, added, plural(*added))
            }
            LogEvent::Joined { species, clan, hungry, population } => write!(
                f,
                "A {} lone {} joins clan #{} (now {})",
                if *hungry { "hungry" } else { "friendly" },
                species,
                clan.0,
                population
            ),
            LogEvent::Formed { species, clan, members } => {
                write!(f, "{} lone {} band together as clan #{}", members, species, clan.0)
            }
            LogEvent::Converted { species, clan } => {
                write!(f, "{} clan #{} shrank to one member and goes on alone", species, clan.0)
            }
            LogEvent::Split { species, parent, child, parent_population, child_population } => write!(
                f,
                "{} clan #{} splits: #{} keeps {}, #{} leaves with {}",
                species, parent.0, parent.0, parent_population, child.0, child_population
            ),
            LogEvent::Emigrated { species, clan } => {
                write!(f, "A {} leaves clan #{} to live alone", species, clan.0)
            }
            LogEvent::Spawned { species, count } => {
                write!(f, "{} new lone {} appeared", count, species)
            }
            LogEvent::Starvation { species, clan, deaths } => match clan {
                Some(c) => write!(f, "{} {} of clan #{} starved", deaths, species, c.0),
                None => write!(f, "A lone {} starved", species),
            },
            LogEvent::Exposure { species, clan, deaths, temperature } => match clan {
                Some(c) => write!(
                    f,
                    "{} {} of clan #{} died of exposure at {:.1}°C",
                    deaths, species, c.0, temperature
                ),
                None => write!(f, "A lone {} died of exposure at {:.1}°C", species, temperature),
            },
            LogEvent::DayBegins => write!(f, "Day breaks"),
            LogEvent::NightBegins => write!(f, "Night falls"),
            LogEvent::TemperatureSet { temperature } => write!(f, "Temperature set to {:.1}°C", temperature),
            LogEvent::Chaos => write!(f, "Chaos! Every loner scatters"),
        }
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub tick: Tick,
    pub event: LogEvent,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>6}] {}", self.tick, self.event)
    }
}

/// Ring buffer of recent events; the oldest entry is dropped when full
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity.min(1024)), capacity }
    }

    pub fn push(&mut self, tick: Tick, event: LogEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { tick, event });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// What a clan is hunting, for hunt-log cooldowns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HuntTarget {
    Clan(SpeciesId, ClanId),
    Individual(IndividualId),
}

/// Everything a tick records: the event log, statistics and hunt cooldowns
#[derive(Clone, Debug)]
pub struct Chronicle {
    pub tick: Tick,
    pub log: EventLog,
    pub stats: SimulationStats,
    hunt_log: AHashMap<(SpeciesId, ClanId, HuntTarget), Tick>,
    hunt_cooldown: Tick,
}

impl Chronicle {
    pub fn new(log_capacity: usize, history_capacity: usize, sample_capacity: usize, hunt_cooldown: Tick) -> Self {
        Self {
            tick: 0,
            log: EventLog::new(log_capacity),
            stats: SimulationStats::new(history_capacity, sample_capacity),
            hunt_log: AHashMap::new(),
            hunt_cooldown,
        }
    }

    pub fn record(&mut self, event: LogEvent) {
        self.log.push(self.tick, event);
    }

    pub fn record_deaths(&mut self, cause: DeathCause, species: &str, count: u32) {
        self.stats.record_deaths(cause, species, count);
    }

    /// True when this hunt may be logged now; starts the cooldown if so
    pub fn hunt_log_due(&mut self, hunter: (SpeciesId, ClanId), target: HuntTarget) -> bool {
        let key = (hunter.0, hunter.1, target);
        match self.hunt_log.get(&key) {
            Some(&last) if self.tick.saturating_sub(last) < self.hunt_cooldown => false,
            _ => {
                self.hunt_log.insert(key, self.tick);
                true
            }
        }
    }

    /// Forget cooldowns that have expired
    pub fn prune_hunt_log(&mut self) {
        let (tick, cooldown) = (self.tick, self.hunt_cooldown);
        self.hunt_log.retain(|_, last| tick.saturating_sub(*last) < cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_drops_oldest() {
        let mut log = EventLog::new(3);
        for tick in 0..5 {
            log.push(tick, LogEvent::DayBegins);
        }
        assert_eq!(log.len(), 3);
        let ticks: Vec<_> = log.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_log_stays_empty() {
        let mut log = EventLog::new(0);
        log.push(1, LogEvent::NightBegins);
        assert!(log.is_empty());
    }

    #[test]
    fn test_hunt_log_cooldown() {
        let mut chronicle = Chronicle::new(10, 10, 10, 100);
        let hunter = (SpeciesId(0), ClanId(1));
        let target = HuntTarget::Individual(IndividualId(7));
        chronicle.tick = 5;
        assert!(chronicle.hunt_log_due(hunter, target));
        chronicle.tick = 104;
        assert!(!chronicle.hunt_log_due(hunter, target));
        assert!(chronicle.hunt_log_due(hunter, HuntTarget::Individual(IndividualId(8))));
        chronicle.tick = 105;
        assert!(chronicle.hunt_log_due(hunter, target));
    }

    #[test]
    fn test_prune_keeps_active_cooldowns() {
        let mut chronicle = Chronicle::new(10, 10, 10, 10);
        chronicle.hunt_log_due((SpeciesId(0), ClanId(1)), HuntTarget::Clan(SpeciesId(1), ClanId(2)));
        chronicle.tick = 20;
        chronicle.hunt_log_due((SpeciesId(0), ClanId(1)), HuntTarget::Clan(SpeciesId(1), ClanId(3)));
        chronicle.prune_hunt_log();
        assert_eq!(chronicle.hunt_log.len(), 1);
    }

    #[test]
    fn test_display_messages() {
        let event = LogEvent::ClanAttack {
            attacker: "Spores".into(),
            clan: ClanId(2),
            target: "Icefang".into(),
            target_clan: ClanId(5),
            killed: 1,
        };
        assert_eq!(event.to_string(), "Spores clan #2 attacks Icefang clan #5 (-1 member)");

        let entry = LogEntry { tick: 42, event: LogEvent::Starvation { species: "Icefang".into(), clan: None, deaths: 1 } };
        assert_eq!(entry.to_string(), "[    42] A lone Icefang starved");
    }
}
