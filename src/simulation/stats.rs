//! Aggregate statistics and random-sample history

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Combat,
    Starvation,
    Temperature,
}

/// Death tallies per cause, keyed by species name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeathStats {
    pub combat: BTreeMap<String, u32>,
    pub starvation: BTreeMap<String, u32>,
    pub temperature: BTreeMap<String, u32>,
}

impl DeathStats {
    pub fn by_cause(&self, cause: DeathCause) -> &BTreeMap<String, u32> {
        match cause {
            DeathCause::Combat => &self.combat,
            DeathCause::Starvation => &self.starvation,
            DeathCause::Temperature => &self.temperature,
        }
    }

    fn by_cause_mut(&mut self, cause: DeathCause) -> &mut BTreeMap<String, u32> {
        match cause {
            DeathCause::Combat => &mut self.combat,
            DeathCause::Starvation => &mut self.starvation,
            DeathCause::Temperature => &mut self.temperature,
        }
    }

    pub fn get(&self, cause: DeathCause, species: &str) -> u32 {
        self.by_cause(cause).get(species).copied().unwrap_or(0)
    }

    pub fn total(&self, species: &str) -> u32 {
        [DeathCause::Combat, DeathCause::Starvation, DeathCause::Temperature]
            .into_iter()
            .map(|c| self.get(c, species))
            .sum()
    }
}

/// Species counts sampled at one tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationSample {
    pub tick: Tick,
    pub counts: BTreeMap<String, u32>,
}

/// Recent random draws, kept for inspection of the stochastic parts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleHistory {
    pub food_regeneration: VecDeque<f32>,
    pub clan_growth: VecDeque<u32>,
    pub spawns: VecDeque<u32>,
    capacity: usize,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, ..Default::default() }
    }

    fn push<T>(buf: &mut VecDeque<T>, capacity: usize, value: T) {
        if capacity == 0 {
            return;
        }
        while buf.len() >= capacity {
            buf.pop_front();
        }
        buf.push_back(value);
    }

    pub fn record_food_regeneration(&mut self, amount: f32) {
        Self::push(&mut self.food_regeneration, self.capacity, amount);
    }

    pub fn record_clan_growth(&mut self, added: u32) {
        Self::push(&mut self.clan_growth, self.capacity, added);
    }

    pub fn record_spawn(&mut self, count: u32) {
        Self::push(&mut self.spawns, self.capacity, count);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Living members per species (clan members plus individuals)
    pub species_counts: BTreeMap<String, u32>,
    pub deaths: DeathStats,
    /// Highest clan count ever seen per species
    pub max_clans: BTreeMap<String, usize>,
    pub food_places: usize,
    pub population_history: VecDeque<PopulationSample>,
    history_capacity: usize,
    pub samples: SampleHistory,
}

impl SimulationStats {
    pub fn new(history_capacity: usize, sample_capacity: usize) -> Self {
        Self {
            history_capacity,
            samples: SampleHistory::new(sample_capacity),
            ..Default::default()
        }
    }

    pub fn record_deaths(&mut self, cause: DeathCause, species: &str, count: u32) {
        if count == 0 {
            return;
        }
        *self.deaths.by_cause_mut(cause).entry(species.to_string()).or_insert(0) += count;
    }

    pub fn observe_clan_count(&mut self, species: &str, clans: usize) {
        let seen = self.max_clans.entry(species.to_string()).or_insert(0);
        *seen = (*seen).max(clans);
    }

    /// Append the current species counts to the bounded history
    pub fn record_population(&mut self, tick: Tick) {
        if self.history_capacity == 0 {
            return;
        }
        while self.population_history.len() >= self.history_capacity {
            self.population_history.pop_front();
        }
        self.population_history.push_back(PopulationSample { tick, counts: self.species_counts.clone() });
    }

    pub fn total_population(&self) -> u32 {
        self.species_counts.values().sum()
    }

    /// Human-readable end-of-run report
    pub fn summary(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SimulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:>7} {:>7} {:>7} {:>7} {:>9}", "species", "alive", "combat", "starved", "exposed", "max clans")?;
        for (name, count) in &self.species_counts {
            writeln!(
                f,
                "{:<20} {:>7} {:>7} {:>7} {:>7} {:>9}",
                name,
                count,
                self.deaths.get(DeathCause::Combat, name),
                self.deaths.get(DeathCause::Starvation, name),
                self.deaths.get(DeathCause::Temperature, name),
                self.max_clans.get(name).copied().unwrap_or(0),
            )?;
        }
        write!(f, "{} food places, {} history samples", self.food_places, self.population_history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deaths_accumulates() {
        let mut stats = SimulationStats::new(10, 10);
        stats.record_deaths(DeathCause::Combat, "Icefang", 2);
        stats.record_deaths(DeathCause::Combat, "Icefang", 1);
        stats.record_deaths(DeathCause::Temperature, "Icefang", 0);
        assert_eq!(stats.deaths.get(DeathCause::Combat, "Icefang"), 3);
        assert!(stats.deaths.temperature.is_empty());
        assert_eq!(stats.deaths.total("Icefang"), 3);
    }

    #[test]
    fn test_population_history_is_bounded() {
        let mut stats = SimulationStats::new(2, 10);
        stats.species_counts.insert("Spores".into(), 4);
        for tick in [10, 20, 30] {
            stats.record_population(tick);
        }
        let ticks: Vec<_> = stats.population_history.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![20, 30]);
    }

    #[test]
    fn test_max_clans_never_decreases() {
        let mut stats = SimulationStats::new(2, 2);
        stats.observe_clan_count("Spores", 3);
        stats.observe_clan_count("Spores", 1);
        assert_eq!(stats.max_clans["Spores"], 3);
    }

    #[test]
    fn test_samples_are_bounded() {
        let mut samples = SampleHistory::new(2);
        for i in 1..=4 {
            samples.record_clan_growth(i);
        }
        assert_eq!(samples.clan_growth, VecDeque::from(vec![3, 4]));
    }

    #[test]
    fn test_summary_lists_species() {
        let mut stats = SimulationStats::new(2, 2);
        stats.species_counts.insert("Icefang".into(), 7);
        stats.record_deaths(DeathCause::Starvation, "Icefang", 2);
        let summary = stats.summary();
        assert!(summary.contains("Icefang"));
        assert!(summary.contains("food places"));
        let row = summary.lines().nth(1).unwrap();
        assert_eq!(row.split_whitespace().collect::<Vec<_>>(), vec!["Icefang", "7", "0", "2", "0", "0"]);
        assert_eq!(format!("{}", stats), summary);
    }
}
