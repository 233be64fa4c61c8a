//! Per-species clan ownership and lifecycle
//!
//! Once per tick every species runs starvation attrition, singleton
//! conversion, emigration and splitting over its own clans. Members that
//! leave a clan come back as `Departure`s for the engine to turn into
//! individuals.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{ClanId, Color, SpeciesId, Vec2};
use crate::entity::{Clan, SpeciesTraits};

/// A member that left its clan and should continue as an individual
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub clan: ClanId,
    pub position: Vec2,
    pub hp: f32,
    pub color: Color,
    pub kind: DepartureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureKind {
    /// The clan shrank to its last member
    Converted,
    Emigrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRecord {
    pub parent: ClanId,
    pub child: ClanId,
    pub parent_population: u32,
    pub child_population: u32,
}

#[derive(Debug, Default)]
pub struct LifecycleReport {
    /// (clan, members that starved)
    pub starved: Vec<(ClanId, u32)>,
    pub departures: Vec<Departure>,
    pub splits: Vec<SplitRecord>,
    pub removed: Vec<ClanId>,
}

/// All clans of one species
#[derive(Debug, Clone)]
pub struct SpeciesPopulation {
    pub id: SpeciesId,
    pub name: String,
    pub traits: SpeciesTraits,
    pub clans: Vec<Clan>,
    next_clan_id: u32,
}

impl SpeciesPopulation {
    pub fn new(name: impl Into<String>, traits: SpeciesTraits) -> Self {
        Self {
            id: traits.species,
            name: name.into(),
            traits,
            clans: Vec::new(),
            next_clan_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ClanId {
        let id = ClanId(self.next_clan_id);
        self.next_clan_id += 1;
        id
    }

    /// Add a clan with species defaults, returns its index
    pub fn spawn_clan<R: Rng + ?Sized>(
        &mut self,
        position: Vec2,
        population: u32,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> usize {
        let id = self.allocate_id();
        self.clans.push(Clan::new(id, &self.traits, position, population, config, rng));
        self.clans.len() - 1
    }

    pub fn clan_count(&self) -> usize {
        self.clans.len()
    }

    pub fn can_add_clan(&self, config: &SimulationConfig) -> bool {
        self.clans.len() < config.max_clans_per_species
    }

    pub fn total_members(&self) -> u32 {
        self.clans.iter().map(|c| c.population).sum()
    }

    pub fn find(&self, id: ClanId) -> Option<&Clan> {
        self.clans.iter().find(|c| c.id == id)
    }

    /// Remove and return a clan
    pub fn take(&mut self, id: ClanId) -> Option<Clan> {
        let pos = self.clans.iter().position(|c| c.id == id)?;
        Some(self.clans.remove(pos))
    }

    /// Drop clans with no members left
    pub fn remove_empty(&mut self) -> Vec<ClanId> {
        let removed: Vec<ClanId> = self.clans.iter().filter(|c| c.is_empty()).map(|c| c.id).collect();
        self.clans.retain(|c| !c.is_empty());
        removed
    }

    /// The per-tick lifecycle: attrition, departures, splits, cleanup
    pub fn lifecycle<R: Rng + ?Sized>(
        &mut self,
        config: &SimulationConfig,
        width: f32,
        height: f32,
        rng: &mut R,
    ) -> LifecycleReport {
        let mut report = LifecycleReport::default();

        for clan in &mut self.clans {
            if clan.hunger_timer >= config.starvation_threshold && clan.population > 0 {
                let share = (clan.population as f32 * config.starvation_death_fraction).floor() as u32;
                let deaths = clan.kill(share.max(1));
                report.starved.push((clan.id, deaths));
            }

            if clan.population == 1 {
                clan.population = 0;
                report.departures.push(Departure {
                    clan: clan.id,
                    position: clan.position,
                    hp: clan.hp_per_member,
                    color: clan.color,
                    kind: DepartureKind::Converted,
                });
            } else if clan.population > config.emigration_min_population
                && rng.gen::<f32>() < config.emigration_chance
            {
                clan.population -= 1;
                report.departures.push(Departure {
                    clan: clan.id,
                    position: clan.position,
                    hp: clan.hp_per_member,
                    color: clan.color,
                    kind: DepartureKind::Emigrated,
                });
            }
        }

        report.splits = self.split_clans(config, width, height, false, rng);
        report.removed = self.remove_empty();
        report
    }

    /// Split chance for a clan of `population` with room for `max_members`
    ///
    /// Zero below the onset fraction, then a gaussian bump peaking at
    /// `split_max_chance` right at the cap; certain above the cap.
    pub fn split_chance(population: u32, max_members: u32, config: &SimulationConfig) -> f32 {
        if population > max_members {
            return 1.0;
        }
        let max = max_members as f32;
        let onset = max * config.split_onset_fraction;
        let span = max - onset;
        if (population as f32) < onset || span <= 0.0 {
            return 0.0;
        }
        let progress = (population as f32 - onset) / span;
        let width = config.split_curve_width.max(f32::EPSILON);
        (-(1.0 - progress).powi(2) / width).exp() * config.split_max_chance
    }

    /// Roll splits over every clan, including ones created by this pass
    ///
    /// With `mandatory_only`, clans at or below the cap are left alone.
    /// No clan splits once the species holds `max_clans_per_species` clans.
    pub fn split_clans<R: Rng + ?Sized>(
        &mut self,
        config: &SimulationConfig,
        width: f32,
        height: f32,
        mandatory_only: bool,
        rng: &mut R,
    ) -> Vec<SplitRecord> {
        let mut splits = Vec::new();
        let mut i = 0;
        while i < self.clans.len() {
            if self.clans.len() >= config.max_clans_per_species {
                break;
            }
            let (population, max_members) = (self.clans[i].population, self.clans[i].max_members);
            let mandatory = population > max_members;
            if population >= 2 && (mandatory || !mandatory_only) {
                let chance = Self::split_chance(population, max_members, config);
                if chance > 0.0 && (mandatory || rng.gen::<f32>() < chance) {
                    splits.push(self.split_at(i, config, width, height, rng));
                }
            }
            // A clan that is still over the cap gets another go
            if self.clans[i].population <= self.clans[i].max_members || self.clans[i].population < 2 {
                i += 1;
            }
        }
        splits
    }

    fn split_at<R: Rng + ?Sized>(
        &mut self,
        i: usize,
        config: &SimulationConfig,
        width: f32,
        height: f32,
        rng: &mut R,
    ) -> SplitRecord {
        let id = self.allocate_id();
        let parent = &mut self.clans[i];
        let half = parent.population / 2;
        parent.population -= half;

        let pad = config.spawn_padding;
        let offset = config.split_offset;
        let position = Vec2::new(
            (parent.position.x + rng.gen_range(-offset..=offset)).clamp(pad, (width - pad).max(pad)),
            (parent.position.y + rng.gen_range(-offset..=offset)).clamp(pad, (height - pad).max(pad)),
        );

        let mut child = parent.clone();
        child.id = id;
        child.position = position;
        child.population = half;
        child.hunger_timer = 0;
        child.seeking_food = false;
        child.accumulated_damage = 0.0;
        child.immunity_day_state = None;
        child.temperature_immune = false;
        let (lo, hi) = config.clan_hunger_threshold_range;
        child.hunger_threshold = rng.gen_range(lo..=hi);

        let record = SplitRecord {
            parent: parent.id,
            child: id,
            parent_population: parent.population,
            child_population: half,
        };
        tracing::debug!(species = %self.name, parent = record.parent.0, child = id.0, "clan split");
        self.clans.push(child);
        record
    }
}
