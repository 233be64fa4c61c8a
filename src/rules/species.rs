//! Species table and region modifiers
//!
//! Every behavior that differs between species is a field here. The
//! engine never branches on a species name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{Color, Relation, SpeciesId};
use crate::entity::SpeciesTraits;

/// Color as written in TOML: `"#rrggbb"` or `[r, g, b, a]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Hex(String),
    Components(Vec<f32>),
}

impl ColorValue {
    pub fn resolve(&self) -> Option<Color> {
        match self {
            ColorValue::Hex(hex) => Color::from_hex(hex),
            ColorValue::Components(values) => Color::from_components(values),
        }
    }
}

fn default_food_intake() -> f32 {
    3.0
}

fn default_min_temp() -> f32 {
    -100.0
}

fn default_max_temp() -> f32 {
    100.0
}

fn default_feeding_growth() -> f32 {
    0.1
}

fn default_friendly_growth() -> f32 {
    0.08
}

fn default_spawn_chance() -> f32 {
    0.005
}

/// One species as configured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub max_clan_members: u32,
    pub hp: f32,
    #[serde(default = "default_food_intake")]
    pub food_intake: f32,
    #[serde(default = "default_min_temp")]
    pub min_survival_temp: f32,
    #[serde(default = "default_max_temp")]
    pub max_survival_temp: f32,
    #[serde(default)]
    pub can_cannibalize: bool,
    /// Preferred prey; while none of these are alive, any other
    /// cannibalizing species becomes fair game
    #[serde(default)]
    pub primary_prey: Vec<String>,
    #[serde(default)]
    pub color: Option<ColorValue>,
    /// Chance a clan grows after a successful meal
    #[serde(default = "default_feeding_growth")]
    pub feeding_growth_chance: f32,
    /// Chance a clan grows when meeting a friendly clan of its own species
    #[serde(default = "default_friendly_growth")]
    pub friendly_growth_chance: f32,
    /// Per-tick chance of a new individual appearing
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f32,
    /// Species this one attacks with the boosted attack table
    #[serde(default)]
    pub boosted_attack_targets: Vec<String>,
    /// Relation toward other species, by name; unlisted pairs are neutral
    #[serde(default)]
    pub interactions: BTreeMap<String, Relation>,
}

impl SpeciesConfig {
    /// Minimal config for a species; everything else at defaults
    pub fn new(name: impl Into<String>, max_clan_members: u32, hp: f32) -> Self {
        Self {
            name: name.into(),
            max_clan_members,
            hp,
            food_intake: default_food_intake(),
            min_survival_temp: default_min_temp(),
            max_survival_temp: default_max_temp(),
            can_cannibalize: false,
            primary_prey: Vec::new(),
            color: None,
            feeding_growth_chance: default_feeding_growth(),
            friendly_growth_chance: default_friendly_growth(),
            spawn_chance: default_spawn_chance(),
            boosted_attack_targets: Vec::new(),
            interactions: BTreeMap::new(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
            .as_ref()
            .and_then(ColorValue::resolve)
            .unwrap_or_default()
    }

    /// Degrees outside the survival range, 0 inside it
    pub fn temperature_excess(&self, temperature: f32) -> f32 {
        if temperature < self.min_survival_temp {
            self.min_survival_temp - temperature
        } else if temperature > self.max_survival_temp {
            temperature - self.max_survival_temp
        } else {
            0.0
        }
    }

    pub fn traits(&self, id: SpeciesId) -> SpeciesTraits {
        SpeciesTraits {
            species: id,
            color: self.color(),
            max_members: self.max_clan_members,
            hp: self.hp,
            food_intake: self.food_intake,
            can_cannibalize: self.can_cannibalize,
        }
    }

    fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(SimError::InvalidSpecies { species: self.name.clone(), reason })
        };
        if self.name.trim().is_empty() {
            return fail("name must not be empty".into());
        }
        if self.max_clan_members < 2 {
            return fail(format!("max_clan_members must be >= 2, got {}", self.max_clan_members));
        }
        if !(self.hp > 0.0) || !self.hp.is_finite() {
            return fail(format!("hp must be positive, got {}", self.hp));
        }
        if !(self.food_intake >= 0.0) {
            return fail(format!("food_intake must be >= 0, got {}", self.food_intake));
        }
        if self.min_survival_temp > self.max_survival_temp {
            return fail("min_survival_temp is above max_survival_temp".into());
        }
        for (field, chance) in [
            ("feeding_growth_chance", self.feeding_growth_chance),
            ("friendly_growth_chance", self.friendly_growth_chance),
            ("spawn_chance", self.spawn_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return fail(format!("{} must be in 0..=1, got {}", field, chance));
            }
        }
        if let Some(value) = &self.color {
            if value.resolve().is_none() {
                return fail(format!("unreadable color {:?}", value));
            }
        }
        Ok(())
    }
}

/// Modifiers applied to a native species when it rolls the region boost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeBoost {
    pub species: String,
    pub chance: f32,
    #[serde(default = "one")]
    pub hp_mult: f32,
    #[serde(default = "one")]
    pub combat_mult: f32,
    /// Added to the hunger threshold (seek food later)
    #[serde(default)]
    pub hunger_delta: i32,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    #[serde(default)]
    pub natives: Vec<NativeBoost>,
}

impl RegionConfig {
    pub fn boost_for(&self, species: &str) -> Option<&NativeBoost> {
        self.natives.iter().find(|n| n.species == species)
    }
}

/// Ordered species list; a species' position is its `SpeciesId`
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    species: Vec<SpeciesConfig>,
    by_name: BTreeMap<String, SpeciesId>,
    /// `relations[a][b]`: how `a` treats `b`
    relations: Vec<Vec<Relation>>,
    primary_prey: Vec<Vec<SpeciesId>>,
    boosted_targets: Vec<Vec<SpeciesId>>,
    regions: Vec<RegionConfig>,
}

impl SpeciesTable {
    /// Validate the configs and resolve every name reference
    ///
    /// Names in `interactions`, `primary_prey` and `boosted_attack_targets`
    /// must refer to species in the table.
    pub fn new(species: Vec<SpeciesConfig>) -> Result<Self> {
        if species.is_empty() {
            return Err(SimError::EmptySpeciesTable);
        }
        let mut by_name = BTreeMap::new();
        for (i, config) in species.iter().enumerate() {
            config.validate()?;
            if by_name.insert(config.name.clone(), SpeciesId(i)).is_some() {
                return Err(SimError::DuplicateSpecies(config.name.clone()));
            }
        }

        let resolve = |owner: &str, name: &str| -> Result<SpeciesId> {
            by_name.get(name).copied().ok_or_else(|| SimError::InvalidSpecies {
                species: owner.to_string(),
                reason: format!("refers to unknown species '{}'", name),
            })
        };

        let n = species.len();
        let mut relations = vec![vec![Relation::Neutral; n]; n];
        let mut primary_prey = Vec::with_capacity(n);
        let mut boosted_targets = Vec::with_capacity(n);
        for (i, config) in species.iter().enumerate() {
            for (other, relation) in &config.interactions {
                let j = resolve(&config.name, other)?;
                relations[i][j.0] = *relation;
            }
            primary_prey.push(
                config
                    .primary_prey
                    .iter()
                    .map(|p| resolve(&config.name, p))
                    .collect::<Result<Vec<_>>>()?,
            );
            boosted_targets.push(
                config
                    .boosted_attack_targets
                    .iter()
                    .map(|p| resolve(&config.name, p))
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        Ok(Self { species, by_name, relations, primary_prey, boosted_targets, regions: Vec::new() })
    }

    /// Attach named regions; native species must exist
    pub fn with_regions(mut self, regions: Vec<RegionConfig>) -> Result<Self> {
        for region in &regions {
            for native in &region.natives {
                if !self.by_name.contains_key(&native.species) {
                    return Err(SimError::UnknownSpecies(native.species.clone()));
                }
                if !(0.0..=1.0).contains(&native.chance) {
                    return Err(SimError::InvalidConfig(format!(
                        "region '{}': boost chance for {} must be in 0..=1",
                        region.name, native.species
                    )));
                }
            }
        }
        self.regions = regions;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesConfig> {
        self.species.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<SpeciesId> {
        self.by_name.get(name).copied()
    }

    /// Look up a species id, failing on unknown names
    pub fn require(&self, name: &str) -> Result<SpeciesId> {
        self.id_of(name).ok_or_else(|| SimError::UnknownSpecies(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &SpeciesConfig)> {
        self.species.iter().enumerate().map(|(i, s)| (SpeciesId(i), s))
    }

    pub fn relation(&self, actor: SpeciesId, target: SpeciesId) -> Relation {
        self.relations
            .get(actor.0)
            .and_then(|row| row.get(target.0))
            .copied()
            .unwrap_or_default()
    }

    pub fn primary_prey(&self, id: SpeciesId) -> &[SpeciesId] {
        self.primary_prey.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_boosted_target(&self, attacker: SpeciesId, target: SpeciesId) -> bool {
        self.boosted_targets
            .get(attacker.0)
            .is_some_and(|targets| targets.contains(&target))
    }

    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.name == name)
    }
}
