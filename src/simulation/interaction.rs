//! Neighbor interactions for one tick
//!
//! Runs, in order: clan foraging and prey pursuit, individual foraging and
//! prey pursuit, clan-vs-clan encounters, clan-vs-individual encounters and
//! individual-to-clan formation. Candidates come from the spatial index and
//! are re-checked against the exact squared distance.
//!
//! Positions do not change during the pass (only velocities do), so the
//! index built before the pass stays valid. Individuals that die, join or
//! form a clan are flagged and removed once at the end.

use ordered_float::OrderedFloat;
use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::random::growth_increment;
use crate::core::types::{ClanId, ClanKey, Relation, SpeciesId, Vec2};
use crate::entity::{Clan, FoodSource, Individual};
use crate::rules::SpeciesTable;
use crate::simulation::events::{Chronicle, GrowthCause, HuntTarget, LogEvent};
use crate::simulation::population::SpeciesPopulation;
use crate::simulation::stats::DeathCause;
use crate::spatial::{EntityKinds, EntityRef, SpatialIndex};

/// Totals for one interaction pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InteractionReport {
    pub kills: u32,
    pub joins: u32,
    pub formations: u32,
    pub growth: u32,
}

/// Borrowed world state for one pass
pub struct InteractionPass<'a, R: Rng + ?Sized> {
    config: &'a SimulationConfig,
    species: &'a SpeciesTable,
    populations: &'a mut [SpeciesPopulation],
    individuals: &'a mut Vec<Individual>,
    food: &'a mut [FoodSource],
    index: &'a SpatialIndex,
    chronicle: &'a mut Chronicle,
    conversions: &'a mut Vec<(SpeciesId, ClanId)>,
    rng: &'a mut R,
    is_day: bool,
    /// Parallel to `individuals`; flagged entries are gone
    removed: Vec<bool>,
    /// Per species: some member alive at the start of the pass
    alive: Vec<bool>,
    report: InteractionReport,
    buf: Vec<EntityRef>,
}

/// Damage of one successful attack
pub fn attack_damage(config: &SimulationConfig, attacker_strength: f32, defender_strength: f32) -> f32 {
    let raw = config.attack_damage * attacker_strength / defender_strength.max(config.min_defense);
    raw.round().max(1.0)
}

/// Mutable references to two distinct elements
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i.max(j) >= items.len() {
        return None;
    }
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        Some((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(i);
        Some((&mut hi[0], &mut lo[j]))
    }
}

fn clan_pair_mut(
    populations: &mut [SpeciesPopulation],
    a: ClanKey,
    b: ClanKey,
) -> Option<(&mut Clan, &mut Clan)> {
    if a.species == b.species {
        let clans = &mut populations.get_mut(a.species.0)?.clans;
        pair_mut(clans, a.index, b.index)
    } else {
        let (pa, pb) = pair_mut(populations, a.species.0, b.species.0)?;
        Some((pa.clans.get_mut(a.index)?, pb.clans.get_mut(b.index)?))
    }
}

impl<'a, R: Rng + ?Sized> InteractionPass<'a, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a SimulationConfig,
        species: &'a SpeciesTable,
        populations: &'a mut [SpeciesPopulation],
        individuals: &'a mut Vec<Individual>,
        food: &'a mut [FoodSource],
        index: &'a SpatialIndex,
        chronicle: &'a mut Chronicle,
        conversions: &'a mut Vec<(SpeciesId, ClanId)>,
        is_day: bool,
        rng: &'a mut R,
    ) -> Self {
        let mut alive: Vec<bool> = populations.iter().map(|p| p.total_members() > 0).collect();
        for ind in individuals.iter() {
            if let Some(flag) = alive.get_mut(ind.species.0) {
                *flag = true;
            }
        }
        let removed = vec![false; individuals.len()];
        Self {
            config,
            species,
            populations,
            individuals,
            food,
            index,
            chronicle,
            conversions,
            rng,
            is_day,
            removed,
            alive,
            report: InteractionReport::default(),
            buf: Vec::new(),
        }
    }

    /// Run every interaction stage and drop removed individuals
    pub fn run(mut self) -> InteractionReport {
        self.forage_clans();
        self.forage_individuals();
        self.clan_encounters();
        self.clan_individual_encounters();
        self.form_clans();

        let removed = std::mem::take(&mut self.removed);
        let mut flags = removed.iter();
        self.individuals.retain(|_| !flags.next().copied().unwrap_or(false));
        self.report
    }

    fn name(&self, id: SpeciesId) -> &'a str {
        let species: &'a SpeciesTable = self.species;
        species.get(id).map(|s| s.name.as_str()).unwrap_or("unknown")
    }

    fn clan_keys(&self) -> Vec<ClanKey> {
        self.populations
            .iter()
            .enumerate()
            .flat_map(|(s, p)| (0..p.clans.len()).map(move |index| ClanKey { species: SpeciesId(s), index }))
            .collect()
    }

    fn clan(&self, key: ClanKey) -> &Clan {
        &self.populations[key.species.0].clans[key.index]
    }

    fn clan_mut(&mut self, key: ClanKey) -> &mut Clan {
        &mut self.populations[key.species.0].clans[key.index]
    }

    /// Position, species and cannibal flag of a live agent
    fn agent(&self, entity: EntityRef) -> Option<(Vec2, SpeciesId, bool)> {
        match entity {
            EntityRef::Clan(key) => {
                let clan = self.populations.get(key.species.0)?.clans.get(key.index)?;
                (!clan.is_empty()).then_some((clan.position, clan.species, clan.can_cannibalize))
            }
            EntityRef::Individual(i) => {
                if self.removed.get(i).copied().unwrap_or(true) {
                    return None;
                }
                let ind = self.individuals.get(i)?;
                Some((ind.position, ind.species, ind.can_cannibalize))
            }
            EntityRef::Food(_) => None,
        }
    }

    fn primary_prey_alive(&self, hunter: SpeciesId) -> bool {
        self.species
            .primary_prey(hunter)
            .iter()
            .any(|p| self.alive.get(p.0).copied().unwrap_or(false))
    }

    /// Nearest prey for a cannibalizing hunter
    ///
    /// Primary prey first; while no primary prey lives anywhere, other
    /// cannibalizing species qualify. `fallback_kinds` limits the fallback
    /// search (clans only hunt other clans opportunistically).
    fn nearest_prey(
        &mut self,
        me: EntityRef,
        species: SpeciesId,
        position: Vec2,
        radius: f32,
        fallback_kinds: EntityKinds,
    ) -> Option<Vec2> {
        let r2 = radius * radius;
        let primary = self.species.primary_prey(species);
        let mut buf = std::mem::take(&mut self.buf);

        self.index.query_into(position, radius, EntityKinds::AGENTS, &mut buf);
        let mut best = buf
            .iter()
            .filter(|e| **e != me)
            .filter_map(|e| self.agent(*e))
            .filter(|(pos, sp, _)| primary.contains(sp) && pos.distance_sq(&position) < r2)
            .map(|(pos, _, _)| pos)
            .min_by_key(|pos| OrderedFloat(pos.distance_sq(&position)));

        if best.is_none() && !self.primary_prey_alive(species) {
            self.index.query_into(position, radius, fallback_kinds, &mut buf);
            best = buf
                .iter()
                .filter(|e| **e != me)
                .filter_map(|e| self.agent(*e))
                .filter(|(pos, sp, cannibal)| *sp != species && *cannibal && pos.distance_sq(&position) < r2)
                .map(|(pos, _, _)| pos)
                .min_by_key(|pos| OrderedFloat(pos.distance_sq(&position)));
        }

        self.buf = buf;
        best
    }

    /// Nearest food source that still has food, with its squared distance
    fn nearest_food(&mut self, position: Vec2, radius: f32) -> Option<(usize, f32)> {
        let r2 = radius * radius;
        let mut buf = std::mem::take(&mut self.buf);
        self.index.query_into(position, radius, EntityKinds::FOOD, &mut buf);
        let best = buf
            .iter()
            .filter_map(|e| match e {
                EntityRef::Food(i) => Some(*i),
                _ => None,
            })
            .filter_map(|i| {
                let source = self.food.get(i)?;
                let d2 = source.position.distance_sq(&position);
                (!source.is_depleted() && d2 < r2).then_some((i, d2))
            })
            .min_by_key(|(_, d2)| OrderedFloat(*d2));
        self.buf = buf;
        best
    }

    fn grow_clan(&mut self, key: ClanKey, cause: GrowthCause) {
        let (mean, sd) = (self.config.growth_mean, self.config.growth_std_dev);
        let increment = growth_increment(&mut *self.rng, mean, sd);
        let clan = &mut self.populations[key.species.0].clans[key.index];
        let added = clan.grow(increment);
        if added == 0 {
            return;
        }
        let clan_id = clan.id;
        self.report.growth += added;
        self.chronicle.stats.samples.record_clan_growth(added);
        self.chronicle.record(LogEvent::ClanGrew {
            species: self.name(key.species).to_string(),
            clan: clan_id,
            added,
            cause,
        });
    }

    // === FORAGING ===

    fn forage_clans(&mut self) {
        let config = self.config;
        for key in self.clan_keys() {
            let clan = self.clan(key);
            if clan.is_empty() {
                continue;
            }
            let (position, cannibal, hunger, seeking) =
                (clan.position, clan.can_cannibalize, clan.hunger_timer, clan.seeking_food);

            if cannibal {
                let prey = self.nearest_prey(
                    EntityRef::Clan(key),
                    key.species,
                    position,
                    config.food_search_radius,
                    EntityKinds::CLANS,
                );
                if let Some(target) = prey {
                    if hunger >= config.chase_hunger_threshold {
                        self.clan_mut(key).move_towards(target, config.chase_steer_strength, config.max_steer_speed);
                    }
                }
            }

            let Some((food_idx, d2)) = self.nearest_food(position, config.food_search_radius) else {
                continue;
            };
            if seeking {
                let target = self.food[food_idx].position;
                self.clan_mut(key).move_towards(target, config.food_steer_strength, config.max_steer_speed);
            }
            if d2 >= config.eat_radius * config.eat_radius {
                continue;
            }

            let clan = &mut self.populations[key.species.0].clans[key.index];
            let consumed = self.food[food_idx].consume(clan.food_intake);
            if consumed <= 0.0 {
                continue;
            }
            let hp_before = clan.hp_per_member;
            clan.feed(consumed, config);
            let (clan_id, hp_gain, has_room) = (clan.id, clan.hp_per_member - hp_before, clan.remaining_capacity() > 0);
            self.chronicle.record(LogEvent::ClanFed {
                species: self.name(key.species).to_string(),
                clan: clan_id,
                consumed,
                hp_gain,
            });

            let chance = self.species.get(key.species).map_or(0.0, |s| s.feeding_growth_chance);
            if has_room && self.rng.gen::<f32>() < chance {
                self.grow_clan(key, GrowthCause::Feeding);
            }
        }
    }

    fn forage_individuals(&mut self) {
        let config = self.config;
        let radius = config.food_search_radius * config.individual_search_boost;
        for idx in 0..self.individuals.len() {
            if self.removed[idx] {
                continue;
            }
            let ind = &self.individuals[idx];
            let (position, species, cannibal, hungry) = (ind.position, ind.species, ind.can_cannibalize, ind.is_hungry());

            if cannibal {
                let prey = self.nearest_prey(EntityRef::Individual(idx), species, position, radius, EntityKinds::AGENTS);
                if let (Some(target), true) = (prey, hungry) {
                    self.individuals[idx].head_towards(target, config, &mut *self.rng);
                }
            }

            let Some((food_idx, d2)) = self.nearest_food(position, radius) else {
                continue;
            };
            if hungry {
                let target = self.food[food_idx].position;
                self.individuals[idx].head_towards(target, config, &mut *self.rng);
            }
            if d2 >= config.eat_radius * config.eat_radius {
                continue;
            }

            let ind = &mut self.individuals[idx];
            let consumed = self.food[food_idx].consume(ind.food_intake);
            if consumed <= 0.0 {
                continue;
            }
            let hp_before = ind.hp;
            ind.feed(consumed, config);
            let hp_gain = ind.hp - hp_before;
            self.chronicle.record(LogEvent::IndividualFed {
                species: self.name(species).to_string(),
                consumed,
                hp_gain,
            });
        }
    }

    // === CLAN ENCOUNTERS ===

    fn clan_encounters(&mut self) {
        let config = self.config;
        let reach = config.hunt_radius.max(config.interaction_radius).max(config.repel_radius);
        let interact2 = config.interaction_radius * config.interaction_radius;
        let mut buf = Vec::new();
        for a in self.clan_keys() {
            if self.clan(a).is_empty() {
                continue;
            }
            let position = self.clan(a).position;
            self.index.query_into(position, reach, EntityKinds::CLANS, &mut buf);
            for entity in buf.iter().copied() {
                let EntityRef::Clan(b) = entity else {
                    continue;
                };
                // Each unordered pair once; both directions are resolved inside
                if b <= a {
                    continue;
                }
                let other = self.clan(b);
                if other.is_empty() || self.clan(a).is_empty() {
                    continue;
                }
                let d2 = position.distance_sq(&other.position);
                if d2 >= reach * reach {
                    continue;
                }
                self.clan_acts_on(a, b, d2);
                self.clan_acts_on(b, a, d2);
                if d2 < interact2 {
                    self.friendly_stick(a, b);
                }
            }
        }
    }

    /// Pull two clans of friendly species toward each other, one roll per pair
    fn friendly_stick(&mut self, a: ClanKey, b: ClanKey) {
        let config = self.config;
        if a.species == b.species {
            return;
        }
        let friendly = self.clan_relation(a, b) == Relation::Friendly || self.clan_relation(b, a) == Relation::Friendly;
        if !friendly || self.rng.gen::<f32>() >= config.friendly_stick_chance {
            return;
        }
        let Some((first, second)) = clan_pair_mut(self.populations, a, b) else {
            return;
        };
        if first.is_empty() || second.is_empty() {
            return;
        }
        let (p1, p2) = (first.position, second.position);
        first.move_towards(p2, config.friendly_stick_strength, config.max_steer_speed);
        second.move_towards(p1, config.friendly_stick_strength, config.max_steer_speed);
    }

    /// Effective relation of `actor` toward `target`
    fn clan_relation(&self, actor: ClanKey, target: ClanKey) -> Relation {
        let relation = self.species.relation(actor.species, target.species);
        let (a, t) = (self.clan(actor), self.clan(target));
        if a.can_cannibalize
            && t.can_cannibalize
            && actor.species != target.species
            && !self.primary_prey_alive(actor.species)
        {
            return Relation::Aggressive;
        }
        relation
    }

    fn clan_acts_on(&mut self, actor: ClanKey, target: ClanKey, d2: f32) {
        let config = self.config;
        let relation = self.clan_relation(actor, target);
        let same_species = actor.species == target.species;
        let (attacker, victim) = (self.name(actor.species), self.name(target.species));

        let Some((a, t)) = clan_pair_mut(self.populations, actor, target) else {
            return;
        };
        if a.is_empty() || t.is_empty() {
            return;
        }
        let target_pos = t.position;

        if same_species && relation != Relation::Friendly && d2 < config.repel_radius * config.repel_radius {
            a.move_away(target_pos, config.repel_strength, config.max_steer_speed, config.min_repel_distance);
        } else if relation == Relation::Aggressive && d2 < config.hunt_radius * config.hunt_radius {
            a.move_towards(target_pos, config.hunt_steer_strength, config.max_steer_speed);
            let (hunter, prey) = ((actor.species, a.id), HuntTarget::Clan(target.species, t.id));
            if self.chronicle.hunt_log_due(hunter, prey) {
                let event = LogEvent::Hunt {
                    hunter: attacker.to_string(),
                    clan: hunter.1,
                    target: victim.to_string(),
                    target_clan: Some(t.id),
                    distance: d2.sqrt() as u32,
                };
                self.chronicle.record(event);
            }
        }

        if d2 >= config.interaction_radius * config.interaction_radius {
            return;
        }

        match relation {
            Relation::Aggressive => {
                let boosted = self.species.is_boosted_target(actor.species, target.species);
                let chance = match (boosted, self.is_day) {
                    (false, true) => config.attack_chance_day,
                    (false, false) => config.attack_chance_night,
                    (true, true) => config.boosted_attack_chance_day,
                    (true, false) => config.boosted_attack_chance_night,
                };
                if self.rng.gen::<f32>() >= chance {
                    return;
                }
                let damage = attack_damage(config, a.combat_strength, t.combat_strength);
                let killed = t.take_damage(damage);
                if killed == 0 {
                    return;
                }
                self.report.kills += killed;
                let (attacker_id, target_id, remaining) = (a.id, t.id, t.population);
                self.chronicle.record_deaths(DeathCause::Combat, victim, killed);
                tracing::debug!(attacker, victim, killed, "clan attack");
                self.chronicle.record(LogEvent::ClanAttack {
                    attacker: attacker.to_string(),
                    clan: attacker_id,
                    target: victim.to_string(),
                    target_clan: target_id,
                    killed,
                });
                if a.can_cannibalize {
                    let food = killed as f32 * config.food_per_kill;
                    let relief = (food * config.hunger_per_food).round() as u32;
                    a.hunger_timer = a.hunger_timer.saturating_sub(relief);
                    self.chronicle.record(LogEvent::Cannibalism { species: attacker.to_string(), clan: attacker_id, food });
                }
                if remaining == 0 {
                    self.chronicle.record(LogEvent::ClanDestroyed { species: victim.to_string(), clan: target_id });
                } else if remaining == 1 {
                    self.conversions.push((target.species, target_id));
                }
            }
            Relation::Friendly if same_species => {
                let chance = self.species.get(actor.species).map_or(0.0, |s| s.friendly_growth_chance);
                if a.remaining_capacity() > 0 && self.rng.gen::<f32>() < chance {
                    self.grow_clan(actor, GrowthCause::Friendly);
                }
            }
            Relation::Fearful => {
                a.move_away(target_pos, config.fear_steer_strength, config.max_steer_speed, config.min_repel_distance);
            }
            // Cross-species friendship is resolved per pair in `friendly_stick`
            Relation::Friendly | Relation::Neutral => {}
        }
    }

    fn clan_individual_encounters(&mut self) {
        let config = self.config;
        let reach = config.hunt_radius.max(config.interaction_radius);
        let (hunt2, interact2) = (config.hunt_radius * config.hunt_radius, config.interaction_radius * config.interaction_radius);
        let mut buf = Vec::new();

        for key in self.clan_keys() {
            let position = self.clan(key).position;
            self.index.query_into(position, reach, EntityKinds::INDIVIDUALS, &mut buf);
            for entity in buf.iter().copied() {
                let EntityRef::Individual(idx) = entity else {
                    continue;
                };
                if self.removed.get(idx).copied().unwrap_or(true) || self.clan(key).is_empty() {
                    continue;
                }
                let ind = &self.individuals[idx];
                let (ind_pos, ind_species) = (ind.position, ind.species);
                let d2 = position.distance_sq(&ind_pos);
                let relation = self.species.relation(key.species, ind_species);

                if relation == Relation::Aggressive && d2 < hunt2 {
                    let chase = config.chase_steer_strength;
                    let clan = self.clan_mut(key);
                    clan.move_towards(ind_pos, chase, config.max_steer_speed);
                    let hunter = (key.species, clan.id);
                    let prey = HuntTarget::Individual(self.individuals[idx].id);
                    if self.chronicle.hunt_log_due(hunter, prey) {
                        let event = LogEvent::Hunt {
                            hunter: self.name(key.species).to_string(),
                            clan: hunter.1,
                            target: self.name(ind_species).to_string(),
                            target_clan: None,
                            distance: d2.sqrt() as u32,
                        };
                        self.chronicle.record(event);
                    }
                }

                if d2 >= interact2 {
                    continue;
                }
                match relation {
                    Relation::Aggressive => self.clan_attacks_individual(key, idx),
                    Relation::Friendly if key.species == ind_species => self.individual_joins(key, idx),
                    _ => {}
                }
            }
        }
    }

    fn clan_attacks_individual(&mut self, key: ClanKey, idx: usize) {
        let config = self.config;
        let chance = if self.is_day {
            config.individual_attack_chance_day
        } else {
            config.individual_attack_chance_night
        };
        if self.rng.gen::<f32>() >= chance {
            return;
        }
        let attacker = self.name(key.species);
        let victim = self.name(self.individuals[idx].species);
        let clan = &mut self.populations[key.species.0].clans[key.index];
        let ind = &mut self.individuals[idx];
        ind.hp -= attack_damage(config, clan.combat_strength, ind.combat_strength);
        if ind.is_alive() {
            return;
        }

        self.removed[idx] = true;
        self.report.kills += 1;
        let clan_id = clan.id;
        self.chronicle.record_deaths(DeathCause::Combat, victim, 1);
        self.chronicle.record(LogEvent::IndividualKilled {
            attacker: attacker.to_string(),
            clan: clan_id,
            target: victim.to_string(),
        });
        if clan.can_cannibalize {
            let food = config.food_per_kill;
            clan.hunger_timer = clan.hunger_timer.saturating_sub((food * config.hunger_per_food).round() as u32);
            self.chronicle.record(LogEvent::Cannibalism { species: attacker.to_string(), clan: clan_id, food });
        }
    }

    fn individual_joins(&mut self, key: ClanKey, idx: usize) {
        let config = self.config;
        let hungry = self.individuals[idx].hunger_timer >= config.join_hunger_threshold;
        let chance = if hungry { config.join_chance_hungry } else { config.join_chance };
        // Overflow past max_members is resolved by the mandatory split after the pass
        if self.rng.gen::<f32>() >= chance {
            return;
        }
        self.removed[idx] = true;
        self.report.joins += 1;
        let clan = self.clan_mut(key);
        clan.population += 1;
        let (clan_id, population) = (clan.id, clan.population);
        self.chronicle.record(LogEvent::Joined {
            species: self.name(key.species).to_string(),
            clan: clan_id,
            hungry,
            population,
        });
    }

    // === FORMATION ===

    /// Let nearby individuals of one species band together, at most one new
    /// clan per species per tick
    fn form_clans(&mut self) {
        let config = self.config;
        let r2 = config.formation_radius * config.formation_radius;
        let mut buf = Vec::new();

        for s in 0..self.populations.len() {
            let species = SpeciesId(s);
            let members: Vec<usize> = (0..self.individuals.len())
                .filter(|&i| !self.removed[i] && self.individuals[i].species == species)
                .collect();
            if members.len() < 2 || !self.populations[s].can_add_clan(config) {
                continue;
            }

            for &first in &members {
                if self.removed[first] {
                    continue;
                }
                let origin = self.individuals[first].position;
                self.index.query_into(origin, config.formation_radius, EntityKinds::INDIVIDUALS, &mut buf);
                let mut group = vec![first];
                group.extend(buf.iter().filter_map(|e| match e {
                    EntityRef::Individual(j) if *j > first => Some(*j),
                    _ => None,
                }).filter(|&j| {
                    !self.removed[j]
                        && self.individuals[j].species == species
                        && self.individuals[j].position.distance_sq(&origin) < r2
                }));
                group.sort_unstable();
                group.dedup();

                if group.len() < 2 || self.rng.gen::<f32>() >= config.formation_probability {
                    continue;
                }
                self.form_clan(species, &group);
                break;
            }
        }
    }

    fn form_clan(&mut self, species: SpeciesId, group: &[usize]) {
        let count = group.len() as u32;
        let centroid = group
            .iter()
            .fold(Vec2::default(), |acc, &i| acc + self.individuals[i].position)
            * (1.0 / count as f32);
        let template = &self.individuals[group[0]];
        let (color, hp, cannibal) = (template.color, template.hp.max(1.0), template.can_cannibalize);

        let population = &mut self.populations[species.0];
        let index = population.spawn_clan(centroid, count, self.config, &mut *self.rng);
        let clan = &mut population.clans[index];
        clan.color = color;
        clan.hp_per_member = hp;
        clan.max_hp_per_member = clan.max_hp_per_member.max(hp);
        clan.can_cannibalize = cannibal;
        let clan_id = clan.id;

        for &i in group {
            self.removed[i] = true;
        }
        self.report.formations += 1;
        tracing::debug!(species = self.name(species), members = count, "clan formed");
        self.chronicle.record(LogEvent::Formed { species: self.name(species).to_string(), clan: clan_id, members: count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IndividualId;
    use crate::rules::SpeciesConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct World {
        config: SimulationConfig,
        table: SpeciesTable,
        populations: Vec<SpeciesPopulation>,
        individuals: Vec<Individual>,
        food: Vec<FoodSource>,
        chronicle: Chronicle,
        conversions: Vec<(SpeciesId, ClanId)>,
        rng: ChaCha8Rng,
    }

    impl World {
        fn new(species: Vec<SpeciesConfig>) -> Self {
            let table = SpeciesTable::new(species).unwrap();
            let populations = table
                .iter()
                .map(|(id, s)| SpeciesPopulation::new(s.name.clone(), s.traits(id)))
                .collect();
            Self {
                config: SimulationConfig::default(),
                table,
                populations,
                individuals: Vec::new(),
                food: Vec::new(),
                chronicle: Chronicle::new(100, 10, 10, 100),
                conversions: Vec::new(),
                rng: ChaCha8Rng::seed_from_u64(17),
            }
        }

        fn add_individual(&mut self, species: usize, position: Vec2) -> usize {
            let traits = self.populations[species].traits.clone();
            let id = IndividualId(self.individuals.len() as u64);
            let hp = traits.hp;
            let ind = Individual::new(id, &traits, position, hp, &self.config, &mut self.rng);
            self.individuals.push(ind);
            self.individuals.len() - 1
        }

        fn run(&mut self) -> InteractionReport {
            let mut index = SpatialIndex::new(self.config.cell_size());
            let keys: Vec<_> = self
                .populations
                .iter()
                .enumerate()
                .flat_map(|(s, p)| p.clans.iter().enumerate().map(move |(i, c)| (ClanKey { species: SpeciesId(s), index: i }, c.position)))
                .collect();
            index.rebuild(keys, &self.individuals, &self.food);
            InteractionPass::new(
                &self.config,
                &self.table,
                &mut self.populations,
                &mut self.individuals,
                &mut self.food,
                &index,
                &mut self.chronicle,
                &mut self.conversions,
                true,
                &mut self.rng,
            )
            .run()
        }
    }

    #[test]
    fn test_attack_damage_formula() {
        let config = SimulationConfig::default();
        assert_eq!(attack_damage(&config, 1.0, 1.0), 6.0);
        assert_eq!(attack_damage(&config, 1.25, 0.1), 15.0);
        assert_eq!(attack_damage(&config, 0.01, 1.0), 1.0);
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut v = vec![1, 2, 3];
        let (a, b) = pair_mut(&mut v, 2, 0).unwrap();
        std::mem::swap(a, b);
        assert_eq!(v, vec![3, 2, 1]);
        assert!(pair_mut(&mut v, 1, 1).is_none());
        assert!(pair_mut(&mut v, 1, 3).is_none());
    }

    #[test]
    fn test_clan_eats_nearby_food() {
        let mut world = World::new(vec![SpeciesConfig::new("Grazer", 10, 20.0)]);
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[0].clans[0].hunger_timer = 50;
        world.food.push(FoodSource::new(Vec2::new(305.0, 300.0), 100.0));

        world.run();
        assert_eq!(world.food[0].amount(), 97.0);
        assert_eq!(world.populations[0].clans[0].hunger_timer, 20);
    }

    #[test]
    fn test_hungry_individual_turns_toward_food() {
        let mut world = World::new(vec![SpeciesConfig::new("Grazer", 10, 20.0)]);
        let idx = world.add_individual(0, Vec2::new(100.0, 100.0));
        world.individuals[idx].hunger_timer = 400;
        world.individuals[idx].velocity = Vec2::new(0.0, -2.0);
        world.config.starvation_threshold = 1000;
        world.food.push(FoodSource::new(Vec2::new(400.0, 100.0), 50.0));

        world.run();
        let v = world.individuals[idx].velocity;
        assert!((v.x - 2.0).abs() < 1e-4);
        assert!(v.y.abs() < 1e-4);
    }

    #[test]
    fn test_formation_with_certain_probability() {
        let mut world = World::new(vec![SpeciesConfig::new("Grazer", 10, 20.0)]);
        world.config.formation_probability = 1.0;
        world.add_individual(0, Vec2::new(500.0, 300.0));
        world.add_individual(0, Vec2::new(510.0, 300.0));
        world.add_individual(0, Vec2::new(900.0, 300.0));

        let report = world.run();
        assert_eq!(report.formations, 1);
        assert_eq!(world.individuals.len(), 1);
        assert_eq!(world.populations[0].clans.len(), 1);
        let clan = &world.populations[0].clans[0];
        assert_eq!(clan.population, 2);
        assert!((clan.position.x - 505.0).abs() < 1e-4);
    }

    #[test]
    fn test_aggressive_clan_kills_weak_individual() {
        let mut hunter = SpeciesConfig::new("Hunter", 10, 30.0);
        hunter.interactions.insert("Grazer".into(), Relation::Aggressive);
        hunter.can_cannibalize = true;
        let mut world = World::new(vec![hunter, SpeciesConfig::new("Grazer", 10, 20.0)]);
        world.config.individual_attack_chance_day = 1.0;
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[0].clans[0].hunger_timer = 90;
        let idx = world.add_individual(1, Vec2::new(320.0, 300.0));
        world.individuals[idx].hp = 1.0;

        let report = world.run();
        assert_eq!(report.kills, 1);
        assert!(world.individuals.is_empty());
        assert_eq!(world.chronicle.stats.deaths.get(DeathCause::Combat, "Grazer"), 1);
        assert_eq!(world.populations[0].clans[0].hunger_timer, 40);
    }

    #[test]
    fn test_clan_combat_queues_conversion() {
        let mut hunter = SpeciesConfig::new("Hunter", 10, 30.0);
        hunter.interactions.insert("Grazer".into(), Relation::Aggressive);
        let mut world = World::new(vec![hunter, SpeciesConfig::new("Grazer", 10, 1.0)]);
        world.config.attack_chance_day = 1.0;
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[1].spawn_clan(Vec2::new(340.0, 300.0), 7, &world.config, &mut world.rng);
        // 6 damage against 1 hp members leaves one of seven
        world.populations[1].clans[0].combat_strength = 1.25;
        world.populations[0].clans[0].combat_strength = 1.25;

        world.run();
        let target = &world.populations[1].clans[0];
        assert_eq!(target.population, 1);
        assert_eq!(world.conversions, vec![(SpeciesId(1), target.id)]);
        assert_eq!(world.chronicle.stats.deaths.get(DeathCause::Combat, "Grazer"), 6);
    }

    #[test]
    fn test_fearful_clan_flees() {
        let mut grazer = SpeciesConfig::new("Grazer", 10, 20.0);
        grazer.interactions.insert("Hunter".into(), Relation::Fearful);
        let mut world = World::new(vec![grazer, SpeciesConfig::new("Hunter", 10, 20.0)]);
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[1].spawn_clan(Vec2::new(350.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[0].clans[0].velocity = Vec2::default();

        world.run();
        let v = world.populations[0].clans[0].velocity;
        assert!((v.x + 0.1).abs() < 1e-5, "flee push was {}", v.x);
        assert!(v.y.abs() < 1e-5);
    }

    #[test]
    fn test_friendly_clans_stick_together() {
        let mut grazer = SpeciesConfig::new("Grazer", 10, 20.0);
        grazer.interactions.insert("Forager".into(), Relation::Friendly);
        let mut world = World::new(vec![grazer, SpeciesConfig::new("Forager", 10, 20.0)]);
        world.config.friendly_stick_chance = 1.0;
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[1].spawn_clan(Vec2::new(350.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[0].clans[0].velocity = Vec2::default();
        world.populations[1].clans[0].velocity = Vec2::default();

        world.run();
        // One-sided friendship still pulls both clans, each by the stick strength
        let (left, right) = (world.populations[0].clans[0].velocity, world.populations[1].clans[0].velocity);
        assert!((left.x - 0.1).abs() < 1e-5 && left.y.abs() < 1e-5);
        assert!((right.x + 0.1).abs() < 1e-5 && right.y.abs() < 1e-5);
    }

    #[test]
    fn test_friendly_stick_needs_a_successful_roll() {
        let mut grazer = SpeciesConfig::new("Grazer", 10, 20.0);
        grazer.interactions.insert("Forager".into(), Relation::Friendly);
        let mut forager = SpeciesConfig::new("Forager", 10, 20.0);
        forager.interactions.insert("Grazer".into(), Relation::Friendly);
        let mut world = World::new(vec![grazer, forager]);
        world.config.friendly_stick_chance = 0.0;
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[1].spawn_clan(Vec2::new(350.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[0].clans[0].velocity = Vec2::default();
        world.populations[1].clans[0].velocity = Vec2::default();

        world.run();
        assert_eq!(world.populations[0].clans[0].velocity, Vec2::default());
        assert_eq!(world.populations[1].clans[0].velocity, Vec2::default());
    }

    #[test]
    fn test_opportunistic_cannibalism_without_primary_prey() {
        let mut a = SpeciesConfig::new("Spores", 10, 20.0);
        a.can_cannibalize = true;
        a.primary_prey = vec!["Icefang".into()];
        let mut b = SpeciesConfig::new("Corrupted", 10, 20.0);
        b.can_cannibalize = true;
        let mut world = World::new(vec![a, b, SpeciesConfig::new("Icefang", 10, 20.0)]);
        world.populations[0].spawn_clan(Vec2::new(300.0, 300.0), 4, &world.config, &mut world.rng);
        world.populations[1].spawn_clan(Vec2::new(350.0, 300.0), 4, &world.config, &mut world.rng);

        let index = SpatialIndex::new(world.config.cell_size());
        let pass = InteractionPass::new(
            &world.config,
            &world.table,
            &mut world.populations,
            &mut world.individuals,
            &mut world.food,
            &index,
            &mut world.chronicle,
            &mut world.conversions,
            true,
            &mut world.rng,
        );
        let spores = ClanKey { species: SpeciesId(0), index: 0 };
        let corrupted = ClanKey { species: SpeciesId(1), index: 0 };
        assert_eq!(pass.clan_relation(spores, corrupted), Relation::Aggressive);
    }
}
