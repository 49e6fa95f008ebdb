//! Trait and behavior allocation for a fixed population.
//!
//! Two weighted catalogs drive agent setup: twelve trait profiles
//! (training x familiarity x perception) and six behavior archetypes. For
//! a population of `P` agents the allocator turns each catalog's weights
//! into integer counts that sum to exactly `P`, materializes a flat pool by
//! repetition, and shuffles it so adjacent agents are not correlated.
//!
//! Counting follows one of two [`RoundingPolicy`] values:
//!
//! - [`RoundingPolicy::LastEntry`] rounds every entry but the last
//!   (half to even) and gives the last entry whatever is left.
//! - [`RoundingPolicy::LargestRemainder`] floors every quota and hands the
//!   leftover units to the largest fractional parts.
//!
//! Whether the pools are used at all is decided by [`EnforcementMode`].

use evac_types::{AgentTraits, FamiliarityLevel, ShooterPerceptionLevel, TrainingLevel};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tolerance for a weight vector to count as summing to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Errors that abort population setup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocatorError {
    /// A catalog has no entries.
    #[error("{catalog} catalog is empty")]
    EmptyCatalog {
        /// Which catalog.
        catalog: &'static str,
    },

    /// A weight is negative or not a finite number.
    #[error("{catalog} weight {index} is invalid: {weight}")]
    InvalidWeight {
        /// Which catalog.
        catalog: &'static str,
        /// Position of the bad weight.
        index: usize,
        /// The bad weight.
        weight: f64,
    },

    /// The weights add up to zero or less.
    #[error("{catalog} weights sum to {sum}, cannot normalize")]
    NonPositiveWeightSum {
        /// Which catalog.
        catalog: &'static str,
        /// The sum.
        sum: f64,
    },

    /// Rounded counts of the leading entries already exceed the population.
    #[error("{catalog} rounded counts total {assigned}, exceeding population {population}")]
    RoundingOverflow {
        /// Which catalog.
        catalog: &'static str,
        /// Sum of the leading counts.
        assigned: usize,
        /// Requested population.
        population: usize,
    },

    /// A pool ended up smaller than the population.
    #[error("{catalog} pool has {pool} entries for {population} agents")]
    InsufficientPool {
        /// Which catalog.
        catalog: &'static str,
        /// Pool size.
        pool: usize,
        /// Requested population.
        population: usize,
    },

    /// A replacement weight vector has the wrong length.
    #[error("{catalog} weight vector has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Which catalog.
        catalog: &'static str,
        /// Catalog size.
        expected: usize,
        /// Provided length.
        actual: usize,
    },
}

/// Which allocator pool, if any, drives agent settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Every agent gets Low/Low/Direct and no forced instruction.
    #[default]
    #[serde(rename = "none")]
    NoEnforcing,
    /// Every agent gets Low/High/Direct plus an instruction from the
    /// behavior pool.
    Explicit,
    /// Every agent gets the trait profile from the trait pool.
    Implicit,
}

/// How fractional counts are turned into integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round all but the last entry; the last absorbs the remainder.
    #[default]
    LastEntry,
    /// Floor every quota, then distribute by largest fractional part.
    LargestRemainder,
}

/// One weighted trait profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitProfile {
    /// The trait levels.
    pub traits: AgentTraits,
    /// Relative weight.
    pub weight: f64,
}

/// One weighted behavior archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Short label, e.g. `Hide in place`.
    pub behavior_type: String,
    /// Instruction text forced onto agents in explicit mode.
    pub instruction: String,
    /// Relative weight.
    pub weight: f64,
}

/// Settings handed to one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Trait levels.
    pub traits: AgentTraits,
    /// Forced behavior instruction, if any.
    pub instruction: Option<String>,
}

/// Both shuffled pools for one population.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// One trait profile per agent.
    pub trait_pool: Vec<AgentTraits>,
    /// One instruction per agent.
    pub behavior_pool: Vec<String>,
    /// Count per trait profile, in catalog order.
    pub trait_counts: Vec<usize>,
    /// Count per behavior archetype, in catalog order.
    pub behavior_counts: Vec<usize>,
}

impl Allocation {
    /// Settings for agent `index` under `mode`.
    ///
    /// Returns `None` when `index` is outside the population.
    pub fn settings_for(&self, index: usize, mode: EnforcementMode) -> Option<AgentSettings> {
        let traits = *self.trait_pool.get(index)?;
        let instruction = self.behavior_pool.get(index)?;
        Some(match mode {
            EnforcementMode::NoEnforcing => AgentSettings {
                traits: AgentTraits {
                    training_level: TrainingLevel::Low,
                    familiarity_level: FamiliarityLevel::Low,
                    shooter_perception_level: ShooterPerceptionLevel::Direct,
                },
                instruction: None,
            },
            EnforcementMode::Explicit => AgentSettings {
                traits: AgentTraits {
                    training_level: TrainingLevel::Low,
                    familiarity_level: FamiliarityLevel::High,
                    shooter_perception_level: ShooterPerceptionLevel::Direct,
                },
                instruction: Some(instruction.clone()),
            },
            EnforcementMode::Implicit => AgentSettings {
                traits,
                instruction: None,
            },
        })
    }
}

/// Serializable view of both catalogs with their counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    /// Trait catalog rows.
    pub trait_distributions: Vec<TraitDistributionRow>,
    /// Behavior catalog rows.
    pub behavior_distributions: Vec<BehaviorDistributionRow>,
}

/// One trait catalog row of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDistributionRow {
    /// Training level.
    pub training_level: TrainingLevel,
    /// Familiarity level.
    pub familiarity_level: FamiliarityLevel,
    /// Shooter perception level.
    pub shooter_perception_level: ShooterPerceptionLevel,
    /// Normalized weight.
    pub weight: f64,
    /// Agents that received this profile.
    pub calculated_count: usize,
}

/// One behavior catalog row of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDistributionRow {
    /// Behavior label.
    pub behavior_type: String,
    /// Instruction text.
    pub instruction: String,
    /// Normalized weight.
    pub weight: f64,
    /// Agents that received this behavior.
    pub calculated_count: usize,
}

// ---------------------------------------------------------------------------
// Default catalogs
// ---------------------------------------------------------------------------

const fn profile(
    training_level: TrainingLevel,
    familiarity_level: FamiliarityLevel,
    shooter_perception_level: ShooterPerceptionLevel,
    weight: f64,
) -> TraitProfile {
    TraitProfile {
        traits: AgentTraits {
            training_level,
            familiarity_level,
            shooter_perception_level,
        },
        weight,
    }
}

/// The twelve trait profiles, weighted by the survey distribution.
pub fn default_trait_profiles() -> Vec<TraitProfile> {
    use FamiliarityLevel as F;
    use ShooterPerceptionLevel as S;
    use TrainingLevel as T;
    vec![
        profile(T::High, F::High, S::Direct, 0.252),
        profile(T::High, F::High, S::Vague, 0.01),
        profile(T::High, F::High, S::Unaware, 0.01),
        profile(T::High, F::Low, S::Direct, 0.01),
        profile(T::High, F::Low, S::Vague, 0.01),
        profile(T::High, F::Low, S::Unaware, 0.01),
        profile(T::Low, F::High, S::Direct, 0.01),
        profile(T::Low, F::High, S::Vague, 0.208),
        profile(T::Low, F::High, S::Unaware, 0.01),
        profile(T::Low, F::Low, S::Direct, 0.01),
        profile(T::Low, F::Low, S::Vague, 0.252),
        profile(T::Low, F::Low, S::Unaware, 0.208),
    ]
}

fn behavior(behavior_type: &str, instruction: &str, weight: f64) -> BehaviorProfile {
    BehaviorProfile {
        behavior_type: behavior_type.to_owned(),
        instruction: instruction.to_owned(),
        weight,
    }
}

/// The six behavior archetypes observed in active-shooter incidents.
pub fn default_behavior_profiles() -> Vec<BehaviorProfile> {
    vec![
        behavior(
            "Run following a crowd",
            "This behavior involves fleeing alongside a group, driven by the instinct to follow \
             others without independently evaluating the safest route. The individual may be \
             overwhelmed and default to the crowd's direction out of panic or uncertainty, \
             relying on others' actions instead of personal judgment.",
            0.28,
        ),
        behavior(
            "Hide in place",
            "The person immediately takes cover wherever they currently are, often due to the \
             belief that movement would increase danger or because they are unable to assess a \
             safer location. This behavior may stem from fear, confusion, or limited knowledge \
             of the environment, leading to a decision to conceal rather than flee.",
            0.26,
        ),
        behavior(
            "Run then hide",
            "This response begins with the person running away from the immediate threat and \
             then transitioning to hiding once they feel a degree of separation from danger. It \
             reflects a blend of instinctive flight and strategic thinking, where the person \
             adapts their response as the situation evolves, often choosing concealment when \
             escape routes narrow or become unsafe.",
            0.12,
        ),
        behavior(
            "Run independently",
            "In this behavior, the person flees the scene in a direction they determine \
             independently of the crowd, often based on quick environmental assessment or prior \
             knowledge of the area. This reflects a high level of situational awareness, \
             personal decisiveness, and the ability to think critically under pressure.",
            0.12,
        ),
        behavior(
            "Freeze",
            "The person becomes mentally and physically immobilized, unable to act due to \
             overwhelming fear or shock. This involuntary reaction, often referred to as tonic \
             immobility, results from cognitive overload and can prevent any attempt to run, \
             hide, or fight, despite imminent danger.",
            0.12,
        ),
        behavior(
            "Fight",
            "This behavior involves actively attempting to confront, disarm, or incapacitate \
             the shooter, typically as a last resort when no other options are viable. It may \
             arise from a survival instinct, protective impulse (especially toward others), or \
             previous training that enables the person to override fear and engage in direct \
             action.",
            0.10,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

/// Validate `weights` and scale them to sum to one.
///
/// A sum off by more than [`WEIGHT_SUM_TOLERANCE`] is normalized with a
/// warning.
///
/// # Errors
///
/// Returns [`AllocatorError`] for an empty vector, a negative or
/// non-finite weight, or a non-positive sum.
pub fn normalize_weights(catalog: &'static str, weights: &[f64]) -> Result<Vec<f64>, AllocatorError> {
    if weights.is_empty() {
        return Err(AllocatorError::EmptyCatalog { catalog });
    }
    for (index, &weight) in weights.iter().enumerate() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AllocatorError::InvalidWeight {
                catalog,
                index,
                weight,
            });
        }
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(AllocatorError::NonPositiveWeightSum { catalog, sum });
    }
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        warn!(catalog, sum, "weights do not sum to 1, normalizing");
        return Ok(weights.iter().map(|w| w / sum).collect());
    }
    Ok(weights.to_vec())
}

/// `weight * population`, as a float quota.
#[allow(clippy::cast_precision_loss)]
fn quota(weight: f64, population: usize) -> f64 {
    weight * population as f64
}

/// Convert a non-negative, finite, already rounded float to a count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> usize {
    if value <= 0.0 { 0 } else { value as usize }
}

/// Integer counts per entry that sum to exactly `population`.
///
/// `weights` must already be normalized.
///
/// # Errors
///
/// Returns [`AllocatorError::RoundingOverflow`] when, under
/// [`RoundingPolicy::LastEntry`], the rounded leading counts alone exceed
/// the population.
pub fn compute_counts(
    catalog: &'static str,
    weights: &[f64],
    population: usize,
    rounding: RoundingPolicy,
) -> Result<Vec<usize>, AllocatorError> {
    match rounding {
        RoundingPolicy::LastEntry => last_entry_counts(catalog, weights, population),
        RoundingPolicy::LargestRemainder => Ok(largest_remainder_counts(weights, population)),
    }
}

fn last_entry_counts(
    catalog: &'static str,
    weights: &[f64],
    population: usize,
) -> Result<Vec<usize>, AllocatorError> {
    let Some((_, leading)) = weights.split_last() else {
        return Err(AllocatorError::EmptyCatalog { catalog });
    };
    let mut counts: Vec<usize> = leading
        .iter()
        .map(|&w| to_count(quota(w, population).round_ties_even()))
        .collect();
    let assigned = counts.iter().fold(0usize, |acc, &c| acc.saturating_add(c));
    let Some(remainder) = population.checked_sub(assigned) else {
        return Err(AllocatorError::RoundingOverflow {
            catalog,
            assigned,
            population,
        });
    };
    counts.push(remainder);
    Ok(counts)
}

fn largest_remainder_counts(weights: &[f64], population: usize) -> Vec<usize> {
    let quotas: Vec<f64> = weights.iter().map(|&w| quota(w, population)).collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| to_count(q.floor())).collect();
    let assigned = counts.iter().fold(0usize, |acc, &c| acc.saturating_add(c));
    let mut leftover = population.saturating_sub(assigned);

    // Stable sort keeps catalog order among equal fractions.
    let mut by_fraction: Vec<(usize, f64)> = quotas
        .iter()
        .enumerate()
        .map(|(i, q)| (i, q - q.floor()))
        .collect();
    by_fraction.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (index, _) in by_fraction.into_iter().cycle() {
        if leftover == 0 {
            break;
        }
        if let Some(count) = counts.get_mut(index) {
            *count = count.saturating_add(1);
            leftover = leftover.saturating_sub(1);
        }
    }
    counts
}

/// Repeat each item `count` times, pad with the first item up to
/// `population`, then shuffle in place.
///
/// # Errors
///
/// Returns [`AllocatorError::InsufficientPool`] if the pool is still short
/// after padding, which only happens for an empty catalog.
pub fn build_pool<T: Clone, R: Rng + ?Sized>(
    catalog: &'static str,
    items: &[T],
    counts: &[usize],
    population: usize,
    rng: &mut R,
) -> Result<Vec<T>, AllocatorError> {
    let mut pool: Vec<T> = Vec::with_capacity(population);
    for (item, &count) in items.iter().zip(counts) {
        pool.extend(std::iter::repeat_n(item.clone(), count));
    }
    if pool.len() < population {
        if let Some(first) = items.first() {
            let missing = population.saturating_sub(pool.len());
            warn!(catalog, missing, "pool short after rounding, padding with first entry");
            pool.extend(std::iter::repeat_n(first.clone(), missing));
        }
    }
    if pool.len() < population {
        return Err(AllocatorError::InsufficientPool {
            catalog,
            pool: pool.len(),
            population,
        });
    }
    // Fisher-Yates.
    pool.shuffle(rng);
    Ok(pool)
}

// ---------------------------------------------------------------------------
// TraitAllocator
// ---------------------------------------------------------------------------

/// Owns both catalogs and produces allocations from them.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitAllocator {
    traits: Vec<TraitProfile>,
    behaviors: Vec<BehaviorProfile>,
    rounding: RoundingPolicy,
}

impl Default for TraitAllocator {
    fn default() -> Self {
        Self::new(default_trait_profiles(), default_behavior_profiles())
    }
}

impl TraitAllocator {
    const TRAITS: &'static str = "trait";
    const BEHAVIORS: &'static str = "behavior";

    /// Create an allocator over the given catalogs with
    /// [`RoundingPolicy::LastEntry`].
    pub const fn new(traits: Vec<TraitProfile>, behaviors: Vec<BehaviorProfile>) -> Self {
        Self {
            traits,
            behaviors,
            rounding: RoundingPolicy::LastEntry,
        }
    }

    /// Builder-style: set the rounding policy.
    #[must_use]
    pub const fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    /// The trait catalog.
    pub fn trait_profiles(&self) -> &[TraitProfile] {
        &self.traits
    }

    /// The behavior catalog.
    pub fn behavior_profiles(&self) -> &[BehaviorProfile] {
        &self.behaviors
    }

    /// Current trait weights in catalog order.
    pub fn trait_weights(&self) -> Vec<f64> {
        self.traits.iter().map(|p| p.weight).collect()
    }

    /// Current behavior weights in catalog order.
    pub fn behavior_weights(&self) -> Vec<f64> {
        self.behaviors.iter().map(|b| b.weight).collect()
    }

    /// Replace the trait weights.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::LengthMismatch`] if the vector length
    /// differs from the catalog size.
    pub fn set_trait_weights(&mut self, weights: &[f64]) -> Result<(), AllocatorError> {
        if weights.len() != self.traits.len() {
            return Err(AllocatorError::LengthMismatch {
                catalog: Self::TRAITS,
                expected: self.traits.len(),
                actual: weights.len(),
            });
        }
        for (profile, &w) in self.traits.iter_mut().zip(weights) {
            profile.weight = w;
        }
        Ok(())
    }

    /// Replace the behavior weights.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::LengthMismatch`] if the vector length
    /// differs from the catalog size.
    pub fn set_behavior_weights(&mut self, weights: &[f64]) -> Result<(), AllocatorError> {
        if weights.len() != self.behaviors.len() {
            return Err(AllocatorError::LengthMismatch {
                catalog: Self::BEHAVIORS,
                expected: self.behaviors.len(),
                actual: weights.len(),
            });
        }
        for (behavior, &w) in self.behaviors.iter_mut().zip(weights) {
            behavior.weight = w;
        }
        Ok(())
    }

    /// Compute counts for both catalogs.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError`] for any invalid catalog.
    pub fn counts(&self, population: usize) -> Result<(Vec<usize>, Vec<usize>), AllocatorError> {
        let trait_weights = normalize_weights(Self::TRAITS, &self.trait_weights())?;
        let behavior_weights = normalize_weights(Self::BEHAVIORS, &self.behavior_weights())?;
        Ok((
            compute_counts(Self::TRAITS, &trait_weights, population, self.rounding)?,
            compute_counts(Self::BEHAVIORS, &behavior_weights, population, self.rounding)?,
        ))
    }

    /// Build both shuffled pools for `population` agents.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError`] for any invalid catalog. These are setup
    /// errors; callers should abort before spawning agents.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        population: usize,
        rng: &mut R,
    ) -> Result<Allocation, AllocatorError> {
        let (trait_counts, behavior_counts) = self.counts(population)?;

        let trait_items: Vec<AgentTraits> = self.traits.iter().map(|p| p.traits).collect();
        let trait_pool = build_pool(Self::TRAITS, &trait_items, &trait_counts, population, rng)?;

        let instructions: Vec<String> =
            self.behaviors.iter().map(|b| b.instruction.clone()).collect();
        let behavior_pool =
            build_pool(Self::BEHAVIORS, &instructions, &behavior_counts, population, rng)?;

        Ok(Allocation {
            trait_pool,
            behavior_pool,
            trait_counts,
            behavior_counts,
        })
    }

    /// Plain serializable view of both catalogs and their counts for
    /// `population` agents.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError`] for any invalid catalog.
    pub fn snapshot(&self, population: usize) -> Result<AllocatorSnapshot, AllocatorError> {
        let trait_weights = normalize_weights(Self::TRAITS, &self.trait_weights())?;
        let behavior_weights = normalize_weights(Self::BEHAVIORS, &self.behavior_weights())?;
        let trait_counts = compute_counts(Self::TRAITS, &trait_weights, population, self.rounding)?;
        let behavior_counts =
            compute_counts(Self::BEHAVIORS, &behavior_weights, population, self.rounding)?;

        let trait_distributions = self
            .traits
            .iter()
            .zip(trait_weights.iter().zip(&trait_counts))
            .map(|(p, (&weight, &calculated_count))| TraitDistributionRow {
                training_level: p.traits.training_level,
                familiarity_level: p.traits.familiarity_level,
                shooter_perception_level: p.traits.shooter_perception_level,
                weight,
                calculated_count,
            })
            .collect();

        let behavior_distributions = self
            .behaviors
            .iter()
            .zip(behavior_weights.iter().zip(&behavior_counts))
            .map(|(b, (&weight, &calculated_count))| BehaviorDistributionRow {
                behavior_type: b.behavior_type.clone(),
                instruction: b.instruction.clone(),
                weight,
                calculated_count,
            })
            .collect();

        Ok(AllocatorSnapshot {
            trait_distributions,
            behavior_distributions,
        })
    }
}
