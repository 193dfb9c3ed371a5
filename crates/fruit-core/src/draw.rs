//! ============================================================================
//! Draw Engine - Weighted rarity roll, then a uniform pick within the tier
//! ============================================================================
//! The engine itself is pure: catalog + RNG in, item out. `claim_draw` is the
//! cooldown-gated version that writes the result into a ledger.
//! ============================================================================

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::cooldown::{CooldownCheck, CooldownPolicy};
use crate::ledger::Ledger;
use crate::types::{BotError, ItemDefinition, OwnedItem, Rarity};

/// Default rarity weights (out of 100)
pub const DEFAULT_RARITY_WEIGHTS: [u32; 5] = [40, 30, 20, 8, 2];

/// Relative draw weight per tier, indexed like [`Rarity::ALL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RarityWeights([u32; 5]);

impl RarityWeights {
    pub fn new(weights: [u32; 5]) -> Result<Self> {
        if weights.iter().all(|w| *w == 0) {
            return Err(anyhow!("At least one rarity weight must be non-zero"));
        }
        Ok(Self(weights))
    }

    pub fn weight(&self, rarity: Rarity) -> u32 {
        self.0[rarity.index()]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Expected share of draws landing on `rarity`
    pub fn probability(&self, rarity: Rarity) -> f64 {
        self.weight(rarity) as f64 / self.total() as f64
    }
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self(DEFAULT_RARITY_WEIGHTS)
    }
}

/// Random fruit generator over a shared catalog
#[derive(Debug, Clone)]
pub struct DrawEngine {
    catalog: Arc<Catalog>,
    weights: RarityWeights,
}

impl DrawEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_weights(catalog, RarityWeights::default())
    }

    pub fn with_weights(catalog: Arc<Catalog>, weights: RarityWeights) -> Self {
        Self { catalog, weights }
    }

    pub fn weights(&self) -> &RarityWeights {
        &self.weights
    }

    /// Roll a tier according to the weights
    pub fn pick_rarity<R: Rng + ?Sized>(&self, rng: &mut R) -> Rarity {
        // Weights are validated non-zero on construction, so the fallback is never taken.
        Rarity::ALL
            .choose_weighted(rng, |r| self.weights.weight(*r))
            .copied()
            .unwrap_or(Rarity::Common)
    }

    /// Draw one fruit, from `rarity` if given, otherwise from a rolled tier
    pub fn draw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        rarity: Option<Rarity>,
    ) -> Result<ItemDefinition, BotError> {
        let rarity = rarity.unwrap_or_else(|| self.pick_rarity(rng));
        let item = self
            .catalog
            .items(rarity)
            .choose(rng)
            .cloned()
            .ok_or(BotError::CatalogEmpty(rarity))?;

        debug!("Drew {} ({})", item.name, rarity);
        Ok(item)
    }
}

/// What a successful draw produced
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutcome {
    pub item: ItemDefinition,
    /// Copies of the same fruit owned before this one
    pub prior_copies: usize,
}

impl DrawOutcome {
    /// Total copies now owned, reported only when this one is a duplicate
    pub fn duplicate_count(&self) -> Option<usize> {
        (self.prior_copies > 0).then_some(self.prior_copies + 1)
    }
}

/// Cooldown-gated draw for one user.
///
/// On success the fruit is appended and `last_draw_at` set to `now` in the
/// same call; on any error the ledger is left as it was, apart from lazily
/// creating the user's record.
pub fn claim_draw<R: Rng + ?Sized>(
    ledger: &mut Ledger,
    engine: &DrawEngine,
    policy: &CooldownPolicy,
    rng: &mut R,
    user_id: &str,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<DrawOutcome, BotError> {
    let record = ledger.get_or_create(user_id, display_name);
    if let CooldownCheck::Denied(remaining) = policy.check(record, now) {
        debug!(
            "Draw denied for {}: {}h {}m left",
            user_id,
            remaining.hours(),
            remaining.minutes()
        );
        return Err(BotError::CooldownActive(remaining));
    }

    let item = engine.draw(rng, None)?;
    let prior_copies = record.count_named(&item.name);
    record.collection.push(OwnedItem::from_definition(&item, Some(now)));
    record.last_draw_at = Some(now);

    info!("User {} drew {} ({})", user_id, item.name, item.rarity);
    Ok(DrawOutcome { item, prior_copies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> DrawEngine {
        DrawEngine::new(Arc::new(sample_catalog()))
    }

    #[test]
    fn test_default_weights_sum_to_100() {
        let weights = RarityWeights::default();
        assert_eq!(weights.total(), 100);
        assert_eq!(weights.weight(Rarity::Common), 40);
        assert_eq!(weights.weight(Rarity::Mythical), 2);
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        assert!(RarityWeights::new([0; 5]).is_err());
        assert!(RarityWeights::new([0, 0, 0, 0, 1]).is_ok());
    }

    #[test]
    fn test_rarity_frequencies_converge() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 200_000;
        let mut counts = [0usize; 5];

        for _ in 0..draws {
            counts[engine.pick_rarity(&mut rng).index()] += 1;
        }

        for rarity in Rarity::ALL {
            let observed = counts[rarity.index()] as f64 / draws as f64;
            let expected = engine.weights().probability(rarity);
            assert!(
                (observed - expected).abs() < 0.01,
                "{} drawn {:.4}, expected {:.4}",
                rarity,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_custom_weights_converge() {
        let weights = RarityWeights::new([0, 0, 50, 0, 50]).unwrap();
        let engine = DrawEngine::with_weights(Arc::new(sample_catalog()), weights);
        let mut rng = StdRng::seed_from_u64(11);
        let mut mythical = 0usize;
        let draws = 50_000;

        for _ in 0..draws {
            let item = engine.draw(&mut rng, None).unwrap();
            assert!(matches!(item.rarity, Rarity::Rare | Rarity::Mythical));
            if item.rarity == Rarity::Mythical {
                mythical += 1;
            }
        }

        let share = mythical as f64 / draws as f64;
        assert!((share - 0.5).abs() < 0.02, "mythical share {}", share);
    }

    #[test]
    fn test_rarity_override() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let item = engine.draw(&mut rng, Some(Rarity::Common)).unwrap();
            assert_eq!(item.rarity, Rarity::Common);
        }
    }

    #[test]
    fn test_uniform_within_tier() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(3);
        let mut spring = 0usize;
        let draws = 20_000;

        for _ in 0..draws {
            if engine.draw(&mut rng, Some(Rarity::Common)).unwrap().name == "Spring-Spring Fruit" {
                spring += 1;
            }
        }

        let share = spring as f64 / draws as f64;
        assert!((share - 0.5).abs() < 0.02, "share {}", share);
    }

    #[test]
    fn test_empty_tier_is_catalog_empty() {
        let engine = DrawEngine::new(Arc::new(Catalog::default()));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            engine.draw(&mut rng, Some(Rarity::Rare)),
            Err(BotError::CatalogEmpty(Rarity::Rare))
        );
    }

    #[test]
    fn test_claim_draw_stamps_and_blocks_until_cooldown_passes() {
        let engine = engine();
        let policy = CooldownPolicy::default();
        let mut ledger = Ledger::default();
        let mut rng = StdRng::seed_from_u64(42);
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

        let first = claim_draw(&mut ledger, &engine, &policy, &mut rng, "100", "alice", t0).unwrap();
        let record = ledger.get("100").unwrap();
        assert_eq!(record.last_draw_at, Some(t0));
        assert_eq!(record.collection.len(), 1);
        assert_eq!(record.collection[0].name, first.item.name);
        assert_eq!(record.collection[0].obtained, Some(t0));
        assert_eq!(record.display_name, "alice");

        let early = t0 + Duration::hours(3) + Duration::minutes(59);
        let err = claim_draw(&mut ledger, &engine, &policy, &mut rng, "100", "alice", early).unwrap_err();
        match err {
            BotError::CooldownActive(remaining) => {
                assert_eq!(remaining.hours(), 0);
                assert_eq!(remaining.minutes(), 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(ledger.get("100").unwrap().collection.len(), 1);
        assert_eq!(ledger.get("100").unwrap().last_draw_at, Some(t0));

        let later = t0 + Duration::hours(4) + Duration::seconds(1);
        claim_draw(&mut ledger, &engine, &policy, &mut rng, "100", "alice", later).unwrap();
        assert_eq!(ledger.get("100").unwrap().collection.len(), 2);
        assert_eq!(ledger.get("100").unwrap().last_draw_at, Some(later));
    }

    #[test]
    fn test_claim_draw_reports_duplicates() {
        let catalog = Catalog::from_tiers([(
            Rarity::Rare,
            vec![ItemDefinition {
                name: "Flame-Flame Fruit".into(),
                rarity: Rarity::Rare,
                kind: "Logia".into(),
                damage: 90.0,
                health: Some(100.0),
            }],
        )]);
        let weights = RarityWeights::new([0, 0, 1, 0, 0]).unwrap();
        let engine = DrawEngine::with_weights(Arc::new(catalog), weights);
        let policy = CooldownPolicy::default();
        let mut ledger = Ledger::default();
        let mut rng = StdRng::seed_from_u64(5);
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

        let first = claim_draw(&mut ledger, &engine, &policy, &mut rng, "7", "bob", t0).unwrap();
        assert_eq!(first.duplicate_count(), None);

        let second = claim_draw(
            &mut ledger,
            &engine,
            &policy,
            &mut rng,
            "7",
            "bob",
            t0 + Duration::hours(5),
        )
        .unwrap();
        assert_eq!(second.prior_copies, 1);
        assert_eq!(second.duplicate_count(), Some(2));
    }

    #[test]
    fn test_claim_draw_catalog_empty_leaves_no_timestamp() {
        let engine = DrawEngine::new(Arc::new(Catalog::default()));
        let policy = CooldownPolicy::default();
        let mut ledger = Ledger::default();
        let mut rng = StdRng::seed_from_u64(9);

        let result = claim_draw(&mut ledger, &engine, &policy, &mut rng, "1", "carol", Utc::now());
        assert!(matches!(result, Err(BotError::CatalogEmpty(_))));
        let record = ledger.get("1").unwrap();
        assert!(record.last_draw_at.is_none());
        assert!(record.collection.is_empty());
    }
}
