//! Testes de integração para o subsistema de política do kcache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use kcache::descriptor::{CacheDesc, CompileCacheDesc, DataType, Format, TensorInfo};
use kcache::policy::{
    AdmissionStatus, AgingPolicy, CacheInfo, CachePolicyManager, CacheState, Clock, ExactOnlyMatch,
    LruKAging, ManualClock,
};
use kcache::types::config::{AgingPolicyKind, CacheConfig};
use kcache::types::{CacheHashKey, CacheItemId};

fn conv(batch: i64) -> CompileCacheDesc {
    CompileCacheDesc::new("Conv2D")
        .with_unique_id(42)
        .with_attr(vec![1u8, 1, 0, 0])
        .with_tensor(TensorInfo::new(Format::Nc1hwc0, Format::Nchw, DataType::Float16).with_shape(vec![batch, 16, 56, 56]))
}

/// Descritor cujo hash colide sempre, para exercitar a comparação completa.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Colliding {
    name: String,
    dims: Vec<i64>,
}

impl Colliding {
    fn new(name: &str, dims: &[i64]) -> Self {
        Self {
            name: name.to_string(),
            dims: dims.to_vec(),
        }
    }
}

impl CacheDesc for Colliding {
    fn desc_hash(&self) -> CacheHashKey {
        CacheHashKey(7)
    }

    fn shape_hash(&self) -> CacheHashKey {
        CacheHashKey(7)
    }

    fn is_same(&self, other: &Self) -> bool {
        self == other
    }
}

fn manual_manager(capacity: usize, k_times: u32) -> (CachePolicyManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let manager = CachePolicyManager::from_config(&CacheConfig::new(capacity, k_times))
        .unwrap()
        .with_clock(clock.clone());
    (manager, clock)
}

// Match exato
mod matching_tests {
    use super::*;

    #[test]
    fn test_collisions_resolved_by_full_equality() {
        let manager: CachePolicyManager<Colliding> = CachePolicyManager::new(
            Box::new(ExactOnlyMatch),
            Box::new(LruKAging::<Colliding>::new(10, 1).unwrap()),
        );

        let a = Colliding::new("a", &[1, 2]);
        let b = Colliding::new("b", &[1, 2]);
        let c = Colliding::new("a", &[2, 1]);

        assert_eq!(manager.add_if_eligible(&a, || CacheItemId(1)).item_id, CacheItemId(1));
        assert_eq!(manager.add_if_eligible(&b, || CacheItemId(2)).item_id, CacheItemId(2));

        assert_eq!(manager.bucket_count(), 1);
        assert_eq!(manager.query(&a), CacheItemId(1));
        assert_eq!(manager.query(&b), CacheItemId(2));
        assert_eq!(manager.query(&c), CacheItemId::INVALID);
        assert!(manager.check_consistency().is_ok());
    }

    #[test]
    fn test_query_on_empty_cache() {
        let (manager, _) = manual_manager(4, 2);

        assert_eq!(manager.query(&conv(1)), CacheItemId::INVALID);
        assert_eq!(manager.current_depth(), 0);
        assert_eq!(manager.bucket_count(), 0);
    }

    #[test]
    fn test_different_batch_is_a_miss() {
        let (manager, _) = manual_manager(4, 1);
        manager.add_if_eligible(&conv(1), || CacheItemId(10));

        assert_eq!(manager.query(&conv(1)), CacheItemId(10));
        assert_eq!(manager.query(&conv(2)), CacheItemId::INVALID);
    }
}

// Controle de admissão
mod admission_tests {
    use super::*;

    #[test]
    fn test_k_three_gate_and_bucket_neighbour() {
        let aging = LruKAging::<CompileCacheDesc>::new(10, 3).unwrap();
        let a = conv(1);
        let b = conv(2);
        assert_eq!(a.desc_hash(), b.desc_hash());

        assert!(!aging.is_ready_to_add(a.desc_hash(), &a));
        assert!(!aging.is_ready_to_add(a.desc_hash(), &a));
        assert!(!aging.is_ready_to_add(b.desc_hash(), &b));
        assert!(aging.is_ready_to_add(a.desc_hash(), &a));
        assert!(aging.is_ready_to_add(a.desc_hash(), &a));

        assert_eq!(aging.occurrence_count(b.desc_hash(), &b), 1);
    }

    #[test]
    fn test_round_trip_through_manager() {
        let (manager, _) = manual_manager(4, 2);
        let desc = conv(8);

        let first = manager.add_if_eligible(&desc, || panic!("must not compile on first sight"));
        assert_eq!(first.status, AdmissionStatus::NotEligible);
        assert_eq!(first.item_id, CacheItemId::INVALID);

        let second = manager.add_if_eligible(&desc, || CacheItemId(5));
        assert!(second.is_admitted());
        assert_eq!(manager.query(&desc), CacheItemId(5));

        assert!(manager.evict(CacheItemId(5)));
        assert_eq!(manager.query(&desc), CacheItemId::INVALID);
        assert!(!manager.evict(CacheItemId(5)));
    }

    #[test]
    fn test_failed_producer_not_admitted() {
        let (manager, _) = manual_manager(4, 1);
        let admission = manager.add_if_eligible(&conv(1), || CacheItemId::INVALID);

        assert_eq!(admission.status, AdmissionStatus::CompileFailed);
        assert_eq!(manager.current_depth(), 0);
    }

    #[test]
    fn test_duplicate_admission_returns_existing() {
        let (manager, _) = manual_manager(4, 1);
        manager.add_if_eligible(&conv(1), || CacheItemId(1));

        let again = manager.add_if_eligible(&conv(1), || CacheItemId(2));
        assert_eq!(again.status, AdmissionStatus::AlreadyCached);
        assert_eq!(again.item_id, CacheItemId(1));
        assert_eq!(manager.current_depth(), 1);
    }

    #[test]
    fn test_reset_on_evict_requires_k_again() {
        let mut config = CacheConfig::new(1, 2);
        config.occurrence.reset_on_evict = true;
        let clock = Arc::new(ManualClock::new(0));
        let manager: CachePolicyManager = CachePolicyManager::from_config(&config)
            .unwrap()
            .with_clock(clock.clone());

        let a = conv(1);
        let b = conv(2);
        manager.add_if_eligible(&a, || CacheItemId(1));
        assert!(manager.add_if_eligible(&a, || CacheItemId(1)).is_admitted());

        clock.advance(10);
        manager.add_if_eligible(&b, || CacheItemId(2));
        let admission = manager.add_if_eligible(&b, || CacheItemId(2));
        assert_eq!(admission.evicted, vec![CacheItemId(1)]);

        // A was forgotten on eviction: one more sighting is not enough
        let retry = manager.add_if_eligible(&a, || CacheItemId(3));
        assert_eq!(retry.status, AdmissionStatus::NotEligible);
    }
}

// Aging e capacidade
mod aging_tests {
    use super::*;

    #[test]
    fn test_capacity_plus_one_evicts_oldest() {
        let (manager, clock) = manual_manager(5, 1);

        for i in 0..5 {
            clock.advance(1);
            let admission = manager.add_if_eligible(&conv(i), || CacheItemId(i));
            assert!(admission.evicted.is_empty());
        }

        clock.advance(1);
        let admission = manager.add_if_eligible(&conv(5), || CacheItemId(5));
        assert_eq!(admission.evicted, vec![CacheItemId(0)]);
        assert_eq!(manager.current_depth(), 5);
    }

    #[test]
    fn test_lru_scenario_capacity_two_k_one() {
        let (manager, clock) = manual_manager(2, 1);
        let a = conv(1);
        let b = conv(2);
        let c = conv(3);

        manager.add_if_eligible(&a, || CacheItemId(1));
        clock.advance(1);
        manager.add_if_eligible(&b, || CacheItemId(2));
        clock.advance(1);
        let admission = manager.add_if_eligible(&c, || CacheItemId(3));

        assert_eq!(admission.evicted, vec![CacheItemId(1)]);
        assert_eq!(manager.query(&a), CacheItemId::INVALID);
        assert_eq!(manager.query(&b), CacheItemId(2));
        assert_eq!(manager.query(&c), CacheItemId(3));
    }

    #[test]
    fn test_query_protects_recently_used_entry() {
        let (manager, clock) = manual_manager(2, 1);
        let a = conv(1);
        let b = conv(2);
        let c = conv(3);

        manager.add_if_eligible(&a, || CacheItemId(1));
        clock.advance(1);
        manager.add_if_eligible(&b, || CacheItemId(2));
        clock.advance(1);
        assert_eq!(manager.query(&a), CacheItemId(1));
        clock.advance(1);
        let admission = manager.add_if_eligible(&c, || CacheItemId(3));

        assert_eq!(admission.evicted, vec![CacheItemId(2)]);
        assert_eq!(manager.query(&a), CacheItemId(1));
    }

    #[test]
    fn test_repeated_aging_drains_excess_in_order() {
        let aging = LruKAging::<CompileCacheDesc>::new(20, 2).unwrap();
        let mut state = CacheState::new();
        for i in 0..25 {
            let ts = Utc.timestamp_opt(1_000 + i, 0).unwrap();
            state.insert(CacheInfo::new(conv(i), CacheItemId(i), ts));
        }

        for expected in 0..5 {
            let victims = aging.do_aging(&state);
            assert_eq!(victims, vec![CacheItemId(expected)]);
            state.remove_items(&victims);
        }
        assert_eq!(state.depth(), 20);
        assert!(aging.do_aging(&state).is_empty());
    }

    #[test]
    fn test_each_admission_past_capacity_evicts_one() {
        let (manager, clock) = manual_manager(20, 1);

        for i in 0..25 {
            clock.advance(1);
            let admission = manager.add_if_eligible(&conv(i), || CacheItemId(i));
            let expected = if i < 20 { vec![] } else { vec![CacheItemId(i - 20)] };
            assert_eq!(admission.evicted, expected);
        }
        assert_eq!(manager.current_depth(), 20);
        assert!(manager.do_aging().is_empty());
        assert_eq!(manager.stats().evictions, 5);
    }

    #[test]
    fn test_plain_lru_policy_from_config() {
        let mut config = CacheConfig::new(3, 5);
        config.aging_policy = AgingPolicyKind::Lru;
        let manager: CachePolicyManager = CachePolicyManager::from_config(&config).unwrap();

        assert_eq!(manager.aging_policy_name(), "lru");
        assert!(manager.add_if_eligible(&conv(1), || CacheItemId(1)).is_admitted());
    }
}

// Concorrência
mod concurrency_tests {
    use super::*;

    const THREADS: usize = 8;
    const K: u32 = 4;

    #[test]
    fn test_own_descriptor_per_thread_yields_one_true_each() {
        let aging = LruKAging::<CompileCacheDesc>::new(100, K).unwrap();
        let trues = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let aging = &aging;
                let trues = &trues;
                scope.spawn(move || {
                    let desc = conv(t as i64);
                    for _ in 0..K {
                        if aging.is_ready_to_add(desc.desc_hash(), &desc) {
                            trues.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(trues.load(Ordering::Relaxed), THREADS);
        assert_eq!(aging.tracked_descs(), THREADS);
    }

    #[test]
    fn test_shared_descriptor_counts_are_exact() {
        let aging = LruKAging::<CompileCacheDesc>::new(100, K).unwrap();
        let desc = conv(1);
        let trues = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..K {
                        if aging.is_ready_to_add(desc.desc_hash(), &desc) {
                            trues.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let total = THREADS as u64 * K as u64;
        assert_eq!(aging.occurrence_count(desc.desc_hash(), &desc), total);
        assert_eq!(trues.load(Ordering::Relaxed) as u64, total - (K as u64 - 1));
    }

    #[test]
    fn test_concurrent_admissions_keep_buckets_unique() {
        let manager: CachePolicyManager = CachePolicyManager::from_config(&CacheConfig::new(16, 1)).unwrap();
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let manager = &manager;
                let admitted = &admitted;
                scope.spawn(move || {
                    for i in 0..32 {
                        let desc = conv(i % 12);
                        if manager.query(&desc).is_valid() {
                            continue;
                        }
                        let admission =
                            manager.add_if_eligible(&desc, || CacheItemId((t * 100 + i as usize) as i64));
                        if admission.is_admitted() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert!(manager.check_consistency().is_ok());
        assert_eq!(manager.current_depth(), 12);
        assert_eq!(admitted.load(Ordering::Relaxed), 12);
    }

    #[test]
    fn test_manager_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CachePolicyManager>();
        assert_send_sync::<Arc<dyn Clock>>();
    }
}
