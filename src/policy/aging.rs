//! Políticas de envelhecimento (aging).
//!
//! Uma política de aging tem duas responsabilidades:
//!
//! - **Evicção por capacidade**: dado o estado, escolhe o que remover
//! - **Admissão**: decide se um descritor merece entrar no cache
//!
//! A evicção remove no máximo uma entrada por chamada (a mais antiga).
//! Como o gerenciador chama o aging uma vez por admissão, a profundidade
//! converge para a capacidade.

use std::num::NonZeroUsize;

use parking_lot::Mutex;

use crate::descriptor::CacheDesc;
use crate::types::config::{AgingPolicyKind, CacheConfig, OccurrenceConfig};
use crate::types::{CacheHashKey, CacheItemId};
use crate::{KcacheError, KcacheResult};

use super::occurrence::OccurrenceTable;
use super::state::{CacheInfo, CacheState};

/// Trait para políticas de aging.
pub trait AgingPolicy<D: CacheDesc>: Send + Sync {
    /// Nome da política.
    fn name(&self) -> &str;

    /// Capacidade máxima do cache.
    fn capacity(&self) -> usize;

    /// Retorna os ids a remover para respeitar a capacidade.
    fn do_aging(&self, state: &CacheState<D>) -> Vec<CacheItemId>;

    /// Registra uma observação do descritor e diz se ele pode ser admitido.
    fn is_ready_to_add(&self, desc_hash: CacheHashKey, desc: &D) -> bool;

    /// Notificação de que a entrada do descritor saiu do cache.
    fn on_evicted(&self, _desc_hash: CacheHashKey, _desc: &D) {}
}

/// Escolhe a entrada mais antiga quando a profundidade excede a capacidade.
///
/// Em empate de timestamp vence a primeira encontrada.
fn evict_oldest_over_capacity<D: CacheDesc>(
    state: &CacheState<D>,
    capacity: usize,
) -> Vec<CacheItemId> {
    let depth = state.depth();
    tracing::debug!(depth, capacity, "Checking cache depth for aging");
    if depth <= capacity {
        return Vec::new();
    }

    let mut oldest: Option<&CacheInfo<D>> = None;
    for info in state.iter() {
        if oldest.map_or(true, |current| info.timestamp() < current.timestamp()) {
            oldest = Some(info);
        }
    }

    match oldest {
        Some(info) => {
            tracing::debug!(
                item = %info.item_id(),
                hash = %info.desc_hash(),
                last_access = %info.timestamp(),
                "Aging selected oldest entry"
            );
            vec![info.item_id()]
        }
        None => Vec::new(),
    }
}

fn check_capacity(capacity: usize) -> KcacheResult<()> {
    if capacity == 0 {
        return Err(KcacheError::config("aging capacity must be >= 1"));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// LRU
// ═══════════════════════════════════════════════════════════════════════════

/// LRU simples: admite todo descritor, remove o menos recentemente usado.
#[derive(Debug, Clone)]
pub struct LruAging {
    capacity: usize,
}

impl LruAging {
    /// Cria a política. Capacidade zero é erro de configuração.
    pub fn new(capacity: usize) -> KcacheResult<Self> {
        check_capacity(capacity)?;
        Ok(Self { capacity })
    }
}

impl<D: CacheDesc> AgingPolicy<D> for LruAging {
    fn name(&self) -> &str {
        "lru"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn do_aging(&self, state: &CacheState<D>) -> Vec<CacheItemId> {
        evict_oldest_over_capacity(state, self.capacity)
    }

    fn is_ready_to_add(&self, _desc_hash: CacheHashKey, _desc: &D) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LRU-K
// ═══════════════════════════════════════════════════════════════════════════

/// LRU-K: só admite descritores observados pelo menos K vezes.
///
/// A tabela de ocorrências tem lock próprio, nunca adquirido junto com o
/// lock do estado do cache.
pub struct LruKAging<D> {
    capacity: usize,
    k_times: u32,
    reset_on_evict: bool,
    occurrences: Mutex<OccurrenceTable<D>>,
}

impl<D: CacheDesc> LruKAging<D> {
    /// Cria a política com tabela de ocorrências sem limite.
    pub fn new(capacity: usize, k_times: u32) -> KcacheResult<Self> {
        Self::with_occurrence(capacity, k_times, &OccurrenceConfig::default())
    }

    /// Cria a política com as opções da tabela de ocorrências.
    pub fn with_occurrence(
        capacity: usize,
        k_times: u32,
        occurrence: &OccurrenceConfig,
    ) -> KcacheResult<Self> {
        check_capacity(capacity)?;
        if k_times == 0 {
            return Err(KcacheError::config("k_times must be >= 1"));
        }

        let table = match occurrence.max_tracked_hashes {
            None => OccurrenceTable::unbounded(),
            Some(max) => {
                let max = NonZeroUsize::new(max).ok_or_else(|| {
                    KcacheError::config("occurrence.max_tracked_hashes must be >= 1")
                })?;
                OccurrenceTable::bounded(max)
            }
        };

        Ok(Self {
            capacity,
            k_times,
            reset_on_evict: occurrence.reset_on_evict,
            occurrences: Mutex::new(table),
        })
    }

    /// Número de observações necessárias para admissão.
    pub fn k_times(&self) -> u32 {
        self.k_times
    }

    /// Registra a observação e retorna `true` se a contagem atingiu K.
    ///
    /// Sempre tem efeito colateral: cada chamada conta como uma ocorrência.
    pub fn is_cache_desc_appear_k_times(&self, desc_hash: CacheHashKey, desc: &D) -> bool {
        let count = self.occurrences.lock().observe(desc_hash, desc);
        count >= u64::from(self.k_times)
    }

    /// Contagem atual do descritor.
    pub fn occurrence_count(&self, desc_hash: CacheHashKey, desc: &D) -> u64 {
        self.occurrences.lock().count(desc_hash, desc)
    }

    /// Número de descritores distintos observados.
    pub fn tracked_descs(&self) -> usize {
        self.occurrences.lock().tracked_descs()
    }
}

impl<D: CacheDesc> AgingPolicy<D> for LruKAging<D> {
    fn name(&self) -> &str {
        "lru_k"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn do_aging(&self, state: &CacheState<D>) -> Vec<CacheItemId> {
        evict_oldest_over_capacity(state, self.capacity)
    }

    fn is_ready_to_add(&self, desc_hash: CacheHashKey, desc: &D) -> bool {
        self.is_cache_desc_appear_k_times(desc_hash, desc)
    }

    fn on_evicted(&self, desc_hash: CacheHashKey, desc: &D) {
        if self.reset_on_evict && self.occurrences.lock().forget(desc_hash, desc) {
            tracing::debug!(hash = %desc_hash, "Occurrence count reset after eviction");
        }
    }
}

/// Cria a política de aging configurada.
pub fn create_aging_policy<D: CacheDesc>(
    config: &CacheConfig,
) -> KcacheResult<Box<dyn AgingPolicy<D>>> {
    config.validate()?;
    match config.aging_policy {
        AgingPolicyKind::Lru => Ok(Box::new(LruAging::new(config.capacity)?)),
        AgingPolicyKind::LruK => Ok(Box::new(LruKAging::with_occurrence(
            config.capacity,
            config.k_times,
            &config.occurrence,
        )?)),
    }
}
