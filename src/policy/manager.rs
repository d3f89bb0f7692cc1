//! Gerenciador de política do cache de compilação.
//!
//! Compõe hasher, política de match, política de aging e estado do cache
//! atrás de uma fachada com capacidade limitada.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::descriptor::{CacheDesc, CompileCacheDesc};
use crate::types::config::CacheConfig;
use crate::types::CacheItemId;
use crate::KcacheResult;

use super::aging::{create_aging_policy, AgingPolicy};
use super::clock::{Clock, SystemClock};
use super::matching::{create_match_policy, MatchPolicy};
use super::state::{CacheInfo, CacheState};

/// Resultado de uma tentativa de admissão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    /// Entrada nova inserida.
    Admitted,
    /// Descritor igual já estava no cache; o artefato produzido deve ser descartado.
    AlreadyCached,
    /// Descritor ainda não atingiu o limiar de admissão; nada foi compilado.
    NotEligible,
    /// O produtor retornou `CacheItemId::INVALID`; nada foi inserido.
    CompileFailed,
    /// O id produzido já pertence a outra entrada; nada foi inserido.
    ItemIdInUse,
}

/// Resposta de [`CachePolicyManager::add_if_eligible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// O que aconteceu.
    pub status: AdmissionStatus,

    /// Id em cache para o descritor, ou `CacheItemId::INVALID`.
    pub item_id: CacheItemId,

    /// Ids removidos pelo aging disparado por esta admissão.
    pub evicted: Vec<CacheItemId>,
}

impl Admission {
    fn rejected(status: AdmissionStatus) -> Self {
        Self {
            status,
            item_id: CacheItemId::INVALID,
            evicted: Vec::new(),
        }
    }

    /// Verifica se uma entrada nova foi inserida.
    pub fn is_admitted(&self) -> bool {
        self.status == AdmissionStatus::Admitted
    }
}

/// Estatísticas do cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub depth: usize,

    /// Número de buckets de `desc_hash`.
    pub buckets: usize,

    /// Capacidade configurada.
    pub capacity: usize,

    /// Consultas que acertaram.
    pub hits: u64,

    /// Consultas que erraram.
    pub misses: u64,

    /// Entradas inseridas.
    pub admissions: u64,

    /// Entradas removidas (aging, evict e delete).
    pub evictions: u64,

    /// Admissões recusadas por não atingirem o limiar.
    pub rejections: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Gerenciador de política do cache.
///
/// Dois locks independentes, nunca mantidos ao mesmo tempo: o `RwLock` do
/// estado aqui e o lock da tabela de ocorrências dentro da política de
/// aging. Nenhuma referência interna escapa: ids são `Copy` e descritores
/// são clonados na admissão.
pub struct CachePolicyManager<D: CacheDesc = CompileCacheDesc> {
    state: RwLock<CacheState<D>>,
    match_policy: Box<dyn MatchPolicy<D>>,
    aging_policy: Box<dyn AgingPolicy<D>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    admissions: AtomicU64,
    evictions: AtomicU64,
    rejections: AtomicU64,
}

impl<D: CacheDesc> CachePolicyManager<D> {
    /// Cria um gerenciador com as políticas informadas e o relógio do sistema.
    pub fn new(match_policy: Box<dyn MatchPolicy<D>>, aging_policy: Box<dyn AgingPolicy<D>>) -> Self {
        Self {
            state: RwLock::new(CacheState::new()),
            match_policy,
            aging_policy,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            admissions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    /// Cria um gerenciador a partir da configuração.
    ///
    /// Capacidade ou K não positivos são erro de configuração.
    pub fn from_config(config: &CacheConfig) -> KcacheResult<Self> {
        let match_policy = create_match_policy(config.match_policy);
        let aging_policy = create_aging_policy(config)?;

        tracing::info!(
            match_policy = match_policy.name(),
            aging_policy = aging_policy.name(),
            capacity = config.capacity,
            k_times = config.k_times,
            "Cache policy manager created"
        );

        Ok(Self::new(match_policy, aging_policy))
    }

    /// Substitui a fonte de tempo.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Nome da política de match.
    pub fn match_policy_name(&self) -> &str {
        self.match_policy.name()
    }

    /// Nome da política de aging.
    pub fn aging_policy_name(&self) -> &str {
        self.aging_policy.name()
    }

    /// Capacidade configurada.
    pub fn capacity(&self) -> usize {
        self.aging_policy.capacity()
    }

    /// Busca um artefato compilado para o descritor.
    ///
    /// O match roda sob o lock de leitura. Num acerto o lock de escrita é
    /// tomado, o match é refeito e só então a entrada tem o timestamp
    /// atualizado. Não passa pelo controle de admissão.
    pub fn query(&self, desc: &D) -> CacheItemId {
        let item_id = {
            let state = self.state.read();
            self.match_policy.get_cache_item(&state, desc)
        };
        if !item_id.is_valid() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return item_id;
        }

        let mut state = self.state.write();
        // removed or replaced between the two locks
        let item_id = self.match_policy.get_cache_item(&state, desc);
        if !item_id.is_valid() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return item_id;
        }
        state.touch(desc.desc_hash(), item_id, self.clock.now());
        self.hits.fetch_add(1, Ordering::Relaxed);
        item_id
    }

    /// Como [`query`](Self::query), mas sem atualizar recência nem contadores.
    pub fn peek(&self, desc: &D) -> CacheItemId {
        let state = self.state.read();
        self.match_policy.get_cache_item(&state, desc)
    }

    /// Registra a observação e, se o descritor for elegível, compila e admite.
    ///
    /// `produce` é chamado fora de qualquer lock e só quando a política de
    /// aging aprova. Se outra thread admitiu um descritor igual nesse meio
    /// tempo, a entrada existente vence e é retornada com
    /// [`AdmissionStatus::AlreadyCached`].
    pub fn add_if_eligible<F>(&self, desc: &D, produce: F) -> Admission
    where
        F: FnOnce() -> CacheItemId,
    {
        let desc_hash = desc.desc_hash();
        if !self.aging_policy.is_ready_to_add(desc_hash, desc) {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(hash = %desc_hash, "Descriptor not yet eligible for caching");
            return Admission::rejected(AdmissionStatus::NotEligible);
        }

        let item_id = produce();
        if !item_id.is_valid() {
            tracing::warn!(hash = %desc_hash, "Compilation failed, nothing cached");
            return Admission::rejected(AdmissionStatus::CompileFailed);
        }

        let info = CacheInfo::new(desc.clone(), item_id, self.clock.now());
        let removed = {
            let mut state = self.state.write();
            let existing = self.match_policy.get_cache_item(&state, desc);
            if existing.is_valid() {
                state.touch(desc_hash, existing, self.clock.now());
                drop(state);
                tracing::warn!(
                    hash = %desc_hash,
                    existing = %existing,
                    discarded = %item_id,
                    "Same descriptor already cached, keeping existing item"
                );
                return Admission {
                    status: AdmissionStatus::AlreadyCached,
                    item_id: existing,
                    evicted: Vec::new(),
                };
            }

            if state.contains_item(item_id) {
                drop(state);
                tracing::warn!(
                    hash = %desc_hash,
                    item = %item_id,
                    "Produced item id already cached for another descriptor, not admitted"
                );
                return Admission::rejected(AdmissionStatus::ItemIdInUse);
            }

            state.insert(info);
            let victims = self.aging_policy.do_aging(&state);
            state.remove_items(&victims)
        };

        self.admissions.fetch_add(1, Ordering::Relaxed);
        let evicted = self.finish_removal(removed);

        tracing::debug!(
            hash = %desc_hash,
            item = %item_id,
            evicted = evicted.len(),
            "Cache entry admitted"
        );

        Admission {
            status: AdmissionStatus::Admitted,
            item_id,
            evicted,
        }
    }

    /// Remove a entrada com o id informado. Retorna `true` se ela existia.
    pub fn evict(&self, item_id: CacheItemId) -> bool {
        let removed = self.state.write().remove_items(&[item_id]);
        !self.finish_removal(removed).is_empty()
    }

    /// Remove todas as entradas que satisfazem o predicado.
    pub fn delete_where<F>(&self, pred: F) -> Vec<CacheItemId>
    where
        F: FnMut(&CacheInfo<D>) -> bool,
    {
        let removed = self.state.write().remove_where(pred);
        let deleted = self.finish_removal(removed);
        tracing::info!(count = deleted.len(), "Cache entries deleted");
        deleted
    }

    /// Executa uma rodada de aging e remove as entradas escolhidas.
    pub fn do_aging(&self) -> Vec<CacheItemId> {
        let removed = {
            let mut state = self.state.write();
            let victims = self.aging_policy.do_aging(&state);
            state.remove_items(&victims)
        };
        self.finish_removal(removed)
    }

    /// Número total de entradas.
    pub fn current_depth(&self) -> usize {
        self.state.read().depth()
    }

    /// Número de buckets de `desc_hash`.
    pub fn bucket_count(&self) -> usize {
        self.state.read().bucket_count()
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        let (depth, buckets) = {
            let state = self.state.read();
            (state.depth(), state.bucket_count())
        };
        CacheStats {
            depth,
            buckets,
            capacity: self.capacity(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            admissions: self.admissions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
        }
    }

    /// Verifica o invariante de unicidade dos buckets.
    pub fn check_consistency(&self) -> KcacheResult<()> {
        self.state.read().check_consistency()
    }

    /// Contabiliza e notifica a política de aging. Chamar sem o lock do estado.
    fn finish_removal(&self, removed: Vec<CacheInfo<D>>) -> Vec<CacheItemId> {
        self.evictions
            .fetch_add(removed.len() as u64, Ordering::Relaxed);
        removed
            .into_iter()
            .map(|info| {
                self.aging_policy.on_evicted(info.desc_hash(), info.desc());
                info.item_id()
            })
            .collect()
    }
}
