//! Replay de traces contra um gerenciador de política.
//!
//! Cada worker roda em `spawn_blocking`, porque a API do gerenciador é
//! síncrona e bloqueante, e se comporta como uma thread do driver de
//! compilação: consulta, compila no miss e tenta admitir.

use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::descriptor::CompileCacheDesc;
use crate::policy::{AdmissionStatus, CachePolicyManager, CacheStats};
use crate::types::config::Config;
use crate::{KcacheError, KcacheResult};

use super::allocator::ItemIdAllocator;
use super::trace::Trace;

/// Callback de progresso, chamado com o número de requisições concluídas.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Contadores de um replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayTally {
    /// Consultas que acertaram.
    pub hits: u64,
    /// Consultas que erraram.
    pub misses: u64,
    /// Compilações executadas (todo miss compila, cacheado ou não).
    pub compiles: u64,
    /// Artefatos admitidos no cache.
    pub admitted: u64,
    /// Admissões perdidas para outro worker com o mesmo descritor.
    pub already_cached: u64,
    /// Misses abaixo do limiar de admissão.
    pub not_eligible: u64,
    /// Compilações que falharam.
    pub compile_failed: u64,
    /// Entradas removidas por aging durante as admissões.
    pub evicted: u64,
}

impl AddAssign for ReplayTally {
    fn add_assign(&mut self, other: Self) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.compiles += other.compiles;
        self.admitted += other.admitted;
        self.already_cached += other.already_cached;
        self.not_eligible += other.not_eligible;
        self.compile_failed += other.compile_failed;
        self.evicted += other.evicted;
    }
}

/// Relatório final de um replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Requisições no trace.
    pub requests: u64,
    /// Workers usados.
    pub threads: usize,
    /// Política de match.
    pub match_policy: String,
    /// Política de aging.
    pub aging_policy: String,
    /// Contadores somados de todos os workers.
    #[serde(flatten)]
    pub tally: ReplayTally,
    /// Estado do gerenciador ao final.
    pub stats: CacheStats,
    /// Duração total em milissegundos.
    pub elapsed_ms: u64,
}

impl ReplayReport {
    /// Fração das requisições atendidas pelo cache.
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.tally.hits as f64 / self.requests as f64
        }
    }
}

/// Driver de compilação simulado.
pub struct ReplayDriver {
    manager: Arc<CachePolicyManager>,
    allocator: Arc<ItemIdAllocator>,
    threads: usize,
    progress: Option<ProgressFn>,
}

impl ReplayDriver {
    /// Cria um driver sobre um gerenciador existente.
    pub fn new(manager: Arc<CachePolicyManager>, threads: usize) -> Self {
        Self {
            manager,
            allocator: Arc::new(ItemIdAllocator::new()),
            threads: threads.max(1),
            progress: None,
        }
    }

    /// Cria o gerenciador e o driver a partir da configuração.
    pub fn from_config(config: &Config) -> KcacheResult<Self> {
        let manager = CachePolicyManager::from_config(&config.cache)?;
        Ok(Self::new(Arc::new(manager), config.replay.threads))
    }

    /// Substitui o número de workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Registra um callback de progresso.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Gerenciador usado pelo driver.
    pub fn manager(&self) -> &Arc<CachePolicyManager> {
        &self.manager
    }

    /// Reproduz o trace e retorna o relatório.
    ///
    /// A requisição `i` vai para o worker `i % threads`, preservando a ordem
    /// relativa dentro de cada worker.
    pub async fn run(&self, trace: Trace) -> KcacheResult<ReplayReport> {
        let started = Instant::now();
        let requests = Arc::new(trace.requests);
        let threads = self.threads.min(requests.len()).max(1);

        tracing::info!(
            requests = requests.len(),
            threads,
            capacity = self.manager.capacity(),
            "Starting trace replay"
        );

        let mut handles = Vec::with_capacity(threads);
        for worker in 0..threads {
            let manager = Arc::clone(&self.manager);
            let allocator = Arc::clone(&self.allocator);
            let requests = Arc::clone(&requests);
            let progress = self.progress.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let mut tally = ReplayTally::default();
                for desc in requests.iter().skip(worker).step_by(threads) {
                    replay_request(&manager, &allocator, desc, &mut tally);
                    if let Some(progress) = &progress {
                        progress(1);
                    }
                }
                tally
            }));
        }

        let mut tally = ReplayTally::default();
        for handle in handles {
            tally += handle
                .await
                .map_err(|e| KcacheError::other(format!("replay worker failed: {}", e)))?;
        }

        self.manager.check_consistency()?;

        let report = ReplayReport {
            requests: requests.len() as u64,
            threads,
            match_policy: self.manager.match_policy_name().to_string(),
            aging_policy: self.manager.aging_policy_name().to_string(),
            tally,
            stats: self.manager.stats(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            hits = report.tally.hits,
            compiles = report.tally.compiles,
            admitted = report.tally.admitted,
            evicted = report.tally.evicted,
            depth = report.stats.depth,
            elapsed_ms = report.elapsed_ms,
            "Trace replay finished"
        );

        Ok(report)
    }
}

/// Uma requisição: consulta, e no miss compila e tenta admitir.
fn replay_request(
    manager: &CachePolicyManager,
    allocator: &ItemIdAllocator,
    desc: &CompileCacheDesc,
    tally: &mut ReplayTally,
) {
    if manager.query(desc).is_valid() {
        tally.hits += 1;
        return;
    }
    tally.misses += 1;

    let mut produced = None;
    let admission = manager.add_if_eligible(desc, || {
        let id = allocator.next_id();
        produced = Some(id);
        id
    });

    match admission.status {
        AdmissionStatus::Admitted => {
            tally.compiles += 1;
            tally.admitted += 1;
            tally.evicted += admission.evicted.len() as u64;
            allocator.recycle(&admission.evicted);
        }
        AdmissionStatus::AlreadyCached => {
            tally.compiles += 1;
            tally.already_cached += 1;
            allocator.recycle(&produced.into_iter().collect::<Vec<_>>());
        }
        AdmissionStatus::NotEligible => {
            // compiled for this request only, artifact discarded right away
            tally.compiles += 1;
            tally.not_eligible += 1;
            let id = allocator.next_id();
            allocator.recycle(&[id]);
        }
        AdmissionStatus::CompileFailed => {
            tally.compile_failed += 1;
        }
        AdmissionStatus::ItemIdInUse => {
            // compiled but not cacheable under that id
            tally.compiles += 1;
            tally.compile_failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DataType, Format, TensorInfo};
    use crate::types::config::CacheConfig;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn desc(op: &str, dim: i64) -> CompileCacheDesc {
        CompileCacheDesc::new(op)
            .with_tensor(TensorInfo::new(Format::Nd, Format::Nd, DataType::Float).with_shape(vec![dim]))
    }

    fn driver(capacity: usize, k_times: u32, threads: usize) -> ReplayDriver {
        let manager = CachePolicyManager::from_config(&CacheConfig::new(capacity, k_times)).unwrap();
        ReplayDriver::new(Arc::new(manager), threads)
    }

    #[tokio::test]
    async fn test_replay_single_worker_k2() {
        let trace = Trace::new(vec![
            desc("Add", 1),
            desc("Add", 1),
            desc("Add", 1),
            desc("Mul", 1),
        ]);

        let report = driver(10, 2, 1).run(trace).await.unwrap();

        assert_eq!(report.requests, 4);
        assert_eq!(report.tally.hits, 1);
        assert_eq!(report.tally.misses, 3);
        assert_eq!(report.tally.compiles, 3);
        assert_eq!(report.tally.admitted, 1);
        assert_eq!(report.tally.not_eligible, 2);
        assert_eq!(report.tally.evicted, 0);
        assert_eq!(report.stats.depth, 1);
        assert_eq!(report.aging_policy, "lru_k");
        assert!((report.hit_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_replay_evicts_and_recycles_ids() {
        // K = 1, capacity 2: every miss is admitted, the third distinct evicts one
        let trace = Trace::new(vec![desc("A", 1), desc("B", 1), desc("C", 1)]);
        let driver = driver(2, 1, 1);

        let report = driver.run(trace).await.unwrap();

        assert_eq!(report.tally.admitted, 3);
        assert_eq!(report.tally.evicted, 1);
        assert_eq!(report.stats.depth, 2);
        assert_eq!(driver.allocator.free_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_many_workers_is_consistent() {
        let mut requests = Vec::new();
        for round in 0..20 {
            for dim in 0..10 {
                requests.push(desc("Conv2D", dim + (round % 3)));
            }
        }
        let total = requests.len() as u64;

        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let driver = driver(8, 2, 4).with_progress(Arc::new(move |n| {
            counter.fetch_add(n, Ordering::Relaxed);
        }));

        let report = driver.run(Trace::new(requests)).await.unwrap();

        assert_eq!(report.threads, 4);
        assert_eq!(report.tally.hits + report.tally.misses, total);
        assert_eq!(report.tally.compiles, report.tally.misses);
        assert!(report.stats.depth <= 8);
        assert_eq!(calls.load(Ordering::Relaxed), total);
        assert!(driver.manager().check_consistency().is_ok());
    }

    #[tokio::test]
    async fn test_replay_empty_trace() {
        let report = driver(4, 2, 3).run(Trace::default()).await.unwrap();
        assert_eq!(report.requests, 0);
        assert_eq!(report.threads, 1);
        assert_eq!(report.tally, ReplayTally::default());
        assert_eq!(report.hit_rate(), 0.0);
    }
}
