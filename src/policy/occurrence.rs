//! Tabela de ocorrências usada pelo controle de admissão LRU-K.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::descriptor::CacheDesc;
use crate::types::CacheHashKey;

/// Contagem de observações por descritor, agrupada por `desc_hash`.
///
/// Independente do estado do cache: uma entrada sobrevive à evicção do
/// artefato correspondente. Sem limite configurado a tabela nunca esquece.
/// Com `max_tracked`, o bucket de hash observado há mais tempo é descartado
/// quando o limite é excedido.
pub struct OccurrenceTable<D> {
    buckets: LruCache<CacheHashKey, Vec<(D, u64)>>,
}

impl<D: CacheDesc> OccurrenceTable<D> {
    /// Cria uma tabela sem limite.
    pub fn unbounded() -> Self {
        Self {
            buckets: LruCache::unbounded(),
        }
    }

    /// Cria uma tabela com no máximo `max_tracked` buckets de hash.
    pub fn bounded(max_tracked: NonZeroUsize) -> Self {
        Self {
            buckets: LruCache::new(max_tracked),
        }
    }

    /// Registra uma observação e retorna a nova contagem do descritor.
    pub fn observe(&mut self, desc_hash: CacheHashKey, desc: &D) -> u64 {
        if let Some(bucket) = self.buckets.get_mut(&desc_hash) {
            if let Some((_, count)) = bucket.iter_mut().find(|(seen, _)| seen.is_same(desc)) {
                *count += 1;
                return *count;
            }
            bucket.push((desc.clone(), 1));
            return 1;
        }

        if let Some((forgotten, bucket)) = self.buckets.push(desc_hash, vec![(desc.clone(), 1)]) {
            tracing::debug!(
                hash = %forgotten,
                descs = bucket.len(),
                "Occurrence table full, forgetting least recently observed bucket"
            );
        }
        1
    }

    /// Contagem atual do descritor, sem registrar observação.
    pub fn count(&self, desc_hash: CacheHashKey, desc: &D) -> u64 {
        self.buckets
            .peek(&desc_hash)
            .and_then(|bucket| bucket.iter().find(|(seen, _)| seen.is_same(desc)))
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Esquece o descritor. Retorna `true` se ele estava registrado.
    pub fn forget(&mut self, desc_hash: CacheHashKey, desc: &D) -> bool {
        let Some(bucket) = self.buckets.peek_mut(&desc_hash) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|(seen, _)| !seen.is_same(desc));
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.buckets.pop(&desc_hash);
        }
        removed
    }

    /// Número de buckets de hash registrados.
    pub fn tracked_hashes(&self) -> usize {
        self.buckets.len()
    }

    /// Número de descritores distintos registrados.
    pub fn tracked_descs(&self) -> usize {
        self.buckets.iter().map(|(_, bucket)| bucket.len()).sum()
    }
}
