//! Alocador de ids de artefato do compilador simulado.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::types::CacheItemId;

#[derive(Debug, Default)]
struct AllocatorInner {
    next: i64,
    free: VecDeque<CacheItemId>,
}

/// Entrega ids novos, reutilizando primeiro os devolvidos após evicção.
#[derive(Debug, Default)]
pub struct ItemIdAllocator {
    inner: Mutex<AllocatorInner>,
}

impl ItemIdAllocator {
    /// Cria um alocador que começa em 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Próximo id livre.
    pub fn next_id(&self) -> CacheItemId {
        let mut inner = self.inner.lock();
        if let Some(id) = inner.free.pop_front() {
            return id;
        }
        let id = CacheItemId(inner.next);
        inner.next += 1;
        id
    }

    /// Devolve ids de artefatos removidos do cache.
    pub fn recycle(&self, ids: &[CacheItemId]) {
        let mut inner = self.inner.lock();
        inner.free.extend(ids.iter().copied().filter(|id| id.is_valid()));
    }

    /// Quantidade de ids aguardando reutilização.
    pub fn free_count(&self) -> usize {
        self.inner.lock().free.len()
    }
}
