//! Políticas de match: decidem se uma consulta acerta uma entrada existente.

use crate::descriptor::CacheDesc;
use crate::types::config::MatchPolicyKind;
use crate::types::CacheItemId;

use super::state::CacheState;

/// Trait para políticas de match.
pub trait MatchPolicy<D: CacheDesc>: Send + Sync {
    /// Nome da política.
    fn name(&self) -> &str;

    /// Retorna o id da entrada que atende a consulta, ou `CacheItemId::INVALID`.
    ///
    /// Leitura pura: não altera timestamps.
    fn get_cache_item(&self, state: &CacheState<D>, desc: &D) -> CacheItemId;
}

/// Match exato.
///
/// Acerta apenas quando `shape_hash` e o descritor completo são iguais.
/// Um shape diferente, mesmo que compatível, é sempre miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactOnlyMatch;

impl<D: CacheDesc> MatchPolicy<D> for ExactOnlyMatch {
    fn name(&self) -> &str {
        "exact_only"
    }

    fn get_cache_item(&self, state: &CacheState<D>, desc: &D) -> CacheItemId {
        let Some(bucket) = state.bucket(desc.desc_hash()) else {
            return CacheItemId::INVALID;
        };

        let shape_hash = desc.shape_hash();
        bucket
            .iter()
            .find(|info| info.shape_hash() == shape_hash && info.desc().is_same(desc))
            .map(|info| info.item_id())
            .unwrap_or(CacheItemId::INVALID)
    }
}

/// Cria a política de match configurada.
pub fn create_match_policy<D: CacheDesc>(kind: MatchPolicyKind) -> Box<dyn MatchPolicy<D>> {
    match kind {
        MatchPolicyKind::ExactOnly => Box::new(ExactOnlyMatch),
    }
}
