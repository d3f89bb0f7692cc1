//! Estado do cache: índice `desc_hash` → bucket de entradas.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::descriptor::CacheDesc;
use crate::types::{CacheHashKey, CacheItemId};
use crate::{KcacheError, KcacheResult};

/// Uma entrada do cache.
#[derive(Debug, Clone)]
pub struct CacheInfo<D> {
    desc_hash: CacheHashKey,
    shape_hash: CacheHashKey,
    desc: D,
    item_id: CacheItemId,
    timestamp: DateTime<Utc>,
}

impl<D: CacheDesc> CacheInfo<D> {
    /// Cria uma entrada calculando os hashes do descritor.
    pub fn new(desc: D, item_id: CacheItemId, timestamp: DateTime<Utc>) -> Self {
        Self {
            desc_hash: desc.desc_hash(),
            shape_hash: desc.shape_hash(),
            desc,
            item_id,
            timestamp,
        }
    }
}

impl<D> CacheInfo<D> {
    /// Hash independente de shape.
    pub fn desc_hash(&self) -> CacheHashKey {
        self.desc_hash
    }

    /// Hash de shape.
    pub fn shape_hash(&self) -> CacheHashKey {
        self.shape_hash
    }

    /// Descritor armazenado.
    pub fn desc(&self) -> &D {
        &self.desc
    }

    /// Id do artefato compilado.
    pub fn item_id(&self) -> CacheItemId {
        self.item_id
    }

    /// Último acesso.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.timestamp = now;
    }
}

/// Mapa `desc_hash` → entradas com esse hash, em ordem de inserção.
///
/// Invariante: nenhum bucket contém duas entradas com o mesmo
/// `(shape_hash, descritor)`.
#[derive(Debug)]
pub struct CacheState<D> {
    buckets: HashMap<CacheHashKey, Vec<CacheInfo<D>>>,
}

impl<D> Default for CacheState<D> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<D: CacheDesc> CacheState<D> {
    /// Cria um estado vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket de um `desc_hash`.
    pub fn bucket(&self, desc_hash: CacheHashKey) -> Option<&[CacheInfo<D>]> {
        self.buckets.get(&desc_hash).map(Vec::as_slice)
    }

    /// Itera sobre todas as entradas, bucket a bucket.
    pub fn iter(&self) -> impl Iterator<Item = &CacheInfo<D>> {
        self.buckets.values().flatten()
    }

    /// Número total de entradas.
    pub fn depth(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Número de buckets não vazios.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Verifica se não há entradas.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Anexa uma entrada ao seu bucket.
    ///
    /// O chamador deve ter verificado antes que não existe entrada igual.
    pub fn insert(&mut self, info: CacheInfo<D>) {
        let bucket = self.buckets.entry(info.desc_hash).or_default();
        debug_assert!(
            !bucket
                .iter()
                .any(|cached| cached.shape_hash == info.shape_hash && cached.desc.is_same(&info.desc)),
            "duplicate cache entry inserted"
        );
        bucket.push(info);
    }

    /// Verifica se algum bucket já guarda o id informado.
    pub fn contains_item(&self, item_id: CacheItemId) -> bool {
        self.iter().any(|info| info.item_id == item_id)
    }

    /// Atualiza o timestamp da entrada `item_id` dentro do bucket `desc_hash`.
    ///
    /// Ids são únicos no estado, então o par identifica a entrada acertada.
    pub fn touch(&mut self, desc_hash: CacheHashKey, item_id: CacheItemId, now: DateTime<Utc>) -> bool {
        let Some(bucket) = self.buckets.get_mut(&desc_hash) else {
            return false;
        };
        match bucket.iter_mut().find(|info| info.item_id == item_id) {
            Some(info) => {
                info.touch(now);
                true
            }
            None => false,
        }
    }

    /// Remove todas as entradas que satisfazem o predicado.
    ///
    /// Buckets que ficam vazios são descartados.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<CacheInfo<D>>
    where
        F: FnMut(&CacheInfo<D>) -> bool,
    {
        let mut removed = Vec::new();
        self.buckets.retain(|_, bucket| {
            let mut idx = 0;
            while idx < bucket.len() {
                if pred(&bucket[idx]) {
                    removed.push(bucket.remove(idx));
                } else {
                    idx += 1;
                }
            }
            !bucket.is_empty()
        });
        removed
    }

    /// Remove as entradas cujos ids estão na lista.
    pub fn remove_items(&mut self, item_ids: &[CacheItemId]) -> Vec<CacheInfo<D>> {
        if item_ids.is_empty() {
            return Vec::new();
        }
        self.remove_where(|info| item_ids.contains(&info.item_id))
    }

    /// Verifica o invariante de unicidade de cada bucket.
    pub fn check_consistency(&self) -> KcacheResult<()> {
        for (hash, bucket) in &self.buckets {
            for (idx, info) in bucket.iter().enumerate() {
                if info.desc_hash != *hash {
                    return Err(KcacheError::InvariantViolation(format!(
                        "item {} stored under bucket {} but hashes to {}",
                        info.item_id, hash, info.desc_hash
                    )));
                }
                let duplicate = bucket[idx + 1..]
                    .iter()
                    .find(|other| other.shape_hash == info.shape_hash && other.desc.is_same(&info.desc));
                if let Some(other) = duplicate {
                    return Err(KcacheError::InvariantViolation(format!(
                        "items {} and {} in bucket {} describe the same compilation",
                        info.item_id, other.item_id, hash
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CompileCacheDesc, DataType, Format, TensorInfo};
    use chrono::TimeZone;

    fn desc(op: &str, dim: i64) -> CompileCacheDesc {
        CompileCacheDesc::new(op)
            .with_tensor(TensorInfo::new(Format::Nd, Format::Nd, DataType::Float).with_shape(vec![dim, 256]))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_insert_groups_by_desc_hash() {
        let mut state = CacheState::new();
        state.insert(CacheInfo::new(desc("Add", 1), CacheItemId(1), at(1)));
        state.insert(CacheInfo::new(desc("Add", 2), CacheItemId(2), at(2)));
        state.insert(CacheInfo::new(desc("Mul", 1), CacheItemId(3), at(3)));

        assert_eq!(state.depth(), 3);
        assert_eq!(state.bucket_count(), 2);

        let bucket = state.bucket(desc("Add", 9).desc_hash()).unwrap();
        let ids: Vec<_> = bucket.iter().map(CacheInfo::item_id).collect();
        assert_eq!(ids, vec![CacheItemId(1), CacheItemId(2)]);
    }

    #[test]
    fn test_touch_updates_timestamp() {
        let mut state = CacheState::new();
        let add = desc("Add", 1);
        let hash = add.desc_hash();
        state.insert(CacheInfo::new(add, CacheItemId(1), at(1)));

        assert!(state.touch(hash, CacheItemId(1), at(50)));
        assert!(!state.touch(hash, CacheItemId(2), at(60)));
        assert_eq!(state.iter().next().unwrap().timestamp(), at(50));
    }

    #[test]
    fn test_touch_only_looks_in_given_bucket() {
        let mut state = CacheState::new();
        let add = desc("Add", 1);
        let mul = desc("Mul", 1);
        let mul_hash = mul.desc_hash();
        state.insert(CacheInfo::new(add, CacheItemId(1), at(1)));
        state.insert(CacheInfo::new(mul, CacheItemId(2), at(2)));

        assert!(!state.touch(mul_hash, CacheItemId(1), at(50)));
        assert!(state.iter().all(|info| info.timestamp() < at(50)));
        assert!(state.contains_item(CacheItemId(1)));
        assert!(!state.contains_item(CacheItemId(3)));
    }

    #[test]
    fn test_remove_items_drops_empty_buckets() {
        let mut state = CacheState::new();
        state.insert(CacheInfo::new(desc("Add", 1), CacheItemId(1), at(1)));
        state.insert(CacheInfo::new(desc("Mul", 1), CacheItemId(2), at(2)));

        let removed = state.remove_items(&[CacheItemId(1)]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].item_id(), CacheItemId(1));
        assert_eq!(state.depth(), 1);
        assert_eq!(state.bucket_count(), 1);

        assert!(state.remove_items(&[]).is_empty());
    }

    #[test]
    fn test_remove_where_predicate() {
        let mut state = CacheState::new();
        for i in 0..6 {
            state.insert(CacheInfo::new(desc("Add", i), CacheItemId(i), at(i)));
        }

        let removed = state.remove_where(|info| info.item_id().0 % 2 == 0);
        assert_eq!(removed.len(), 3);
        assert_eq!(state.depth(), 3);
        assert!(state.iter().all(|info| info.item_id().0 % 2 == 1));
    }

    #[test]
    fn test_consistency_detects_duplicates() {
        let mut state = CacheState::new();
        state.insert(CacheInfo::new(desc("Add", 1), CacheItemId(1), at(1)));
        assert!(state.check_consistency().is_ok());

        // bypass insert() to plant a duplicate
        let dup = CacheInfo::new(desc("Add", 1), CacheItemId(2), at(2));
        state.buckets.get_mut(&dup.desc_hash()).unwrap().push(dup);

        assert!(matches!(
            state.check_consistency(),
            Err(KcacheError::InvariantViolation(_))
        ));
    }
}
