//! Descritores de compilação e funções de hash do cache.
//!
//! Um descritor descreve *o que* está sendo compilado: tipo do operador,
//! atributos e informações de shape dos tensores. O motor de política
//! não interpreta o descritor, apenas precisa de:
//!
//! - `desc_hash`: hash sobre os campos que não são shape
//! - `shape_hash`: hash apenas sobre os campos de shape
//! - `is_same`: igualdade estrutural completa
//!
//! Os hashes são filtros rápidos, nunca identidade.

mod compile_desc;
mod hasher;

pub use compile_desc::{AttrBlob, CompileCacheDesc, DataType, Format, TensorInfo};
pub use hasher::CacheHasher;

use std::fmt::Debug;

use crate::types::CacheHashKey;

/// Trait para descritores armazenáveis no cache.
///
/// Implementações devem garantir que descritores `is_same` produzam os
/// mesmos `desc_hash` e `shape_hash`.
pub trait CacheDesc: Clone + Debug + Send + Sync + 'static {
    /// Hash independente de shape (chave do bucket).
    fn desc_hash(&self) -> CacheHashKey;

    /// Hash apenas das informações de shape.
    fn shape_hash(&self) -> CacheHashKey;

    /// Igualdade estrutural completa.
    fn is_same(&self, other: &Self) -> bool;
}

impl CacheDesc for CompileCacheDesc {
    fn desc_hash(&self) -> CacheHashKey {
        CacheHasher::desc_hash(self)
    }

    fn shape_hash(&self) -> CacheHashKey {
        CacheHasher::shape_hash(self)
    }

    fn is_same(&self, other: &Self) -> bool {
        CompileCacheDesc::is_same_compile_desc(self, other)
    }
}
