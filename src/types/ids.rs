//! Identificadores usados como chaves e handles do cache.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chave de hash de largura fixa usada para indexar o estado do cache.
///
/// Colisões são possíveis: a chave apenas filtra candidatos, a identidade
/// é sempre decidida pela igualdade estrutural do descritor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheHashKey(pub u64);

impl fmt::Display for CacheHashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0.to_be_bytes()))
    }
}

/// Handle opaco de um artefato compilado.
///
/// Produzido pelo compilador externo; o motor de política apenas
/// armazena e devolve o valor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheItemId(pub i64);

impl CacheItemId {
    /// Sentinela "nenhum item" (miss, não elegível ou falha de compilação).
    pub const INVALID: CacheItemId = CacheItemId(-1);

    /// Verifica se o id referencia um artefato.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for CacheItemId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for CacheItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}
