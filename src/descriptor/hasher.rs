//! Funções de hash do descritor de compilação.
//!
//! Ambos os hashes são SHA256 sobre uma codificação canônica com prefixo
//! de tamanho, truncados para 64 bits. O resultado é estável entre
//! execuções do processo.

use sha2::{Digest, Sha256};

use crate::types::CacheHashKey;

use super::compile_desc::CompileCacheDesc;

const DESC_DOMAIN: &[u8] = b"kcache/desc/v1";
const SHAPE_DOMAIN: &[u8] = b"kcache/shape/v1";

/// Calcula as chaves de hash de um [`CompileCacheDesc`].
pub struct CacheHasher;

impl CacheHasher {
    /// Hash sobre tipo do operador, id, atributos, formatos e tipos de dado.
    ///
    /// Nenhum campo de shape participa: descritores que diferem apenas no
    /// shape caem no mesmo bucket.
    pub fn desc_hash(desc: &CompileCacheDesc) -> CacheHashKey {
        let mut hasher = Sha256::new();
        hasher.update(DESC_DOMAIN);
        update_bytes(&mut hasher, desc.op_type.as_bytes());
        hasher.update(desc.unique_id.to_le_bytes());

        update_len(&mut hasher, desc.attrs.len());
        for attr in &desc.attrs {
            update_bytes(&mut hasher, attr.as_bytes());
        }

        update_len(&mut hasher, desc.tensors.len());
        for tensor in &desc.tensors {
            hasher.update(tensor.format.code().to_le_bytes());
            hasher.update(tensor.origin_format.code().to_le_bytes());
            hasher.update(tensor.data_type.code().to_le_bytes());
        }

        finish(hasher)
    }

    /// Hash sobre shape, shape original e faixas de cada tensor.
    pub fn shape_hash(desc: &CompileCacheDesc) -> CacheHashKey {
        let mut hasher = Sha256::new();
        hasher.update(SHAPE_DOMAIN);

        update_len(&mut hasher, desc.tensors.len());
        for tensor in &desc.tensors {
            update_dims(&mut hasher, &tensor.shape);
            update_dims(&mut hasher, &tensor.origin_shape);
            update_len(&mut hasher, tensor.shape_range.len());
            for (min, max) in &tensor.shape_range {
                hasher.update(min.to_le_bytes());
                hasher.update(max.to_le_bytes());
            }
        }

        finish(hasher)
    }
}

fn update_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_le_bytes());
}

fn update_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    update_len(hasher, bytes.len());
    hasher.update(bytes);
}

fn update_dims(hasher: &mut Sha256, dims: &[i64]) {
    update_len(hasher, dims.len());
    for dim in dims {
        hasher.update(dim.to_le_bytes());
    }
}

fn finish(hasher: Sha256) -> CacheHashKey {
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    CacheHashKey(u64::from_le_bytes(prefix))
}
