//! Trace de requisições de compilação em JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::CompileCacheDesc;
use crate::KcacheResult;

/// Sequência de requisições na ordem em que o driver as emitiria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Descritores requisitados.
    #[serde(default)]
    pub requests: Vec<CompileCacheDesc>,
}

impl Trace {
    /// Cria um trace a partir de uma lista de descritores.
    pub fn new(requests: Vec<CompileCacheDesc>) -> Self {
        Self { requests }
    }

    /// Lê um trace de um arquivo JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> KcacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Interpreta um trace a partir de uma string JSON.
    pub fn from_json(content: &str) -> KcacheResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Grava o trace como JSON formatado.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> KcacheResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Número de requisições.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Verifica se o trace está vazio.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
