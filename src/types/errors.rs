//! Tipos de erro do kcache.

use thiserror::Error;

/// Tipo de resultado padrão do kcache.
pub type KcacheResult<T> = Result<T, KcacheError>;

/// Erros possíveis no kcache.
///
/// O caminho quente (query/admissão) nunca retorna estes erros: falhas de
/// lookup e de compilação são sinalizadas por `CacheItemId::INVALID`.
#[derive(Error, Debug)]
pub enum KcacheError {
    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "cli")]
    #[error("Erro no prompt interativo: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Invariante do cache violado: {0}")]
    InvariantViolation(String),

    #[error("{0}")]
    Other(String),
}

impl KcacheError {
    /// Cria um erro genérico.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
