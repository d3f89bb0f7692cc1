//! # kcache
//!
//! Motor de política para cache de resultados de compilação de kernels.
//!
//! Um driver de compilação consulta o cache antes de compilar um operador.
//! No miss, compila e oferece o artefato ao cache, que só o admite depois
//! que o mesmo descritor foi visto K vezes (LRU-K). Quando a capacidade é
//! excedida, a entrada acessada há mais tempo é removida.
//!
//! ## Módulos
//!
//! - [`descriptor`] - Descritores de compilação e hashing
//! - [`policy`] - Estado, políticas de match e aging, gerenciador
//! - [`driver`] - Driver simulado para replay de traces
//! - [`cli`] - Interface de linha de comando
//! - [`types`] - Tipos compartilhados

#[cfg(feature = "cli")]
pub mod cli;
pub mod descriptor;
pub mod driver;
pub mod policy;
pub mod types;

pub use types::config::Config;
pub use types::errors::{KcacheError, KcacheResult};
