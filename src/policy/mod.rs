//! Subsistema de política do cache de compilação.
//!
//! Decide, para cada requisição de compilação, se um artefato já compilado
//! pode ser reutilizado e quais artefatos remover quando o cache passa da
//! capacidade.
//!
//! ## Componentes
//!
//! - [`CacheState`] - índice `desc_hash` → bucket de [`CacheInfo`]
//! - [`MatchPolicy`] - decide acertos ([`ExactOnlyMatch`])
//! - [`AgingPolicy`] - decide evicções e admissões ([`LruKAging`], [`LruAging`])
//! - [`CachePolicyManager`] - orquestra tudo sob a disciplina de locks
//!
//! ## Exemplo
//!
//! ```rust,ignore
//! use kcache::policy::CachePolicyManager;
//! use kcache::types::config::CacheConfig;
//!
//! let manager = CachePolicyManager::from_config(&CacheConfig::new(64, 2))?;
//!
//! let mut item = manager.query(&desc);
//! if !item.is_valid() {
//!     item = manager.add_if_eligible(&desc, || compiler.compile(&desc)).item_id;
//! }
//! ```

mod aging;
mod clock;
mod manager;
mod matching;
mod occurrence;
mod state;

pub use aging::{create_aging_policy, AgingPolicy, LruAging, LruKAging};
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{Admission, AdmissionStatus, CachePolicyManager, CacheStats};
pub use matching::{create_match_policy, ExactOnlyMatch, MatchPolicy};
pub use occurrence::OccurrenceTable;
pub use state::{CacheInfo, CacheState};
