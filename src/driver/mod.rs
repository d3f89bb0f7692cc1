//! Driver de compilação simulado.
//!
//! Reproduz traces de requisições contra um [`CachePolicyManager`] como
//! fariam as threads de um compilador real, usando um alocador de ids no
//! lugar dos artefatos compilados.
//!
//! [`CachePolicyManager`]: crate::policy::CachePolicyManager

mod allocator;
mod replay;
mod trace;

pub use allocator::ItemIdAllocator;
pub use replay::{ProgressFn, ReplayDriver, ReplayReport, ReplayTally};
pub use trace::Trace;
