//! Context scoping
//!
//! An external collaborator (the context manager) tracks which "context"
//! is active: a named selection of workbooks. The resolver turns that into
//! a `ContextScope` for the current request, degrading to unscoped on any
//! failure so a broken context manager never breaks chat.

mod resolver;
mod traits;

pub use resolver::ScopeResolver;
pub use traits::{ActiveScope, ScopeService, ScopeServiceError};
