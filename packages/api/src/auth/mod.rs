//! Authentication: the session store and the backend it talks to.

mod backend;
mod memory;
mod session;

pub use backend::AuthBackend;
pub use memory::MemoryAuth;
pub use session::{AuthPhase, ListenerId, Session, SessionChange, SessionStore};
