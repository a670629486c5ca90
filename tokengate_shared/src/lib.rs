// tokengate_shared: storage primitives and traits shared by the service

pub mod auth_backend;
pub mod codec;
pub mod store;

pub use auth_backend::{AuthBackend, AuthError};
pub use codec::{PersistenceError, StoreFile};
pub use store::ConcurrentStore;
