//! Session layer: JWT issuance/verification, the in-memory user registry,
//! and the authentication middleware gating protected routes.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod registry;

pub use middleware::{auth_middleware, AuthState};
pub use models::{AuthContext, Claims};
pub use registry::UserRegistry;
