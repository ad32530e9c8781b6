//! Login, password hashing and session tokens.

pub mod password;
pub mod routes;
pub mod service;
pub mod session;

pub use routes::MessageResponse;
pub use service::{LoginError, LoginOutcome, login};
pub use session::{RequireAuth, SessionAuthError, SessionClaims, generate_session_token};
