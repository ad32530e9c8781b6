//! User accounts: model, storage and management endpoints.

pub mod routes;
pub mod storage;

pub use routes::{AddUserRequest, SetActiveRequest, SetActiveResponse};
pub use storage::{MAX_USERNAME_LEN, Role, StoredUser, UnknownRole, UserStorage, UserSummary};
