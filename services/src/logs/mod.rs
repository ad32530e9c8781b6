//! Append-only audit log.

pub mod routes;
pub mod storage;

pub use routes::NewLogRequest;
pub use storage::{
    LogEntry, LogStorage, MAX_LOG_MESSAGE_LEN, MAX_LOG_TYPE_LEN, MAX_LOG_USERNAME_LEN,
};
