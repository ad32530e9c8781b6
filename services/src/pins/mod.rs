//! Time-limited numeric PINs tied to user accounts.

pub mod generator;
pub mod routes;
pub mod service;
pub mod storage;

pub use generator::{PIN_LENGTH, PIN_TTL_MINUTES, generate_pin_code, pin_expiry};
pub use service::{IssuedPin, count_for_day, issue_pin, reset_for_day};
pub use storage::{DayWindow, OneTimePin, PinStorage};
