use crate::database::SqlStorage;
use crate::logs::LogStorage;
use crate::pins::PinStorage;
use crate::users::UserStorage;

/// Every storage capability a handler can ask for.
///
/// Implemented automatically for any type that implements the individual
/// storage traits, which today means `PgStorage` and `MockStorage`.
pub trait AdminStorage: SqlStorage + UserStorage + LogStorage + PinStorage {}

impl<T> AdminStorage for T where T: SqlStorage + UserStorage + LogStorage + PinStorage {}

/// Router state shared by all handlers.
#[derive(Clone)]
pub struct AppState<S> {
    pub storage: S,
}

impl<S> AppState<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}
