//! Database access.

mod users;

pub use users::{PgUserDirectory, UserRepository};
