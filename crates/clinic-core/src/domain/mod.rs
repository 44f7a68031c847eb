//! Domain model.
//!
//! Caller roles and the identity a verified credential resolves to.

mod identity;
mod role;

pub use identity::{Identity, IdentityError};
pub use role::{Role, RoleSet};
