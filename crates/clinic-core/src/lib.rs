//! # Clinic Core
//!
//! Shared building blocks of the clinical-records access guard:
//! - caller roles and named role sets
//! - the verified identity carried through a request
//! - configuration loading (file + environment)
//! - logging infrastructure

pub mod config;
pub mod domain;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use logging::*;
