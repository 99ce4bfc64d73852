//! Users and monetary accounts

mod models;
mod repository;

pub use models::{Account, User};
pub use repository::{AccountRepository, UserRepository};
