//! Stored record types.

pub mod user;

pub use user::User;
