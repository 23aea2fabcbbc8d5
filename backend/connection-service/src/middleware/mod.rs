pub mod auth;

pub use auth::{verify_token, AuthedUser, Claims};
