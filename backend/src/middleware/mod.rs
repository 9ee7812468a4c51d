pub mod auth;
pub mod csrf;
pub mod role_guard;

pub use auth::*;
pub use csrf::*;
pub use role_guard::*;
