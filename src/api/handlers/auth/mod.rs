//! Signup, login, and the token gate in front of protected routes.

pub mod gate;
pub mod login;
pub mod signup;
pub mod state;
pub mod types;
mod utils;

pub use gate::{authorize, require_token, Principal};
pub use state::{AuthConfig, AuthState};
