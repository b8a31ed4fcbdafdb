//! Authentication service models

pub mod token;
pub mod user;

pub use token::{RefreshTokenRequest, TokenResponse};
pub use user::{GoogleCallbackQuery, LoginRequest, RegisterRequest};
