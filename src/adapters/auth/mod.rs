//! Token verification adapters.

mod jwt;
mod static_verifier;

pub use jwt::{JwtConfig, JwtVerifier};
pub use static_verifier::StaticTokenVerifier;
