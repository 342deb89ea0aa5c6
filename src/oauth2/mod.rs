//!
//! # OAuth2 Client Authority
//!
//! The service acts as the OAuth2 authorization authority for its registered
//! API clients: `authority` holds the policy callbacks (scope and principal
//! resolution, grant policy, bearer-token validation), `store` holds issued
//! bearer tokens, and `routes` serves the token endpoint and the
//! cookie-authenticated client management surface.

pub mod authority;
pub mod routes;
pub mod store;

pub use authority::ClientAuthority;
pub use store::{BearerToken, MemoryTokenStore, TokenStore};
