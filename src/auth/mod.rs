// Authentication module
// Credentials, per-request authorization and token acquisition

mod token;
mod types;

pub use token::fetch_token;
pub use types::{AuthDetails, AuthScheme, Credentials, TokenResponse};
