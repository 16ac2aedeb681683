//! ID-site session: token decoding, claims, the credential-rotating request
//! executor, the bootstrap handshake and the operations of a ready session.

mod bootstrap;
mod claims;
mod error;
mod executor;
pub mod jwt;
mod operations;
mod token_source;

pub use bootstrap::{Bootstrap, BootstrapState, IdSiteOptions};
pub use claims::{find_password_reset_token, Claims, ClaimsError, SessionContext};
pub use error::{ApiError, ArgumentError, RequestError, SessionError};
pub use executor::{ApiRequest, RequestExecutor};
pub use operations::{AccountStore, IdSite, LoginOptions, LoginRequest, PasswordResetRequest};
pub use token_source::TokenSource;
