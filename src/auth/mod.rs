//! Account credentials and login sessions

mod credentials;
mod sessions;

pub use credentials::CredentialStore;
pub use sessions::SessionManager;
