pub mod auth;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod host;
pub mod identifier;
pub mod mode;
pub mod source;
pub mod testing;
pub mod translate;
pub mod transport;
pub mod types;

pub use auth::*;
pub use client::*;
pub use config::*;
pub use connector::*;
pub use error::*;
pub use host::*;
pub use identifier::*;
pub use mode::*;
pub use source::*;
pub use translate::*;
pub use transport::*;
pub use types::*;
