mod changes;
mod config;
mod error;
mod mime;
mod object;
mod pager;
pub mod paths;
mod permissions;
mod remote;
mod resolver;
mod upsert;

pub use changes::ChangeEvent;
pub use config::RemoteConfig;
pub use error::RemoteError;
pub use mime::MimeResolver;
pub use object::{LocalObject, RemoteObject};
pub use pager::{Page, PageStream};
pub use permissions::{AccountType, Role};
pub use remote::{ROOT_ID, Remote};
pub use upsert::{ChecksumOracle, DiffOracle, Differences, UpsertOptions, UpsertRequest};
