#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod protocol;
pub mod store;
pub mod stream;

pub use actions::ActionGateway;
pub use api::ApiClient;
pub use config::Config;
pub use error::{ActionError, ApiError, Result, StreamError, SyncError};
pub use store::{ConnectionHealth, ProtocolStore, SharedStore};
pub use stream::StreamController;
