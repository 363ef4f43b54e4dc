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

pub mod agents;
pub mod app;
pub mod cache;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod index;
pub mod prompt;
pub mod retry;
pub mod store;
pub mod utils;
pub mod workflow;

pub use app::App;
pub use config::Config;
pub use error::{DraftError, Result};
