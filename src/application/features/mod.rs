//! Feature handlers registered with the dispatcher.

pub mod retired;
pub mod search;

pub use retired::{LEGACY_COMMANDS, RetiredComponent};
pub use search::{SearchFeature, SearchSettings, command_name};
