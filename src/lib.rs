// region:    --- Modules

mod error;
mod modifier;
mod options;

pub mod support;

pub use error::{Error, Result};
pub use modifier::*;
pub use options::*;
pub use support::dom::{Document, Event, Handle, Listener, NodeData};

// endregion: --- Modules
