// region:    --- Modules

pub mod dom;
pub(crate) mod markup;
pub mod selector;
pub(crate) mod style;

// endregion: --- Modules
