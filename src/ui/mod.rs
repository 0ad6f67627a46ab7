pub mod format;
pub mod preview;
pub mod screen;
pub mod symbols;
