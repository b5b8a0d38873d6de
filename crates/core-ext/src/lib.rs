//! Built-in modules: the extension set shipped with the terminal.
//!
//! Each module is self-contained and talks to the core exclusively
//! through the capability traits and `ModuleCtx`; none of them know
//! about each other.

mod dyncolors;
mod kbselect;
mod osc52;
mod pipe;
mod urlopen;

pub use dyncolors::DynColorsModule;
pub use kbselect::KbSelectModule;
pub use osc52::{Osc52Module, Selection};
pub use pipe::PipeModule;
pub use urlopen::UrlOpenModule;
