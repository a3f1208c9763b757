//! Command implementations for the wpdisco CLI
//!
//! Each command lives in its own submodule and reports success through its
//! return value; `main` turns that into the process exit code.

mod discover;
mod normalize;
mod rsd_link;

pub use discover::execute as discover;
pub use normalize::execute as normalize;
pub use rsd_link::execute as rsd_link;
