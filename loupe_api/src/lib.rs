//! Shared Loupe data models consumed by the core library and provider crates.

pub mod discussion;
pub mod file;
pub mod review;
pub mod settings;

pub use discussion::*;
pub use file::*;
pub use review::*;
pub use settings::*;
