//! Level and configuration files for Voltrail.
//!
//! Levels and configs can be written in RON, TOML or JSON; the format is
//! picked from the file extension.

pub mod level;
pub mod loader;
pub mod schema;

pub use level::{build_level, load_config, load_level};
pub use loader::{DataLoadError, Format};
pub use schema::{BlockData, LevelData};
