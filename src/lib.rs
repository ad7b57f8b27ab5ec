// Library surface for headless/integration tests and reuse.
// The binary in main.rs only parses arguments and wires these together.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod gauss;
pub mod histogram;
pub mod input;
pub mod layout;
pub mod quotes;
pub mod race;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod ui;
pub mod util;

pub use error::{Result, WpmError};
