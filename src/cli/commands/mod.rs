//! CLI command implementations

pub mod config;
pub mod scan;
pub mod status;

pub use config::execute as config;
pub use scan::execute as scan;
pub use status::execute as status;
