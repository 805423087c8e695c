//! CLI command handling

pub mod history;
pub mod output;
pub mod replay;
pub mod watch;

pub use history::*;
pub use output::*;
pub use replay::*;
pub use watch::*;
