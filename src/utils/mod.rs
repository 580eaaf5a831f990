// Shared utilities module
pub mod errors;
pub mod logging;
pub mod watch;

pub use errors::*;
pub use logging::*;
pub use watch::*;
