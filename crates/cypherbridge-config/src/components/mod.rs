//! Configuration components
//!
//! One focused section per consumer: compiler, retry, connection, logging.

pub mod compiler;
pub mod connection;
pub mod logging;
pub mod retry;

pub use compiler::*;
pub use connection::*;
pub use logging::*;
pub use retry::*;
