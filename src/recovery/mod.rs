//! Write-ahead logging.
//!
//! Only the durability contract the buffer pool depends on lives here.

mod log_manager;

pub use log_manager::{FileLogManager, LogManager};
