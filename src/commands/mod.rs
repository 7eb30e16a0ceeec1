//! Commands Layer
//!
//! Entry points the presentation layer calls. Errors cross this boundary
//! as display strings.

mod list_cmd;
mod session_cmd;
mod task_cmd;

pub use list_cmd::*;
pub use session_cmd::*;
pub use task_cmd::*;
