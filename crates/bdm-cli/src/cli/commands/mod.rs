//! CLI command implementations.

mod cancel_all;
mod get;
mod pause;
mod resume;

pub use cancel_all::run_cancel_all;
pub use get::{run_get, GetOptions};
pub use pause::{run_pause, run_pause_all};
pub use resume::{run_resume, run_resume_all};
