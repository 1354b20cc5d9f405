//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled    |
//! |-----------|---------------------|
//! | `session` | `Session`           |
//! | `report`  | `Report`, `Health`  |
//! | `config`  | `Config`            |

pub mod config;
pub mod report;
pub mod session;

pub use config::cmd_config;
pub use report::{cmd_health, cmd_report};
pub use session::cmd_session;
