//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `sign`          | `Sign`                                             |
//! | `config`        | `Config`                                           |

pub mod config;
pub mod sign;

pub use config::cmd_config;
pub use sign::cmd_sign;
