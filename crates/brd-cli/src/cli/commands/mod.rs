//! CLI command handlers.

mod checksum;
mod pack;

pub use checksum::run_checksum;
pub use pack::{run_pack, PackArgs};
