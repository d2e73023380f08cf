//! BRD core: download the releases a deployment manifest references, verify
//! them, pack them into a single zip and add a patch document that points the
//! manifest at the packed copies.

pub mod archive;
pub mod bundle;
pub mod checksum;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod instrument;
pub mod logging;
pub mod naming;
pub mod packer;
pub mod patch;
pub mod release;

pub use error::{DispatchError, PackError};
