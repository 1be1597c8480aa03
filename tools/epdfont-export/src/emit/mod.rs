//! Output emitters
//!
//! Both consume the same [`CompiledFont`](crate::model::CompiledFont):
//! - [`header`] - C header with static arrays, linked into firmware
//! - [`fontbin`] - `.fontbin` binary, input to the partition packer

pub mod fontbin;
pub mod header;

pub use fontbin::to_fontbin;
pub use header::{render_header, Banner};
