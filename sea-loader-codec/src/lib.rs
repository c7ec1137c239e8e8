//! ### `sea-loader-codec`: the SeaLoader frame format
//!
//! Encodes a [`sea_loader_types::Point`] into a length-prefixed, self-describing binary [`Frame`],
//! and reads a stream of frames back as [`sea_loader_types::LogicalPoint`]s.
//! See the [`format`] module for the byte layout.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]

mod builder;
mod error;
pub mod format;
mod reader;
mod writer;

pub use builder::*;
pub use error::*;
pub use format::{
    decode, encode, encode_with, payload_size, Frame, PointView, TagValueView, MAX_FRAME_SIZE,
    PREFIX_SIZE,
};
pub use reader::*;
pub use writer::*;
