//! # 🌊 SeaLoader Types
//!
//! This crate defines the data model and the collaborator traits of the SeaLoader pipeline,
//! but does not provide any implementation.
//!
//! A [`Point`] is what a [`Simulator`] produces. It is encoded into a frame, and decoded back
//! into a [`LogicalPoint`] by a [`DataSource`]. Decoded points are routed by a [`PointIndexer`]
//! into a [`Batch`], and batches are consumed by a [`Processor`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]

mod batch;
mod error;
mod headers;
mod logical;
mod point;
mod processor;
mod source;
mod value;

pub use batch::*;
pub use error::*;
pub use headers::*;
pub use logical::*;
pub use point::*;
pub use processor::*;
pub use source::*;
pub use value::*;

pub mod export;
