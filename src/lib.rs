//! <div align="center">
//!
//!   <h1>SeaLoader</h1>
//!
//!   <p>
//!     <strong>🌊 Scan a frame stream and distribute it to a pool of loader workers</strong>
//!   </p>
//!
//! </div>
//!
//! SeaLoader is the ingestion half of a time-series benchmark. A data set is generated once,
//! serialized into a file of self-describing binary frames, and then replayed into a target
//! store by a fixed pool of concurrent workers.
//!
//! ## Architecture
//!
//! `sea-loader` is the facade crate re-exporting implementation from a number of sub-crates:
//!
//! + `sea-loader-types`: the data model, the collaborator traits and the error type
//! + `sea-loader-codec`: the frame format, with a reader and a writer
//!
//! This crate itself provides the scan-and-distribute engine:
//!
//! 1. A [`DataSource`] (usually a [`FrameReader`]) yields decoded points.
//! 2. The scanner assigns every point to a channel, with a [`PointIndexer`] or by hashing a meta field.
//! 3. Points are collected into batches, and full batches are handed over to the workers
//!    through a [`DuplexChannel`].
//! 4. Each worker runs a [`Processor`], which translates a batch into writes.
//!
//! There are two scanning policies:
//!
//! + [`scan_without_flow_control`] streams the input, and blocks when a channel is full.
//! + [`scan_with_batching_meta_fields`] groups the whole input by a meta field first, so that all points
//!   sharing one meta field value are contiguous. Dispatch never blocks until the very end.
//!
//! [`Loader`] wires everything together with a pool of OS threads.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]

mod batch;
mod channel;
mod indexer;
mod loader;
mod options;
mod scan;

pub use batch::*;
pub use channel::*;
pub use indexer::*;
pub use loader::*;
pub use options::*;
pub use scan::*;

pub use sea_loader_codec::*;
pub use sea_loader_types::*;
