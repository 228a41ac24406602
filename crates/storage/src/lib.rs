//! Object-storage access and the concurrent dataset mover.
//!
//! [`client::BucketClient`] is a thin capability wrapper over an
//! S3-compatible bucket, constructed per operation from a
//! [`descriptor::BucketDescriptor`]. [`mover::Mover`] drives whole-dataset
//! transfers: staging download, bounded fan-out upload, partial-failure
//! aggregation, and staging cleanup.

pub mod client;
pub mod descriptor;
pub mod error;
pub mod mover;
pub mod source;

pub use client::{BucketClient, ObjectStore};
pub use descriptor::BucketDescriptor;
pub use error::TransferError;
pub use mover::Mover;
pub use source::{DatasetFetcher, DatasetSource, HttpFetcher};
