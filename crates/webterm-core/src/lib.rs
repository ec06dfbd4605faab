//! # webterm-core
//!
//! Core types for the webterm terminal client.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other webterm crates. It provides:
//!
//! - Geometry types (Geometry, ProposedDimensions)
//! - Wire frames and the frame codec
//! - Out-of-band download directive extraction
//! - Reconnect policy and client configuration
//! - Endpoint construction
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - the transport crate and the binary
//! depend on this one, but this crate performs no I/O of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod oob;
pub mod policy;

// Re-export commonly used types
pub use config::{ClientConfig, DownloadSettings, ResizeSettings, ServerSettings};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use frame::{ClientFrame, FrameCodec, InboundFrame};
pub use geometry::{Geometry, ProposedDimensions};
pub use oob::{Extraction, OobDirective, OobExtractor};
pub use policy::ReconnectPolicy;
