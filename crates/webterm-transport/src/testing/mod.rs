//! Test doubles for driving a transport without a network or a runtime.
//!
//! Every double is a cheap handle over shared state: clone it, box one copy
//! into the transport, and inspect the other.

mod doubles;

pub use doubles::{
    ManualScheduler, MockConnector, MockSurface, RecordingDownloads, RecordingNotices,
};
