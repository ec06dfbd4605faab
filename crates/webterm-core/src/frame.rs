//! Wire frames exchanged with the remote PTY.
//!
//! Only client-to-server traffic is structured: JSON control frames sent as
//! text. Everything the server sends is raw PTY output.

use serde::{Deserialize, Serialize};

use crate::{Geometry, Result};

/// A structured frame sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Keystrokes or pasted text for the shell
    Input {
        /// Already-encoded terminal input
        data: String,
    },
    /// Declared terminal geometry
    Resize {
        /// Number of columns
        cols: u16,
        /// Number of rows
        rows: u16,
    },
}

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Raw PTY bytes
    Binary(Vec<u8>),
    /// Text frame; carries PTY output the same way a binary frame does
    Text(String),
}

/// Encoder/decoder for the terminal wire protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Encode terminal input as a text frame.
    pub fn encode_input(data: &str) -> Result<String> {
        Self::encode(&ClientFrame::Input {
            data: data.to_string(),
        })
    }

    /// Encode a resize frame.
    pub fn encode_resize(geometry: Geometry) -> Result<String> {
        Self::encode(&ClientFrame::Resize {
            cols: geometry.cols(),
            rows: geometry.rows(),
        })
    }

    /// Encode any client frame.
    pub fn encode(frame: &ClientFrame) -> Result<String> {
        Ok(serde_json::to_string(frame)?)
    }

    /// Decode an inbound frame into the raw bytes it carries.
    pub fn decode_inbound(frame: InboundFrame) -> Vec<u8> {
        match frame {
            InboundFrame::Binary(bytes) => bytes,
            InboundFrame::Text(text) => text.into_bytes(),
        }
    }
}
