//! Out-of-band download directives embedded in PTY output.
//!
//! The remote side requests a file download by printing
//! `ESC ] FILE;download:path=<path>,name=<name> BEL` on the PTY's stdout.
//! The path ends at the first `,` and the name at the first BEL; neither
//! delimiter can be escaped.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref DIRECTIVE: Regex =
        Regex::new(r"(?-u)\x1b\]FILE;download:path=([^,]+),name=([^\x07]+)\x07")
            .expect("directive pattern is valid");
}

/// A request to fetch and save a file from the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobDirective {
    /// Remote path of the file
    pub path: String,
    /// Name to save the file under
    pub filename: String,
}

/// Result of scanning one output chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// First directive found in the chunk, if any
    pub directive: Option<OobDirective>,
    /// The chunk with every directive removed
    pub stripped: Vec<u8>,
}

/// Scanner for download directives in raw terminal output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OobExtractor;

impl OobExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Strip all directives from `chunk` and report the first one.
    ///
    /// Matches are non-overlapping and taken left to right. Later directives
    /// in the same chunk are removed but not reported. A directive split
    /// across two chunks is not recognised.
    pub fn extract(&self, chunk: &[u8]) -> Extraction {
        let directive = DIRECTIVE.captures(chunk).map(|caps| OobDirective {
            path: String::from_utf8_lossy(&caps[1]).into_owned(),
            filename: String::from_utf8_lossy(&caps[2]).into_owned(),
        });

        let stripped = match DIRECTIVE.replace_all(chunk, &b""[..]) {
            Cow::Borrowed(unchanged) => unchanged.to_vec(),
            Cow::Owned(stripped) => stripped,
        };

        Extraction {
            directive,
            stripped,
        }
    }

    /// Every directive in `chunk`, in order.
    pub fn scan_all(&self, chunk: &[u8]) -> Vec<OobDirective> {
        DIRECTIVE
            .captures_iter(chunk)
            .map(|caps| OobDirective {
                path: String::from_utf8_lossy(&caps[1]).into_owned(),
                filename: String::from_utf8_lossy(&caps[2]).into_owned(),
            })
            .collect()
    }
}
