//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(
    name = "webterm",
    about = "Attach the local terminal to a remote PTY session",
    author,
    version,
    after_help = "Press Ctrl-] to detach."
)]
pub struct Args {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "YAML client configuration"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "URL",
        help = "Server base URL, overrides server.base_url"
    )]
    pub server: Option<String>,

    #[arg(value_name = "SESSION_ID", help = "Session to attach to")]
    pub session_id: String,
}
