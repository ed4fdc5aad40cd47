use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "folio",
    version,
    about = "A terminal flipbook reader for serialized web books.",
    long_about = None
)]
pub struct Cli {
    /// Dump the paginated pages instead of opening the reader
    #[clap(short, long)]
    pub dump_pages: bool,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Viewport width in columns for --dump-pages
    #[clap(long, value_name = "COLS", default_value_t = 120)]
    pub cols: u16,

    /// Viewport height in rows for --dump-pages
    #[clap(long, value_name = "ROWS", default_value_t = 40)]
    pub rows: u16,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Book content file (JSON)
    #[clap(name = "CONTENT")]
    pub content: Option<PathBuf>,
}
