use crate::tracing::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "docshelf")]
#[command(about = "Browse, search and relate a tree of Markdown documents over MCP", long_about = None)]
pub struct Cli {
    /// Directory holding the Markdown documents
    #[arg(default_value = ".")]
    pub docs_root: PathBuf,

    /// Config file (defaults to <config dir>/docshelf/config.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not build the search index at startup
    #[arg(long)]
    pub no_warm: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
