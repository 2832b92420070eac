use std::path::PathBuf;

use clap::Parser;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "vidtrack")]
#[command(about = "Upload a video for processing and follow its progress.", long_about = None)]
pub struct Cli {
    /// The video file to submit
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Server base URL, e.g. http://127.0.0.1:8000 (overrides the config file)
    #[arg(long, value_name = "URL")]
    pub server: Option<Url>,

    /// Reads settings from a RON config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Declared media type; guessed from the file extension when omitted
    #[arg(long, value_name = "TYPE")]
    pub mime: Option<String>,

    /// Log at debug level to both terminal and log file
    #[arg(short, long)]
    pub verbose: bool,
}
