use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::Overrides;

/// Chat with your own documents.
///
/// Files given with `--file` are chunked, embedded and indexed in memory;
/// each message is then answered from the passages closest to it.
#[derive(Parser, Debug)]
#[command(name = "ragchat", version, about)]
pub struct Cli {
    /// Settings file (TOML). Built-in offline defaults apply without one.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read provider keys from this file instead of `.env`.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index the files and start a conversation.
    Chat(ChatArgs),
    /// Index the files and report what was stored, without chatting.
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// Text or markdown file to index. Repeat for several files.
    #[arg(short, long = "file", value_name = "PATH", required = true)]
    pub files: Vec<PathBuf>,

    /// Passages retrieved per message.
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Maximum passage length in characters.
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Characters shared by neighbouring passages.
    #[arg(long)]
    pub overlap: Option<usize>,
}

impl CorpusArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides { top_k: self.top_k, max_length: self.max_length, overlap: self.overlap }
    }
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Read messages line by line from stdin without line editing.
    #[arg(long)]
    pub plain: bool,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Print every passage, not only the per-file summary.
    #[arg(long)]
    pub show_passages: bool,
}

impl Cli {
    /// Default log directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn corpus(&self) -> &CorpusArgs {
        match &self.command {
            Command::Chat(args) => &args.corpus,
            Command::Ingest(args) => &args.corpus,
        }
    }
}
