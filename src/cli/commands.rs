use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "notebox")]
#[command(version, about = "A small notes service and its command line client")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Base URL of a running notes API
    #[arg(long, global = true, env = "NOTEBOX_SERVER", conflicts_with = "database")]
    pub server: Option<String>,

    /// Use a local database file instead of a server
    #[arg(long, global = true, env = "NOTEBOX_DATABASE")]
    pub database: Option<PathBuf>,

    /// Preferences file (pinned notes, group index)
    #[arg(long, global = true)]
    pub prefs: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// List notes, pinned first
    List {
        /// Only notes whose title or content contains this text
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Sort order (new, old, title)
        #[arg(long, default_value = "new")]
        sort: String,

        /// Only notes in this group
        #[arg(long, short = 'g')]
        group: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get a single note by ID
    Get {
        /// Note ID or unique prefix like "a1b2c"
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new note
    Add {
        /// Note title
        title: String,

        /// Note content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Group label
        #[arg(long, short = 'g')]
        group: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a note. Omitted fields keep their current value
    Update {
        /// Note ID or unique prefix
        id: String,

        /// New title
        #[arg(long, short = 't')]
        title: Option<String>,

        /// New content
        #[arg(long, short = 'c')]
        content: Option<String>,

        /// Move the note to this group
        #[arg(long, short = 'g', conflicts_with = "no_group")]
        group: Option<String>,

        /// Remove the note from its group
        #[arg(long)]
        no_group: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID or unique prefix
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Pin or unpin a note on this machine
    Pin {
        /// Note ID or unique prefix
        id: String,
    },

    /// List group labels in use
    Groups,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}
