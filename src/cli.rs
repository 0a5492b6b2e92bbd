use clap::{Parser, Subcommand};

use crate::models::ItemKind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send natural-language input to the assistant and apply the result
    Chat {
        #[arg(value_name = "INPUT")]
        input: String,
    },
    /// List tasks
    Tasks {
        /// Filter by title or tag (substring match)
        #[arg(short, long)]
        query: Option<String>,
    },
    /// List schedules
    Schedules {
        #[arg(short, long)]
        query: Option<String>,
    },
    /// List logs
    Logs {
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Toggle a task's completion, located by fuzzy title match
    Done {
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Delete an item, located by fuzzy title match
    Remove {
        #[arg(value_enum, value_name = "KIND")]
        kind: ItemKind,
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
