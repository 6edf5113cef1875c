pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "crud-list")]
#[command(about = "Preview how listing requests translate into search and SQL queries")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Normalize a listing request against a column schema")]
    Extract {
        #[command(flatten)]
        input: commands::list::ListInput,
    },

    #[command(about = "Generate the search-index query for a listing request")]
    Search {
        #[command(flatten)]
        input: commands::list::ListInput,
    },

    #[command(about = "Generate the SQL WHERE clause for a listing request")]
    Sql {
        #[command(flatten)]
        input: commands::list::ListInput,
        #[arg(long, help = "Render a full paged SELECT for this table")]
        table: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Extract { input } => commands::list::extract(input, output_format),
        Commands::Search { input } => commands::list::search(input, output_format),
        Commands::Sql { input, table } => commands::list::sql(input, table, output_format),
    }
}
