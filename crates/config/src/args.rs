use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to .env file (e.g., .env.mainnet)
    #[arg(short, long, default_value = ".env")]
    pub env_file: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the operation table
    Ops(TableArgs),
    /// Query the block table
    Blocks(TableArgs),
    /// Fetch a single operation group by hash
    Op {
        /// Operation hash (o...)
        hash: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct TableArgs {
    /// Comma separated column list, defaults to all non-notable columns
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    /// Continue after this row id
    #[arg(long)]
    pub cursor: Option<u64>,

    /// Sort order (asc or desc)
    #[arg(long, default_value = "asc")]
    pub order: String,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
