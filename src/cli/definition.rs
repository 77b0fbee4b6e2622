// Shared by the binary (src/cli/mod.rs) and build.rs, which generates
// completions and the man page from it. Keep it free of `use` items and of
// references to library types.

/// Bulk-load CSV files into ClickHouse
#[derive(Parser, Debug)]
#[command(
    name = "chload",
    about = "Load a CSV file into a ClickHouse table, creating the table from the data",
    version = VERSION,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report per-statement and per-column detail
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where the rows come from and what table they describe.
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// CSV file with a header row
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Destination table, 'table' or 'database.table'
    #[arg(short, long)]
    pub table: String,

    /// Primary key column, as written in the header or normalized
    #[arg(short = 'k', long)]
    pub primary_key: String,

    /// Rows per batch
    #[arg(long, default_value = "100000")]
    pub batch_size: usize,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Extra cell value to treat as missing (repeatable)
    #[arg(long = "na-value", value_name = "TOKEN")]
    pub na_values: Vec<String>,

    /// Replace a column's ClickHouse type, e.g. 'id=UInt64' (repeatable)
    #[arg(long = "type", value_name = "COLUMN=TYPE")]
    pub type_overrides: Vec<String>,
}

/// ClickHouse HTTP connection settings.
#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// ClickHouse HTTP endpoint
    #[arg(long, env = "CHLOAD_URL", default_value = "http://127.0.0.1:8123")]
    pub url: String,

    /// Database for unqualified table names
    #[arg(long, env = "CHLOAD_DATABASE")]
    pub database: Option<String>,

    /// ClickHouse user
    #[arg(long, env = "CHLOAD_USER")]
    pub user: Option<String>,

    /// ClickHouse password
    #[arg(long, env = "CHLOAD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "300")]
    pub timeout: u64,
}

/// Output format for the plan subcommand
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// DROP and CREATE statements
    Ddl,
    /// Identifier, dtype and type maps plus the schema
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a CSV file, dropping and recreating the destination table
    Load {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Load into an in-memory store; nothing is sent to ClickHouse
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the table a load would create, reading only the first batch
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "ddl")]
        format: PlanFormat,

        /// Output file (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
