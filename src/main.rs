use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use royalbit_sheetwriter::cli::{self, Connection};
use royalbit_sheetwriter::config::DEFAULT_BASE_URL;
use royalbit_sheetwriter::error::SheetError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sheetwriter")]
#[command(about = "Write CSV tables into OneDrive and SharePoint Excel workbooks.")]
#[command(long_about = "Sheetwriter - CSV to Excel workbooks over the Microsoft Graph API

WORKBOOK LOCATORS:
  path/to/file.xlsx               File in your personal OneDrive
  drive://<driveId>/path/file.xlsx  File in a specific drive
  site://<siteName>/path/file.xlsx  File in a SharePoint site
  https://...                     Sharing link

COMMANDS:
  write             - Write a CSV file into the configured worksheet
  search            - Resolve a locator and print the file ids
  sheets            - List the worksheets of a workbook with their headers
  create-worksheet  - Create the configured worksheet, failing if it exists

EXAMPLES:
  sheetwriter write --config config.json data.csv
  sheetwriter search 'site://Finance/Reports/2024.xlsx'
  sheetwriter sheets 'drive://b!abc/Reports/2024.xlsx'
  sheetwriter create-worksheet --config config.json

Logging is controlled by RUST_LOG, e.g. RUST_LOG=royalbit_sheetwriter=debug")]
#[command(version)]
struct Cli {
    /// Bearer token for the Graph API
    #[arg(long, env = "SHEETWRITER_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    /// API base URL
    #[arg(long, env = "SHEETWRITER_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Write a CSV file into the configured worksheet.

The first CSV row is the header. Without 'append' the worksheet is cleared
first; with 'append' rows go below the existing data and an existing header
is kept.

CONFIG (JSON or YAML):
  {
    \"workbook\": {\"path\": \"Reports/2024.xlsx\"},
    \"worksheet\": {\"name\": \"Data\"},
    \"append\": false,
    \"bulkSize\": 10000
  }")]
    /// Write a CSV file into a worksheet
    Write {
        /// Writer configuration (JSON, or YAML by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// CSV file, or a directory holding exactly one CSV file
        input: PathBuf,

        /// Show the resolved target
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create the configured worksheet; it must not exist yet
    CreateWorksheet {
        /// Writer configuration with 'worksheet.name' set
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Resolve a workbook locator and print the file as JSON
    Search {
        /// Workbook locator
        locator: String,
    },

    /// List the worksheets of a workbook
    Sheets {
        /// Workbook locator
        locator: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "royalbit_sheetwriter=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let user_error = e
                .downcast_ref::<SheetError>()
                .is_some_and(SheetError::is_user_error);
            if user_error {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let connection = Connection {
        access_token: cli.access_token.ok_or_else(|| {
            SheetError::Config("Missing access token, use --access-token or SHEETWRITER_ACCESS_TOKEN".to_string())
        })?,
        base_url: cli.base_url,
    };

    match cli.command {
        Commands::Write {
            config,
            input,
            verbose,
        } => cli::write(&connection, config, input, verbose).context("Write failed")?,
        Commands::CreateWorksheet { config } => {
            cli::create_worksheet(&connection, config).context("Worksheet creation failed")?
        }
        Commands::Search { locator } => cli::search(&connection, &locator)?,
        Commands::Sheets { locator } => cli::sheets(&connection, &locator)?,
    }

    Ok(())
}
