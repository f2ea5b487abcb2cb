use crate::api::{
    GraphClient, GraphSessionProvider, NoSessionProvider, ReqwestTransport, RetryExecutor, SessionProvider,
    StaticTokenProvider,
};
use crate::config::{ClientConfig, WriterConfig};
use crate::error::SheetResult;
use crate::workbooks::WorkbooksResolver;
use crate::writer::{csv_rows, input_csv, SheetProvider, Writer};
use colored::Colorize;
use std::path::PathBuf;

/// Connection settings shared by all commands
#[derive(Debug, Clone)]
pub struct Connection {
    pub access_token: String,
    pub base_url: String,
}

impl Connection {
    fn client(&self, config: ClientConfig) -> SheetResult<GraphClient> {
        let executor = RetryExecutor::new(
            ReqwestTransport::new(config.timeout)?,
            StaticTokenProvider::new(self.access_token.clone()),
            self.base_url.clone(),
            config.retry,
        );
        Ok(GraphClient::new(executor, config.batch_cap))
    }
}

/// Execute the write command
pub fn write(connection: &Connection, config_path: PathBuf, input: PathBuf, verbose: bool) -> SheetResult<()> {
    println!("{}", "📝 Sheetwriter - Writing rows".bold().green());
    println!("   Config: {}", config_path.display());

    let config = WriterConfig::from_path(&config_path)?;
    let csv_path = input_csv(&input)?;
    println!("   Input:  {}\n", csv_path.display());

    let client = connection.client(config.client_config())?;
    let sheet = SheetProvider::new(&client, &config).sheet()?;
    if verbose {
        println!("   Drive:     {}", sheet.drive_id);
        println!("   File:      {}", sheet.file_id);
        println!("   Worksheet: {} ({})", sheet.name.bright_blue().bold(), sheet.worksheet_id);
        println!();
    }

    let graph_sessions;
    let sessions: &dyn SessionProvider = if config.use_session {
        graph_sessions = GraphSessionProvider::new(client.executor());
        &graph_sessions
    } else {
        &NoSessionProvider
    };

    let summary = Writer::new(&client, sessions, &config).write(&sheet, csv_rows(&csv_path)?)?;
    match summary {
        Some(summary) => {
            let mode = if summary.sheet_cleared { "overwritten" } else { "appended" };
            println!(
                "{} {} rows written in {} chunks ({})",
                "✅".green(),
                summary.rows.to_string().bold(),
                summary.chunks,
                mode
            );
        }
        None => println!("{} Input is empty, nothing written", "⚠️".yellow()),
    }

    Ok(())
}

/// Execute the create-worksheet command
pub fn create_worksheet(connection: &Connection, config_path: PathBuf) -> SheetResult<()> {
    let config = WriterConfig::from_path(&config_path)?;
    let client = connection.client(config.client_config())?;
    let sheet = SheetProvider::new(&client, &config).create_worksheet()?;

    println!(
        "{} Worksheet {} created ({})",
        "✅".green(),
        sheet.name.bright_blue().bold(),
        sheet.worksheet_id
    );
    Ok(())
}

/// Execute the search command
pub fn search(connection: &Connection, locator: &str) -> SheetResult<()> {
    let client = connection.client(ClientConfig::default())?;
    let file = WorkbooksResolver::new(&client).search(locator)?;
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}

/// Execute the sheets command
pub fn sheets(connection: &Connection, locator: &str) -> SheetResult<()> {
    let client = connection.client(ClientConfig::default())?;
    let file = WorkbooksResolver::new(&client).search(locator)?;
    let sheets = client.sheets(&file.drive_id, &file.file_id, None)?;

    println!("{}", format!("📋 Worksheets in {}", file.full_path()).bold().cyan());
    for sheet in &sheets {
        let columns = sheet
            .header
            .as_ref()
            .map(|h| crate::format::format_list(h.columns()))
            .unwrap_or_else(|| "(empty)".to_string());
        println!(
            "   {} {} {}",
            format!("#{}", sheet.position).dimmed(),
            sheet.name.bright_blue().bold(),
            columns
        );
    }
    Ok(())
}
