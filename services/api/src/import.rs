use crate::infra::build_directory_service;
use clap::Args;
use hive_directory::config::AppConfig;
use hive_directory::directory::{parse_rows_from_path, ImportSummary};
use hive_directory::error::AppError;
use hive_directory::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV export with username,email,first_name,last_name,organization columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// JSON fixture to seed organizations before importing (overrides APP_FIXTURES)
    #[arg(long)]
    pub(crate) fixtures: Option<PathBuf>,
    /// Mark every imported account as notified after listing it
    #[arg(long)]
    pub(crate) mark_notified: bool,
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs {
        csv,
        fixtures,
        mark_notified,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let fixtures = fixtures.or_else(|| config.directory.fixtures.clone());
    let service = build_directory_service(&config.directory, fixtures.as_deref())?;

    let rows = parse_rows_from_path(&csv)?;
    let summary = service.import_users(rows)?;
    render_summary(&summary);

    let pending = service.pending_import_notifications()?;
    if pending.is_empty() {
        println!("\nNo accounts awaiting a welcome e-mail.");
        return Ok(());
    }

    println!("\nAwaiting welcome e-mail ({})", pending.len());
    for user in &pending {
        println!("  {:<20} {}", user.username, user.email);
        if mark_notified {
            service.mark_import_notified(&user.username)?;
        }
    }
    if mark_notified {
        println!("Marked {} account(s) as notified.", pending.len());
    }

    Ok(())
}

fn render_summary(summary: &ImportSummary) {
    println!("Imported {} account(s)", summary.created.len());
    for account in &summary.created {
        match &account.organization {
            Some(slug) => println!("  + {:<20} {}", account.username, slug),
            None => println!("  + {:<20} (no organization)", account.username),
        }
    }

    if !summary.skipped.is_empty() {
        println!("Skipped {} row(s)", summary.skipped.len());
        for row in &summary.skipped {
            println!("  - {:<20} {}", row.username, row.reason);
        }
    }
}
