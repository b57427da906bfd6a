use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use common::config::Settings;
use starschema::logging::init_subscriber;
use starschema::{run_pipelines, PipelineSelection};
use std::process;

const DEFAULT_CONFIG: &str = "config/starschema.toml";

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

async fn run(matches: &ArgMatches, selection: PipelineSelection) -> anyhow::Result<bool> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG);

    let settings = Settings::new(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    init_subscriber(&settings.logging)?;

    let report = run_pipelines(&settings, selection)
        .await
        .context("Pipeline setup failed")?;
    report.log_summary();

    for outcome in &report.tables {
        match &outcome.result {
            Ok(write) => println!(
                "{:<10} ok      {} row(s), {} rejected -> {}",
                outcome.table, write.rows_written, write.rejected_rows, write.location
            ),
            Err(e) => println!("{:<10} FAILED  {}", outcome.table, e),
        }
    }
    Ok(report.is_success())
}

#[tokio::main]
async fn main() {
    let matches = Command::new("Star Schema ETL")
        .version("1.0")
        .about("Builds the songplays star schema from song and event JSON")
        .subcommand(
            Command::new("run")
                .about("Run the song catalog and event pipelines")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("songs")
                .about("Run the song catalog pipeline (songs, artists)")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("events")
                .about("Run the event pipeline (users, time, songplays)")
                .arg(config_arg()),
        )
        .get_matches();

    let (sub_matches, selection) = match matches.subcommand() {
        Some(("run", m)) => (m, PipelineSelection::All),
        Some(("songs", m)) => (m, PipelineSelection::Songs),
        Some(("events", m)) => (m, PipelineSelection::Events),
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    };

    match run(sub_matches, selection).await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("One or more tables failed");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Star schema pipeline error: {:#}", e);
            process::exit(1);
        }
    }
}
