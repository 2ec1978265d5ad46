use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use meshloop::LoopRunner;
use meshloop::dump::{dump_path, dump_to_file};
use meshloop::events::{ContextEvent, EventTopic};
use meshloop::logging::LogLevel;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(default_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meshloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("meshloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let env = env_logger::Env::default().default_filter_or(default_level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            duration_ms,
            log_level,
        } => handle_run_command(*duration_ms, log_level.as_deref(), config),
        Commands::Dump { name } => handle_dump_command(name, config),
        Commands::Levels => handle_levels_command(),
    }
}

fn handle_run_command(duration_ms: Option<u64>, log_level: Option<&str>, config: &Config) -> Result<()> {
    let runner = LoopRunner::with_config(config.runner_config());
    runner.init().context("Failed to initialize event loop")?;
    if let Some(level) = log_level {
        runner.set_log_level(LogLevel::parse(level));
    }

    let (topic, pump) = EventTopic::new(config.events.channel_capacity);
    runner.spawn(pump.run())?;

    let mut events = topic.register("cli")?;
    runner.spawn(async move {
        while let Some(event) = events.recv().await {
            info!("Event received: {}", event.kind());
        }
    })?;

    let logger = runner.logger().clone();
    runner.spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        let mut beats: u64 = 0;
        loop {
            interval.tick().await;
            beats += 1;
            logger.log(LogLevel::Debug, "meshloop::heartbeat", format_args!("heartbeat {}", beats));
        }
    })?;

    let (interrupt_tx, interrupt_rx) = mpsc::channel();
    runner.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(());
        }
    })?;

    runner.run().context("Failed to start event loop")?;
    topic.publish(ContextEvent::ok())?;
    println!(
        "{} on thread {} (log level {})",
        "Event loop running".green(),
        runner.config().thread_name.cyan(),
        runner.log_level()
    );

    match duration_ms {
        Some(ms) => {
            let _ = interrupt_rx.recv_timeout(Duration::from_millis(ms));
        }
        None => {
            println!("{}", "Press Ctrl-C to stop".dimmed());
            let _ = interrupt_rx.recv();
        }
    }

    runner.stop().context("Failed to stop event loop")?;
    println!("{}", "Event loop stopped".green());
    Ok(())
}

fn handle_dump_command(name: &str, config: &Config) -> Result<()> {
    info!("Dumping loop diagnostics as {}", name);
    let runner = LoopRunner::with_config(config.runner_config());
    runner.init().context("Failed to initialize event loop")?;
    runner.run().context("Failed to start event loop")?;

    let path = dump_path(&config.dump.dir, name);
    let dumped = dump_to_file(&runner, &path);
    runner.stop().context("Failed to stop event loop")?;

    let lines = dumped.context(format!("Failed to write dump to {}", path.display()))?;
    println!("{} {} ({} lines)", "Dump written:".green(), path.display(), lines);
    Ok(())
}

fn handle_levels_command() -> Result<()> {
    for level in LogLevel::ALL {
        println!("{}  {}", level.code().to_string().cyan(), level);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
