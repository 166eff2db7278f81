mod cli;

use mediaprobe::{config, loader, report};
use mediaprobe_av::{Metadata, Source};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediaprobe=trace,mediaprobe_av=trace".to_string()
        } else {
            "mediaprobe=info,mediaprobe_av=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { file, buffer, json } => {
            probe_file(&file, cli.config.as_deref(), buffer, json)
        }
        Commands::CheckLibs => check_libs(cli.config.as_deref()),
        Commands::DescribeError { code } => describe_error(code, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediaprobe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(
    file: &Path,
    config_path: Option<&Path>,
    buffer: bool,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let metadata: Metadata = if buffer || config.output.buffer {
        let data = loader::read_media_file(file)?;
        tracing::info!("Probing {} bytes from {:?}", data.len(), file);
        mediaprobe_av::probe(Source::Buffer(&data), &config.probe)
    } else {
        tracing::info!("Probing {:?}", file);
        mediaprobe_av::probe(Source::File(file), &config.probe)
    }
    .with_context(|| format!("Failed to probe {:?}", file))?;

    if json || config.output.json {
        let json_str = serde_json::to_string_pretty(&metadata)?;
        println!("{}", json_str);
    } else {
        print!("{}", report::render_metadata(file, &metadata));
    }

    Ok(())
}

fn check_libs(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking native libraries...\n");

    let reports = mediaprobe_av::inspect(&config.probe.loader);
    let (text, all_ok) = report::render_libraries(&reports);
    print!("{}", text);

    println!();
    if all_ok {
        println!("All required libraries are available!");
    } else {
        println!("Some libraries or entry points are missing. Set FFMPEG_LIB_DIR or probe.loader.lib_dir.");
    }

    Ok(())
}

fn describe_error(code: i32, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let text = mediaprobe_av::describe_error(code, &config.probe.loader)
        .context("Failed to load native libraries")?;
    println!("{}: {}", code, text);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_probe_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_probe_config(&config);
        }
    }

    Ok(())
}

fn print_probe_config(config: &config::Config) {
    let loader = &config.probe.loader;
    println!("  I/O buffer size: {}", config.probe.io_buffer_size);
    match loader.lib_dir {
        Some(ref dir) => println!("  Library directory: {}", dir.display()),
        None => println!("  Search directories: {}", loader.search_dirs.len()),
    }
    println!("  libavformat candidates: {}", loader.format_libraries.join(", "));
    println!("  libavutil candidates: {}", loader.util_libraries.join(", "));
}
