mod cli;

use nalscope::{
    config::{self, OutputFormat},
    inspect::{self, ScanOptions},
    report::{self, TextSections},
    source::FileSource,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "nalscope=debug,nalscope_bitstream=debug".to_string()
        } else {
            "nalscope=info,nalscope_bitstream=warn".to_string()
        }
    });

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            file,
            json,
            tree,
            max_units,
        } => scan_file(&file, cli.config.as_deref(), json, tree, max_units),
        Commands::Info { file } => info_file(&file),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("nalscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn scan_file(
    file: &Path,
    config_path: Option<&Path>,
    json: bool,
    tree: bool,
    max_units: Option<usize>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let show_tree = tree || config.output.show_tree;
    let options = ScanOptions {
        max_units: max_units.or(config.scanner.max_units),
        build_tree: show_tree,
        ..ScanOptions::from(&config.scanner)
    };

    let result = inspect::inspect_file(file, &options)?;

    if json || config.output.format == OutputFormat::Json {
        println!("{}", report::render_json(&result)?);
    } else {
        let sections = TextSections {
            poc: config.output.show_poc,
            tree: show_tree,
        };
        print!("{}", report::render_text(&result, sections));
    }

    Ok(())
}

fn info_file(file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let source = FileSource::open(file)?;
    print!("{}", report::render_info(&source.file_info()));
    println!("Format: {}", source.format());

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            println!("Default config:");
            print_config(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Buffer size: {} bytes", config.scanner.buffer_size);
    println!("  Max payload: {} bytes", config.scanner.max_payload_bytes);
    match config.scanner.max_units {
        Some(max) => println!("  Max units: {}", max),
        None => println!("  Max units: unlimited"),
    }
    println!("  Output format: {:?}", config.output.format);
    println!("  Show tree: {}", config.output.show_tree);
    println!("  Show POC: {}", config.output.show_poc);
}
