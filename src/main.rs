use clap::{Parser, Subcommand};
use imagesmith::convert::{self, ConvertContext};
use imagesmith::converters::{ConverterRegistry, Quality};
use imagesmith::formats::{ImageFormat, Platform};
use imagesmith::history::History;
use imagesmith::matrix::ConversionMatrix;
use imagesmith::{config, detect, output};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "imagesmith")]
#[command(about = "Detect image formats and convert between them")]
#[command(long_about = "\
Detect image formats and convert between them

Formats are recognised by file name first, then by magic bytes. Which
conversions are offered depends on the platform: some paths only exist
where the native engine behind them does.

Data directory layout:

  .imagesmith/
  ├── config.toml     # Optional settings (see 'imagesmith gen-config')
  ├── history.json    # Recent conversions, newest first
  └── converted/      # Default output directory

Run 'imagesmith gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, history and converted files
    #[arg(long, default_value = ".imagesmith", global = true)]
    data_dir: PathBuf,

    /// Platform to route for [default: from config.toml, else android]
    #[arg(long, global = true)]
    platform: Option<Platform>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags for the convert command.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Files or directories to convert
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format (jpeg, png, heic, ...)
    #[arg(long)]
    to: ImageFormat,

    /// Lossy quality 0.0-1.0 [default: from config.toml]
    #[arg(long, value_parser = config::parse_quality)]
    quality: Option<f32>,

    /// Drop EXIF metadata even if config.toml keeps it
    #[arg(long)]
    strip_metadata: bool,

    /// Where converted files go [default: <data-dir>/converted]
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Don't record results in the history
    #[arg(long)]
    no_history: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the format of each file
    Detect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the formats a source format can be converted to
    Targets { format: ImageFormat },
    /// Print the conversion matrix
    Matrix,
    /// Convert files to another format
    Convert(ConvertArgs),
    /// Show or edit the conversion history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Delete everything under <data-dir>/converted
    Clean,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent conversions (default)
    List,
    /// Forget one conversion
    Remove { id: String },
    /// Forget all conversions
    Clear,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Detect { paths } => {
            let results: Vec<_> = paths
                .iter()
                .map(|p| (p.as_path(), detect::detect(p)))
                .collect();
            output::print_detections(&results);
        }
        Command::Targets { format } => {
            let settings = config::load_config(&cli.data_dir)?;
            let platform = cli.platform.unwrap_or(settings.platform);
            let targets = ConversionMatrix::standard().available_targets(format, platform);
            output::print_targets(format, platform, &targets);
        }
        Command::Matrix => {
            output::print_matrix(ConversionMatrix::standard(), cli.platform);
        }
        Command::Convert(args) => {
            let settings = config::load_config(&cli.data_dir)?;
            init_thread_pool(&settings.processing);

            let mut options = settings.default_options(args.to);
            if let Some(q) = args.quality {
                options.quality = Quality::new(q);
            }
            if args.strip_metadata {
                options.preserve_metadata = false;
            }

            let sources = convert::collect_inputs(&args.inputs);
            if sources.is_empty() {
                return Err("No image files found in the given inputs".into());
            }

            let registry = ConverterRegistry::with_defaults();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_convert_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let ctx = ConvertContext {
                matrix: ConversionMatrix::standard(),
                registry: &registry,
                platform: cli.platform.unwrap_or(settings.platform),
                output_dir: args
                    .out_dir
                    .unwrap_or_else(|| converted_dir(&cli.data_dir)),
                max_file_bytes: settings.conversion.max_file_bytes(),
                events: Some(tx),
            };
            let results = convert::convert_batch(&sources, &options, &ctx);
            drop(ctx);
            printer.join().map_err(|_| "output thread panicked")?;

            let mut converted = Vec::new();
            let mut failed = 0;
            for (_, result) in results {
                match result {
                    Ok(done) => converted.push(done),
                    Err(_) => failed += 1,
                }
            }
            println!("{}", output::format_batch_summary(converted.len(), failed));

            if !args.no_history && !converted.is_empty() {
                let mut history = History::load(&cli.data_dir, settings.history.max_entries);
                for done in converted {
                    history.add(done);
                }
                history.save(&cli.data_dir)?;
            }
            if failed > 0 {
                return Err(format!("{} conversion(s) failed", failed).into());
            }
        }
        Command::History { action } => {
            let settings = config::load_config(&cli.data_dir)?;
            let mut history = History::load(&cli.data_dir, settings.history.max_entries);
            match action.unwrap_or(HistoryAction::List) {
                HistoryAction::List => output::print_history(&history),
                HistoryAction::Remove { id } => {
                    if !history.remove(&id) {
                        return Err(format!("No conversion with id {}", id).into());
                    }
                    history.save(&cli.data_dir)?;
                    println!("Removed {}", id);
                }
                HistoryAction::Clear => {
                    let count = history.len();
                    history.clear();
                    history.save(&cli.data_dir)?;
                    println!("Cleared {} conversions", count);
                }
            }
        }
        Command::Clean => {
            let dir = converted_dir(&cli.data_dir);
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
                println!("Removed {}", dir.display());
            } else {
                println!("Nothing to clean");
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn converted_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("converted")
}

/// Log to stderr so stdout stays clean for command output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
