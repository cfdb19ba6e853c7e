use clap::{CommandFactory, Parser, Subcommand};
use imgwand::batch::{self, Action, CropGeometry, FilterArgs, ResizeGeometry};
use imgwand::codec::CodecRegistry;
use imgwand::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgwand")]
#[command(about = "Convert, inspect and annotate images")]
#[command(long_about = "\
Convert, inspect and annotate images

Without an action flag every argument but the last is an input image and the
last is the output. With several inputs, or a directory input, the output is
a directory.

  imgwand photo.jpg photo.png                 # convert by extension
  imgwand -r @1048576 -C 'web' a.png b.png out/
  imgwand png:- < in.gif > out.png            # '-' is stdin/stdout
  imgwand --identify --identify-format '%[json]' *.png

The output format comes from a 'format:' prefix, then the file extension,
then default_format from imgwand.toml.

Run 'imgwand gen-config' to generate a documented imgwand.toml.")]
#[command(disable_version_flag = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Input images followed by the output path
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// Show version information and supported formats
    #[arg(short = 'v', long)]
    version: bool,

    /// Print information about each image
    #[arg(long)]
    identify: bool,

    /// Convert or process images (default)
    #[arg(long, conflicts_with = "identify")]
    convert: bool,

    /// List supported image formats
    #[arg(long)]
    list_formats: bool,

    /// Maximum concurrent workers
    #[arg(short = 'W', long)]
    workers: Option<usize>,

    /// Don't include file names in output messages
    #[arg(short = 'N', long)]
    no_names: bool,

    /// Format string for --identify output
    #[arg(long)]
    identify_format: Option<String>,

    /// Strip metadata from the image
    #[arg(short = 'S', long)]
    strip: bool,

    /// Add a comment to the image metadata (repeatable)
    #[arg(short = 'C', long = "comment")]
    comments: Vec<String>,

    /// Replace the image's comments (repeatable)
    #[arg(long = "set-comment")]
    set_comments: Vec<String>,

    /// Crop to WxH+X+Y
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    crop: Option<CropGeometry>,

    /// Resize to WxH, or to fit @AREA pixels keeping the aspect ratio
    #[arg(short = 'r', long)]
    resize: Option<ResizeGeometry>,

    /// Compression level, if applicable (0-100, -1 for the codec default)
    #[arg(long, allow_negative_numbers = true)]
    compress: Option<i32>,

    /// Fail on malformed metadata instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Config file [default: ./imgwand.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock imgwand.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));
    let mut tool_config = config::load_config(&config_path)?;
    apply_cli_overrides(&mut tool_config, &cli);
    tool_config.validate()?;
    init_tracing(&tool_config.log_level);

    let registry = CodecRegistry::with_builtin_codecs()?;
    let codecs = registry.list();

    if cli.version {
        println!("imgwand {}", version_string());
        println!("{}", output::format_supported_formats(&codecs));
        println!("For more information, use the --list-formats option.");
        if !cli.list_formats {
            return Ok(());
        }
    }

    if cli.list_formats {
        output::print_codec_table(&codecs);
        return Ok(());
    }

    if cli.paths.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let action = if cli.identify {
        Action::Identify {
            template: tool_config.identify_format.clone(),
        }
    } else {
        Action::Convert {
            default_format: tool_config.default_format.clone(),
        }
    };
    let jobs = batch::plan_jobs(&registry, &cli.paths, &action)?;
    let filters = FilterArgs {
        strip: cli.strip,
        add_comments: cli.comments.clone(),
        set_comments: (!cli.set_comments.is_empty()).then(|| cli.set_comments.clone()),
        crop: cli.crop,
        resize: cli.resize,
        resize_filter: tool_config.processing.resize_filter,
        compression_level: (tool_config.encode.compression_level != -1)
            .then_some(tool_config.encode.compression_level),
        strict: tool_config.decode.strict,
    };

    init_thread_pool(&tool_config.processing);
    let show_names = !cli.no_names;
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_batch_event(&event, show_names);
        }
    });
    let summary = batch::run_batch(&registry, &jobs, &action, &filters, Some(tx));
    printer
        .join()
        .map_err(|_| "output thread panicked")?;

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Flags given on the command line take precedence over the config file.
fn apply_cli_overrides(tool_config: &mut config::ToolConfig, cli: &Cli) {
    if let Some(workers) = cli.workers {
        tool_config.processing.max_processes = Some(workers);
    }
    if let Some(format) = &cli.identify_format {
        tool_config.identify_format = format.clone();
    }
    if let Some(level) = cli.compress {
        tool_config.encode.compression_level = level;
    }
    if cli.strict {
        tool_config.decode.strict = true;
    }
}

/// Log to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
