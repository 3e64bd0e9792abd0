use autocrop::config::{self, Padding};
use autocrop::imaging::RustCodec;
use autocrop::process::{self, ProcessEvent};
use autocrop::session::{CancelToken, Session, SessionSlot};
use autocrop::{output, package};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::debug;
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
            // Built once per process for clap's &'static str.
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "autocrop")]
#[command(about = "Crop images to their visible pixels and add uniform transparent padding")]
#[command(long_about = "\
Crop images to their visible pixels and add uniform transparent padding

Every pixel with non-zero alpha counts as visible. Each image is cropped to
the smallest rectangle holding all of its visible pixels, then surrounded by
a transparent border PADDING pixels wide.

Accepted uploads:

  photo.png | photo.jpg | photo.jpeg | logo.svg   → photo.cropped.png, ...
  batch.zip                                     → batch.cropped.zip

Inside a zip, hidden entries (.DS_Store, __MACOSX/, dotfiles), directories
and non-image files are skipped. Cropped entries keep their original names.
Fully transparent images cannot be cropped and are reported, not dropped.

Run 'autocrop gen-config' to generate a documented autocrop.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "autocrop.toml", global = true)]
    config: PathBuf,

    /// Log pipeline details to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode an upload and list each image with its visible bounds
    Inspect {
        /// Image (.png, .jpg, .jpeg, .svg) or .zip archive
        file: PathBuf,
        /// Print the image list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Crop and pad an upload, writing <name>.cropped.<ext>
    Crop {
        /// Image (.png, .jpg, .jpeg, .svg) or .zip archive
        file: PathBuf,
        /// Padding in pixels (digits only); overrides the config file
        #[arg(long, short)]
        padding: Option<String>,
        /// Where to write the result (defaults to the input's directory)
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
    },
    /// Print a stock autocrop.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Inspect { file, json } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let codec = RustCodec::with_jpeg_quality(config.output.jpeg_quality);

            let (name, bytes) = read_upload(&file)?;
            let loaded = process::load_upload(&codec, &name, bytes, &CancelToken::new(), None)?;

            if json {
                println!("{}", output::format_load_json(&loaded)?);
            } else {
                output::print_load_output(&loaded);
            }
        }
        Command::Crop {
            file,
            padding,
            output_dir,
        } => {
            let config = config::load_config(&cli.config)?;
            // Reject bad padding before any image is decoded.
            let padding = match padding {
                Some(text) => Padding::parse(&text)?,
                None => config.padding,
            };
            init_thread_pool(&config.processing);
            let codec = RustCodec::with_jpeg_quality(config.output.jpeg_quality);
            debug!(%padding, config = %cli.config.display(), "crop settings");

            let mut slot = SessionSlot::new();
            let token = slot.begin_upload();
            let (name, bytes) = read_upload(&file)?;

            let (tx, printer) = spawn_printer();
            let loaded = process::load_upload(&codec, &name, bytes, &token, Some(tx.clone()));
            let loaded = match loaded {
                Ok(loaded) => loaded,
                Err(e) => {
                    drop(tx);
                    join_printer(printer)?;
                    return Err(e.into());
                }
            };
            for failure in &loaded.failures {
                debug!(entry = %failure.name, "left out of batch: load failed");
            }
            if !slot.publish(&token, Session::from(loaded)) {
                return Err("upload was superseded before it finished loading".into());
            }

            let session = slot
                .current_mut()
                .ok_or("no upload session to crop")?;
            let upload = session.upload.clone();
            let outcome = session.crop(padding, Some(tx));
            join_printer(printer)?;

            let artifact = package::package(&upload, &outcome.cropped, &codec)?;
            for failure in &artifact.failures {
                let event = ProcessEvent::ItemFailed {
                    name: failure.name.clone(),
                    error: failure.error.to_string(),
                };
                for line in output::format_process_event(&event) {
                    println!("{}", line);
                }
            }

            let dir = output_dir.unwrap_or_else(|| input_dir(&file));
            std::fs::create_dir_all(&dir)?;
            let written = dir.join(&artifact.file_name);
            std::fs::write(&written, &artifact.bytes)?;
            output::print_crop_summary(
                outcome,
                &written,
                artifact.image_count,
                artifact.failures.len(),
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Read an upload from disk. The upload's name is its file name, without the
/// directory: that is what routing and output naming work from.
fn read_upload(file: &Path) -> Result<(String, Vec<u8>), Box<dyn Error>> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("not a file: {}", file.display()))?;
    let bytes = std::fs::read(file)?;
    Ok((name, bytes))
}

fn input_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print progress events on a dedicated thread while the stages run.
fn spawn_printer() -> (mpsc::Sender<ProcessEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) -> Result<(), Box<dyn Error>> {
    printer
        .join()
        .map_err(|_| "progress printer thread panicked".into())
}

/// Route `tracing` output to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "autocrop=debug" } else { "autocrop=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
