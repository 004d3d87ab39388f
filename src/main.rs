use clap::{Parser, Subcommand};
use cv_photo::batch::{self, ProcessOptions};
use cv_photo::enhance::{self, FilterSettings};
use cv_photo::types::AspectRatio;
use cv_photo::{config, extract, output};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter overrides for the enhance stage.
#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Named filter preset (natural, auto, vivid, soft, mono)
    #[arg(long)]
    preset: Option<String>,
    /// Brightness percentage (100 = unchanged)
    #[arg(long)]
    brightness: Option<f32>,
    /// Contrast percentage (100 = unchanged)
    #[arg(long)]
    contrast: Option<f32>,
    /// Saturation percentage (100 = unchanged)
    #[arg(long)]
    saturation: Option<f32>,
    /// Blur radius in pixels
    #[arg(long)]
    blur: Option<f32>,
}

impl FilterArgs {
    /// `None` when no filter flag was given, so auto-enhance applies.
    fn settings(&self) -> Result<Option<FilterSettings>, enhance::EnhanceError> {
        let overrides = [self.brightness, self.contrast, self.saturation, self.blur];
        if self.preset.is_none() && overrides.iter().all(Option::is_none) {
            return Ok(None);
        }
        let mut settings = match &self.preset {
            Some(name) => enhance::preset(name)?,
            None => FilterSettings::NEUTRAL,
        };
        if let Some(v) = self.brightness {
            settings.brightness = v;
        }
        if let Some(v) = self.contrast {
            settings.contrast = v;
        }
        if let Some(v) = self.saturation {
            settings.saturation = v;
        }
        if let Some(v) = self.blur {
            settings.blur = v;
        }
        Ok(Some(settings))
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Parse `x,y,w,h` into a crop rectangle.
fn parse_region(value: &str) -> Result<[f64; 4], String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid region '{}': {}", value, e))?;
    match parts.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Ok([*x, *y, *w, *h]),
        [_, _, _, _] => Err(format!("region '{}' needs a positive width and height", value)),
        _ => Err(format!("region '{}' must be x,y,width,height", value)),
    }
}

#[derive(Parser)]
#[command(name = "cv-photo")]
#[command(about = "Profile photo pipeline for CV builders")]
#[command(long_about = "\
Profile photo pipeline for CV builders

Every photo goes through the same five stages:

  capture ──▶ crop ──▶ enhance ──▶ template ──▶ final

  capture    upload (JPEG, PNG, WebP; max 10 MiB by default)
  crop       aspect-locked crop with zoom and quarter-turn rotation
  enhance    brightness, contrast, saturation, blur (auto-enhance by default)
  template   composite onto a background with lighting, frame and effects
  final      export as JPEG: <prefix>-YYYYMMDD-HHMMSS.jpg

Aspect ratios: passport (4:6), square (1:1), headshot (3:4), id (2:3),
linkedin (4:5).

Run 'cv-photo templates' to list the template catalog and
'cv-photo gen-config' to generate a documented cv-photo.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "cv-photo.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one photo through every stage and write the exported JPEG
    Process {
        /// Source image
        #[arg(long)]
        input: PathBuf,
        /// Crop aspect ratio (passport, square, headshot, id, linkedin)
        #[arg(long)]
        ratio: Option<AspectRatio>,
        /// Crop rectangle in viewport pixels: x,y,width,height
        #[arg(long, value_parser = parse_region)]
        region: Option<[f64; 4]>,
        /// Zoom factor
        #[arg(long)]
        zoom: Option<f64>,
        /// Clockwise quarter turns
        #[arg(long, default_value_t = 0)]
        rotate: u8,
        /// Template id
        #[arg(long)]
        template: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Process every supported image under a directory in parallel
    Batch {
        /// Source directory
        #[arg(long)]
        dir: PathBuf,
        /// Output directory
        #[arg(long, default_value = "cv-photos")]
        out_dir: PathBuf,
    },
    /// List the template catalog
    Templates,
    /// Extract résumé fields from a text file and print them as JSON
    Extract {
        /// Conversation text file
        #[arg(long)]
        text: PathBuf,
    },
    /// Print a stock cv-photo.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cv_photo=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Process {
            input,
            ratio,
            region,
            zoom,
            rotate,
            template,
            filters,
            out_dir,
        } => {
            let config = config::load_config(&cli.config)?;
            let options = ProcessOptions {
                aspect_ratio: ratio,
                region,
                zoom,
                quarter_turns: rotate,
                template,
                filters: filters.settings()?,
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_workflow_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::process_file(&config, &input, &options, &out_dir, None, Some(tx));
            printer.join().unwrap();
            output::print_processed(&result?);
        }
        Command::Batch { dir, out_dir } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::process_dir(&config, &dir, &out_dir, Some(tx));
            printer.join().unwrap();
            output::print_batch_summary(&result?);
        }
        Command::Templates => {
            let config = config::load_config(&cli.config)?;
            output::print_template_list(&config.catalog()?);
        }
        Command::Extract { text } => {
            let content = std::fs::read_to_string(&text)?;
            let fields = extract::extract_fields(&content);
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
