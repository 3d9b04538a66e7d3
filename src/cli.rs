//! Headless driver: one edit per invocation, result exported to disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use image::ImageReader;

use crate::artifact::ImageArtifact;
use crate::catalog::FeatureCatalog;
use crate::config::{load_app_config, AppConfig};
use crate::error::AppResult;
use crate::generation::GeminiClient;
use crate::geometry::{DisplayPoint, DisplayRect, DisplaySize, ImageBounds, ScaleFactors};
use crate::session::{CropPreset, EditSession, GenerationOutcome};
use crate::storage::{import_image, StorageService};

#[derive(Debug, Parser)]
#[command(name = "pixmuse")]
#[command(about = "AI photo editing from the command line")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for exported images (overrides config `output_dir`)
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Enable debug logging when PIXMUSE_LOG is unset
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List feature categories and filters.
    Features,

    /// Edit an image with a prompted feature.
    Edit {
        input: PathBuf,
        /// Feature name; the freeform generative layer when omitted
        #[arg(long, short)]
        feature: Option<String>,
        #[arg(long, short)]
        prompt: String,
        /// Hotspot in native pixel coordinates, for localized features
        #[arg(long, requires = "y")]
        x: Option<f64>,
        #[arg(long, requires = "x")]
        y: Option<f64>,
        #[command(flatten)]
        references: References,
    },

    /// Apply a one-click feature.
    Instant {
        input: PathBuf,
        #[arg(long, short)]
        feature: String,
        #[command(flatten)]
        references: References,
    },

    /// Apply a named style filter.
    Filter {
        input: PathBuf,
        #[arg(long, short)]
        filter: String,
    },

    /// Generate a new image from a location with a map feature.
    Generate {
        #[arg(long, short)]
        feature: String,
        #[arg(long, short)]
        location: String,
        #[arg(long, short)]
        style: Option<String>,
    },

    /// Crop an image to a native-pixel rectangle or a centred aspect preset.
    Crop {
        input: PathBuf,
        #[command(flatten)]
        region: CropRegion,
        /// Aspect preset label such as 16:9; ignored when a rectangle is given
        #[arg(long, value_parser = parse_crop_preset)]
        preset: Option<CropPreset>,
    },
}

#[derive(Debug, Args)]
struct References {
    /// Additional reference images sent after the input image
    #[arg(long = "reference", short = 'r')]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct CropRegion {
    #[arg(long, requires_all = ["top", "width", "height"])]
    left: Option<f64>,
    #[arg(long)]
    top: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
}

fn parse_crop_preset(label: &str) -> Result<CropPreset, String> {
    CropPreset::from_label(label).ok_or_else(|| {
        let known: Vec<_> = CropPreset::ALL.iter().map(|preset| preset.label()).collect();
        format!("unknown crop preset {label:?}; expected one of {}", known.join(", "))
    })
}

impl CropRegion {
    fn rect(&self) -> Option<DisplayRect> {
        Some(DisplayRect::new(self.left?, self.top?, self.width?, self.height?))
    }
}

pub async fn execute(cli: Cli) -> AppResult<()> {
    let config = load_app_config();
    let catalog = Arc::new(load_catalog(&config)?);
    let storage = match cli.output.clone().or_else(|| config.output_dir.clone()) {
        Some(dir) => StorageService::with_output_dir(dir),
        None => StorageService::with_default_output_dir()?,
    };
    let mut session = EditSession::new(Arc::clone(&catalog), config.retention_policy());

    let outcome = match cli.command {
        Command::Features => {
            print_features(&catalog);
            return Ok(());
        }
        Command::Edit {
            input,
            feature,
            prompt,
            x,
            y,
            references,
        } => {
            let bounds = load_into(&mut session, &input)?;
            match feature {
                Some(name) => {
                    session.select_feature(&name)?;
                }
                None => {
                    session.select_generative_layer();
                }
            }
            session.set_prompt(prompt);
            if let (Some(x), Some(y)) = (x, y) {
                let displayed = DisplaySize::new(f64::from(bounds.width), f64::from(bounds.height));
                session.select_hotspot(DisplayPoint::new(x, y), displayed, bounds);
            }
            attach_references(&mut session, &references)?;
            let client = backend(&config)?;
            session.generate(&client).await?
        }
        Command::Instant {
            input,
            feature,
            references,
        } => {
            load_into(&mut session, &input)?;
            attach_references(&mut session, &references)?;
            let client = backend(&config)?;
            session.apply_instant(&client, &feature).await?
        }
        Command::Filter { input, filter } => {
            load_into(&mut session, &input)?;
            let client = backend(&config)?;
            session.apply_filter(&client, &filter).await?
        }
        Command::Generate {
            feature,
            location,
            style,
        } => {
            session.select_feature(&feature)?;
            if let Some(style) = style {
                session.set_map_style(&style)?;
            }
            session.set_prompt(location);
            let client = backend(&config)?;
            session.generate(&client).await?
        }
        Command::Crop {
            input,
            region,
            preset,
        } => {
            let bounds = load_into(&mut session, &input)?;
            let displayed = DisplaySize::new(f64::from(bounds.width), f64::from(bounds.height));
            match (region.rect(), preset) {
                (Some(rect), _) => session.set_crop_selection(Some(rect)),
                (None, Some(preset)) => session.set_crop_preset(preset, displayed),
                (None, None) => {}
            }
            let cropped = session.apply_crop(ScaleFactors::identity())?.clone();
            GenerationOutcome::Committed(cropped)
        }
    };

    match outcome {
        GenerationOutcome::Committed(artifact) => {
            let path = storage.export_artifact(&artifact)?;
            println!("{}", path.display());
        }
        GenerationOutcome::Discarded => {
            tracing::warn!("result was superseded before it could be saved");
        }
    }
    Ok(())
}

fn load_catalog(config: &AppConfig) -> AppResult<FeatureCatalog> {
    let catalog = match &config.catalog_path {
        Some(path) => FeatureCatalog::load_from_path(path)?,
        None => FeatureCatalog::builtin()?,
    };
    Ok(catalog)
}

fn backend(config: &AppConfig) -> AppResult<GeminiClient> {
    let client = GeminiClient::from_env(&config.gemini_settings(), &config.api_key_env_names())?;
    Ok(client)
}

fn load_into(session: &mut EditSession, path: &Path) -> AppResult<ImageBounds> {
    let artifact = import_image(path)?;
    let bounds = native_bounds(&artifact)?;
    session.load_image(artifact);
    Ok(bounds)
}

fn attach_references(session: &mut EditSession, references: &References) -> AppResult<()> {
    for path in &references.paths {
        session.add_reference_image(import_image(path)?);
    }
    Ok(())
}

fn native_bounds(artifact: &ImageArtifact) -> AppResult<ImageBounds> {
    let (width, height) = ImageReader::new(Cursor::new(artifact.bytes()))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(ImageBounds::new(width, height))
}

fn print_features(catalog: &FeatureCatalog) {
    for category in catalog.categories() {
        println!("{}", category.name);
        for name in &category.feature_names {
            if let Ok(feature) = catalog.feature(name) {
                println!("  {:<40} [{}] {}", feature.name, feature.kind.label(), feature.description);
            }
        }
    }
    let layer = catalog.generative_layer();
    println!("\n{} [{}] {}", layer.name, layer.kind.label(), layer.description);

    println!("\nFilters");
    for filter in catalog.filters() {
        println!("  {}", filter.name);
    }
}
