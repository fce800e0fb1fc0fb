use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use logic_manifest::{load_manifest, LoaderConfig, ManifestRegistry, ManifestSource, ResolveOptions};

#[derive(Parser, Debug)]
#[command(name = "logic-manifest", about = "Resolve, validate and print a logic manifest tree")]
struct Args {
    /// Manifest file or directory (nearest ancestor manifest when omitted)
    manifest: Option<PathBuf>,

    /// Loader config file (defaults to the per-user config when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manifest filename override
    #[arg(long)]
    filename: Option<String>,

    /// Starting directory for discovery
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Resolve ui dependencies only
    #[arg(long, conflicts_with = "db_only")]
    ui_only: bool,

    /// Resolve db dependencies only
    #[arg(long)]
    db_only: bool,

    /// Print only the subtree of this package
    #[arg(long, value_name = "PACKAGE")]
    find: Option<String>,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_config(args: &Args) -> anyhow::Result<LoaderConfig> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::load(path)?,
        None => match LoaderConfig::default_path().filter(|p| p.is_file()) {
            Some(path) => {
                debug!("Using config {:?}", path);
                LoaderConfig::load(&path)?
            }
            None => LoaderConfig::default(),
        },
    };
    if let Some(filename) = &args.filename {
        config.filename = filename.clone();
    }
    if let Some(cwd) = &args.cwd {
        config.cwd = Some(cwd.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let options = if args.ui_only {
        ResolveOptions::UI_ONLY
    } else if args.db_only {
        ResolveOptions::DB_ONLY
    } else {
        ResolveOptions::ALL
    };

    let registry = Arc::new(ManifestRegistry::with_config(config));
    let source = match &args.manifest {
        Some(path) => ManifestSource::Path(path.clone()),
        None => ManifestSource::Nearest,
    };
    let root = load_manifest(&registry, source, options).await?;

    let valid = root.validate();
    info!("Manifest tree valid: {}", valid);
    for message in root.validation_errors() {
        eprintln!("invalid: {}", message);
    }

    let target = match &args.find {
        Some(name) => root
            .find_manifest(name)
            .ok_or_else(|| anyhow::anyhow!("package {} is not in the resolved tree", name))?,
        None => root,
    };
    println!("{}", serde_json::to_string_pretty(&target.to_json())?);

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
