//! dricons - WoW diminishing returns icon swapper
//!
//! Replaces the stock DR category icons of a WoW installation with more
//! recognizable ones, per game version.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use dricons::app::{App, AppConfig, DiskChange};
use dricons::assets::AssetDir;
use dricons::catalog::{self, CategoryId, IconRef};
use dricons::install::ResetOutcome;
use dricons::settings::Settings;
use dricons::tga::TransferFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dricons")]
#[command(version)]
#[command(about = "Swap WoW diminishing returns icons for ones you can tell apart")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/dricons/settings.json)
    #[arg(long, global = true, env = "DRICONS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Icon asset directory (default: <data dir>/dricons/assets)
    #[arg(long, global = true, env = "DRICONS_ASSETS")]
    assets: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look for WoW in the usual install locations and remember it
    Detect,

    /// Use a WoW folder (any folder inside the installation works)
    SetFolder {
        /// Installation root, or a folder below it
        path: String,
    },

    /// List the game versions of the selected installation
    Versions,

    /// List DR categories and their available icons
    Catalog,

    /// Show the icon selected for each category
    Show {
        /// Version folder, e.g. _retail_ or _classic_
        #[arg(short = 'w', long = "wow-version", default_value = "_retail_")]
        version: String,
    },

    /// Replace a category's icon
    Apply {
        /// DR category (stun, incap, fear, root)
        category: String,

        /// Icon: default, alt1, alt2, ... or the icon name
        icon: String,

        /// Version folder, e.g. _retail_ or _classic_
        #[arg(short = 'w', long = "wow-version", default_value = "_retail_")]
        version: String,
    },

    /// Restore a category's stock icon
    Reset {
        /// DR category (stun, incap, fear, root)
        category: String,

        /// Version folder, e.g. _retail_ or _classic_
        #[arg(short = 'w', long = "wow-version", default_value = "_retail_")]
        version: String,
    },

    /// Restore every stock icon for a version
    ResetAll {
        /// Version folder, e.g. _retail_ or _classic_
        #[arg(short = 'w', long = "wow-version", default_value = "_retail_")]
        version: String,
    },

    /// Decode an icon and write it as PNG, or print it as a data URL
    Preview {
        /// DR category (stun, incap, fear, root)
        category: String,

        /// Icon: default, alt1, alt2, ... or the icon name
        #[arg(default_value = "default")]
        icon: String,

        /// Write a PNG here instead of printing a data URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_category(key: &str) -> Result<CategoryId> {
    CategoryId::parse(key).ok_or_else(|| {
        let known: Vec<_> = CategoryId::ALL.iter().map(|c| c.as_str()).collect();
        anyhow!("Unknown category {:?} (expected one of: {})", key, known.join(", "))
    })
}

fn parse_icon(category: CategoryId, name: &str) -> Result<IconRef> {
    IconRef::parse(category, name).ok_or_else(|| {
        anyhow!(
            "Unknown {} icon {:?} (run `dricons catalog` to list icons)",
            category.as_str(),
            name
        )
    })
}

/// Restore the saved installation or explain how to pick one
async fn restore_install(app: &mut App) -> Result<()> {
    if app.restore().await.is_none() {
        bail!("No WoW folder selected. Run `dricons detect` or `dricons set-folder <path>` first.");
    }
    Ok(())
}

fn print_change(change: &DiskChange) {
    match change {
        DiskChange::Written(path) => println!("Wrote {}", path.display()),
        DiskChange::Reset(ResetOutcome::Removed(path)) => println!("Removed {}", path.display()),
        DiskChange::Reset(ResetOutcome::AlreadyDefault) => println!("Already using the stock icon"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if cli.verbose { "dricons=debug".parse()? } else { "dricons=warn".parse()? }),
            )
            .init();
    }

    let config = AppConfig {
        settings_path: match cli.settings {
            Some(path) => path,
            None => Settings::default_path().context("No settings location")?,
        },
        assets_dir: match cli.assets {
            Some(dir) => dir,
            None => AssetDir::default_root()?,
        },
    };
    let mut app = App::new(config);

    match cli.command {
        Commands::Detect => {
            let install = app.auto_detect().await?;
            println!("Found WoW at {}", install.root);
            for version in &install.versions {
                println!("  {:<16} {}", version, catalog::version_display_name(version));
            }
        }

        Commands::SetFolder { path } => {
            let install = app.select_folder(&path).await?;
            if install.root != path {
                println!("Using installation root {}", install.root);
            } else {
                println!("Using {}", install.root);
            }
            println!("Versions: {}", install.versions.join(", "));
        }

        Commands::Versions => {
            restore_install(&mut app).await?;
            if let Some(install) = app.installation() {
                println!("{}", install.root);
                for version in &install.versions {
                    println!("  {:<16} {}", version, catalog::version_display_name(version));
                }
            }
        }

        Commands::Catalog => {
            for cat in catalog::categories() {
                println!("=== {} ({}) ===", cat.name, cat.id.as_str());
                println!("{}", cat.description);
                println!("Replaces:  {}", cat.target_file_name);
                println!("Abilities: {}", cat.affected_abilities.join(", "));
                println!("  {:<8} {}", "default", cat.id.default_icon().display_name());
                for (i, alt) in cat.alternatives.iter().enumerate() {
                    println!("  {:<8} {}", format!("alt{}", i + 1), alt.name);
                }
                println!();
            }
        }

        Commands::Show { version } => {
            restore_install(&mut app).await?;
            let record = app.selections_for(&version).await?;

            println!("{} ({})", catalog::version_display_name(&version), version);
            for (category, icon) in record.iter() {
                let marker = if icon.is_default() { "" } else { "  *" };
                println!("  {:<8} {}{}", category.as_str(), icon.display_name(), marker);
            }
        }

        Commands::Apply {
            category,
            icon,
            version,
        } => {
            let category = parse_category(&category)?;
            let icon = parse_icon(category, &icon)?;
            restore_install(&mut app).await?;

            let change = app.choose_icon(&version, icon).await?;
            print_change(&change.disk);
            println!("{}: {}", category.info().name, icon.display_name());
        }

        Commands::Reset { category, version } => {
            let category = parse_category(&category)?;
            restore_install(&mut app).await?;

            let change = app.reset_icon(&version, category).await?;
            print_change(&change.disk);
        }

        Commands::ResetAll { version } => {
            restore_install(&mut app).await?;

            let change = app.reset_all(&version).await?;
            print_change(&change.disk);
        }

        Commands::Preview {
            category,
            icon,
            output,
        } => {
            let category = parse_category(&category)?;
            let icon = parse_icon(category, &icon)?;
            let bitmap = app.preview(icon).await;

            match output {
                Some(path) => {
                    let png = bitmap.encode_for_transfer(TransferFormat::Png)?;
                    tokio::fs::write(&path, &png)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Wrote {}x{} preview to {}",
                        bitmap.width(),
                        bitmap.height(),
                        path.display()
                    );
                }
                None => println!("{}", bitmap.to_data_url(TransferFormat::Png)?),
            }
        }
    }

    Ok(())
}
