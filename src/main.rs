// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! ScanVault: Local Scan Gallery Organizer
//!
//! Command-line front end over the collection store.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use scanvault::config::{AppConfig, StorageBackend};
use scanvault::models::{count_label, normalize_description, validate_name, Collection};
use scanvault::upload::{self, ImageSource};
use scanvault::{Applied, CollectionStore, Result, ScanVaultError};

/// ScanVault CLI - organize image scans into collections
#[derive(Parser, Debug)]
#[command(name = "scanvault")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Organize image scans into named collections", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collection operations
    Collection {
        #[command(subcommand)]
        action: CollectionCommands,
    },

    /// Scan operations
    Scan {
        #[command(subcommand)]
        action: ScanCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show collection and scan counts
    Stats,

    /// Initialize a new ScanVault directory
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CollectionCommands {
    /// Create a new collection
    Create {
        /// Collection name
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all collections
    List,

    /// Show one collection with its scans
    Show {
        /// Collection ID
        id: String,
    },

    /// Delete a collection and all of its scans
    Delete {
        /// Collection ID
        id: String,
    },

    /// Replace the cover image of a collection
    Cover {
        /// Collection ID
        id: String,

        /// Image URL, data URL, or image file to embed
        image: String,
    },
}

#[derive(Subcommand, Debug)]
enum ScanCommands {
    /// Upload an image into a collection
    Add {
        /// Collection ID
        collection: String,

        /// Image file to embed, or an http(s)/data URL
        image: String,

        /// Scan name (default: file name without extension)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the scans of a collection
    List {
        /// Collection ID
        collection: String,
    },

    /// Delete one scan
    Delete {
        /// Collection ID
        collection: String,

        /// Scan ID
        scan: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Some(Commands::Collection { action }) => {
            let mut store = CollectionStore::from_config(&config.storage);
            run_collection_command(&mut store, &config, action, json).await
        }
        Some(Commands::Scan { action }) => {
            let mut store = CollectionStore::from_config(&config.storage);
            run_scan_command(&mut store, &config, action, json).await
        }
        Some(Commands::Config { action }) => {
            run_config_command(config, action, &cli.config)
        }
        Some(Commands::Stats) => {
            let store = CollectionStore::from_config(&config.storage);
            run_stats(&store, json)
        }
        Some(Commands::Init { dir, force }) => {
            run_init(dir, force)
        }
        None => {
            // Default: list collections
            let store = CollectionStore::from_config(&config.storage);
            print_collections(store.collections(), json)
        }
    }
}

/// Log a persistence warning and keep the value
fn settle<T>(applied: Applied<T>) -> T {
    if let Some(ref e) = applied.warning {
        warn!("Change kept in memory but not saved: {}", e);
    }
    applied.into_value()
}

/// Run collection commands
async fn run_collection_command(
    store: &mut CollectionStore,
    config: &AppConfig,
    action: CollectionCommands,
    json: bool,
) -> Result<()> {
    match action {
        CollectionCommands::Create { name, description } => {
            let name = validate_name(&name)?;
            let description = normalize_description(description.as_deref());
            let collection = settle(store.add_collection(&name, description.as_deref()));
            info!("Created collection {}", collection.id);
            if json {
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                println!("Created collection '{}' ({})", collection.name, collection.id);
            }
        }
        CollectionCommands::List => {
            print_collections(store.collections(), json)?;
        }
        CollectionCommands::Show { id } => {
            let collection = store
                .get_collection(&id)
                .ok_or_else(|| ScanVaultError::collection_not_found(&id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(collection)?);
            } else {
                print_collection_detail(collection);
            }
        }
        CollectionCommands::Delete { id } => {
            let removed = settle(store.delete_collection(&id))
                .ok_or_else(|| ScanVaultError::collection_not_found(&id))?;
            println!(
                "Deleted collection '{}' and {}",
                removed.name,
                removed.scan_count_label()
            );
        }
        CollectionCommands::Cover { id, image } => {
            if store.get_collection(&id).is_none() {
                return Err(ScanVaultError::collection_not_found(&id));
            }
            let prepared = upload::prepare(&ImageSource::parse(&image), &config.upload).await?;
            settle(store.update_collection_cover(&id, &prepared.image_url));
            println!("Updated cover of collection {}", id);
        }
    }

    Ok(())
}

/// Run scan commands
async fn run_scan_command(
    store: &mut CollectionStore,
    config: &AppConfig,
    action: ScanCommands,
    json: bool,
) -> Result<()> {
    match action {
        ScanCommands::Add { collection, image, name } => {
            if store.get_collection(&collection).is_none() {
                return Err(ScanVaultError::collection_not_found(&collection));
            }
            let prepared = upload::prepare(&ImageSource::parse(&image), &config.upload).await?;
            let new_scan = prepared.into_new_scan(name.as_deref())?;
            let scan = settle(store.add_scan_to_collection(&collection, new_scan))
                .ok_or_else(|| ScanVaultError::collection_not_found(&collection))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scan)?);
            } else {
                println!("Added scan '{}' ({})", scan.name, scan.id);
            }
        }
        ScanCommands::List { collection } => {
            let scans = store
                .scans(&collection)
                .ok_or_else(|| ScanVaultError::collection_not_found(&collection))?;
            if json {
                println!("{}", serde_json::to_string_pretty(scans)?);
            } else {
                println!("{}:", count_label(scans.len(), "scan", "scans"));
                for scan in scans {
                    println!("  {} {} ({})", scan.id, scan.name, scan.created_at.format("%Y-%m-%d"));
                }
            }
        }
        ScanCommands::Delete { collection, scan } => {
            let removed = settle(store.delete_scan(&collection, &scan))
                .ok_or_else(|| ScanVaultError::scan_not_found(&collection, &scan))?;
            println!("Deleted scan '{}'", removed.name);
        }
    }

    Ok(())
}

fn print_collections(collections: &[Collection], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(collections)?);
        return Ok(());
    }

    if collections.is_empty() {
        println!("No collections yet. Create one with: scanvault collection create <NAME>");
        return Ok(());
    }

    println!("{}:", count_label(collections.len(), "collection", "collections"));
    for c in collections {
        println!("  {} {} - {}", c.id, c.name, c.scan_count_label());
    }
    Ok(())
}

fn print_collection_detail(collection: &Collection) {
    println!("{} ({})", collection.name, collection.id);
    if let Some(ref description) = collection.description {
        println!("  {}", description);
    }
    println!("  Created: {}", collection.created_at.format("%Y-%m-%d %H:%M"));
    println!("  Cover: {}", collection.cover_image.as_deref().map(abbreviate).unwrap_or_else(|| "-".to_string()));
    println!("  {}", collection.scan_count_label());
    for scan in &collection.scans {
        println!("    {} {} ({})", scan.id, scan.name, scan.created_at.format("%Y-%m-%d"));
    }
}

/// Shorten embedded data URLs for display
fn abbreviate(url: &str) -> String {
    if url.starts_with("data:") && url.len() > 48 {
        let head: String = url.chars().take(40).collect();
        format!("{}... ({} bytes)", head, url.len())
    } else {
        url.to_string()
    }
}

/// Run stats
fn run_stats(store: &CollectionStore, json: bool) -> Result<()> {
    let stats = store.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("ScanVault Statistics:");
        println!("  Collections: {}", stats.collection_count);
        println!("  Scans: {}", stats.scan_count);
    }
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Storage: {:?} at {}", config.storage.backend, config.storage.path);
            println!("  Key: {}", config.storage.key);
            println!("  Upload formats: {}", config.upload.formats.join(", "));
        }
    }

    Ok(())
}

/// Initialize a new ScanVault directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(ScanVaultError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    std::fs::create_dir_all(&target)?;

    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Sqlite;
    config.storage.path = target.join("scanvault.db").to_string_lossy().to_string();
    config.save(&config_path)?;

    println!("ScanVault initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("\nNext steps:");
    println!("  1. scanvault collection create \"Physics\"");
    println!("  2. scanvault scan add <COLLECTION_ID> page1.png");

    Ok(())
}
