use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use ldk_classpath::{ArchiveUnit, LoaderUnit};
use ldk_native::{alternative_library_name, map_library_name};
use ldk_sdk::{LoadingContext, Location, SdkConfig};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.verbose {
        config.resolver.diagnostics = true;
    }
    let format = cli.format;

    match cli.command {
        Command::Find(args) => cmd_find(&context(&cli.classpath, &config), args, format),
        Command::List(args) => cmd_list(&context(&cli.classpath, &config), args, format),
        Command::Class(args) => cmd_class(&context(&cli.classpath, &config), args, format),
        Command::Units => cmd_units(&context(&cli.classpath, &config), format),
        Command::Manifest(args) => cmd_manifest(&config, args, format),
        Command::LoadLib(args) => cmd_load_lib(&context(&cli.classpath, &config), args, format),
        Command::MapName(args) => cmd_map_name(args, format),
        Command::Config => cmd_config(&config, format),
    }
}

/// Read the config file, or fall back to defaults. Missing tables and keys
/// take their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SdkConfig> {
    let Some(path) = path else {
        return Ok(SdkConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn context(classpath: &str, config: &SdkConfig) -> LoadingContext {
    LoadingContext::builder("ldk")
        .config(config.clone())
        .classpath(classpath)
        .build()
}

fn cmd_find(cx: &LoadingContext, args: FindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let Some(resource) = cx.find_resource(&args.name) else {
        bail!("resource not found: {}", args.name);
    };
    match format {
        OutputFormat::Text => {
            println!("{} {}", "found".green().bold(), resource.url());
            println!("  origin: {}", resource.origin().to_string().cyan());
            if let Some(size) = resource.content_length() {
                println!("  size: {size} bytes");
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "name": resource.name(),
                "url": resource.url(),
                "origin": resource.origin().to_string(),
                "size": resource.content_length(),
            })
        ),
    }
    Ok(())
}

fn cmd_list(cx: &LoadingContext, args: FindArgs, format: OutputFormat) -> anyhow::Result<()> {
    let urls: Vec<String> = cx.resources(&args.name).map(|r| r.url()).collect();
    match format {
        OutputFormat::Text => {
            if urls.is_empty() {
                println!("No resources named {}.", args.name.yellow());
            }
            for (i, url) in urls.iter().enumerate() {
                let marker = if i == 0 { "*".green().bold() } else { " ".normal() };
                println!("{marker} {url}");
            }
        }
        OutputFormat::Json => println!("{}", json!({ "name": args.name, "urls": urls })),
    }
    Ok(())
}

fn cmd_class(cx: &LoadingContext, args: ClassArgs, format: OutputFormat) -> anyhow::Result<()> {
    let class = cx.load_class_bytes(&args.binary_name)?;
    match format {
        OutputFormat::Text => {
            println!("{} {}", "loaded".green().bold(), class.binary_name.yellow());
            println!("  origin: {}", class.origin.to_string().cyan());
            println!("  size: {} bytes", class.bytes.len());
        }
        OutputFormat::Json => println!(
            "{}",
            json!({
                "binary_name": class.binary_name,
                "origin": class.origin.to_string(),
                "size": class.bytes.len(),
            })
        ),
    }
    Ok(())
}

fn cmd_units(cx: &LoadingContext, format: OutputFormat) -> anyhow::Result<()> {
    let resolver = cx.resolver();
    resolver.materialize_all();
    let search_path: Vec<String> = resolver.search_path().iter().map(Location::to_string).collect();
    let units: Vec<String> = resolver.materialized().iter().map(Location::to_string).collect();

    match format {
        OutputFormat::Text => {
            println!("Search path: {} entries", search_path.len().to_string().bold());
            println!("Units:");
            for (i, unit) in units.iter().enumerate() {
                let origin = if search_path.contains(unit) {
                    "classpath".normal()
                } else {
                    "manifest".dimmed()
                };
                println!("  {:>3}  {}  ({})", i, unit, origin);
            }
            let skipped = search_path.iter().filter(|p| !units.contains(p)).count();
            if skipped > 0 {
                println!("{} {skipped} entries skipped", "!".yellow().bold());
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({ "search_path": search_path, "units": units })
        ),
    }
    Ok(())
}

fn cmd_manifest(config: &SdkConfig, args: ManifestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let location = Location::parse(&args.archive.to_string_lossy())?;
    let unit = ArchiveUnit::new(location.clone(), &config.resolver);
    let manifest = unit.manifest()?;
    let class_path = unit.extension_class_path()?;
    unit.close()?;

    let Some(manifest) = manifest else {
        println!("{} has no manifest.", location.to_string().yellow());
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            println!("Manifest of {}", location.to_string().cyan());
            for (key, value) in manifest.main_attributes().iter() {
                println!("  {}: {}", key.bold(), value);
            }
            if !class_path.is_empty() {
                println!("Class-Path resolves to:");
                for entry in &class_path {
                    println!("  {entry}");
                }
            }
            let sections = manifest.sections().count();
            if sections > 0 {
                println!("{sections} entry sections");
            }
        }
        OutputFormat::Json => {
            let attributes: serde_json::Map<String, serde_json::Value> = manifest
                .main_attributes()
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            let class_path: Vec<String> = class_path.iter().map(Location::to_string).collect();
            println!(
                "{}",
                json!({
                    "archive": location.to_string(),
                    "main": attributes,
                    "class_path": class_path,
                    "sections": manifest.sections().count(),
                })
            );
        }
    }
    Ok(())
}

fn cmd_load_lib(cx: &LoadingContext, args: LoadLibArgs, format: OutputFormat) -> anyhow::Result<()> {
    let library = cx.load_library(&args.name)?;
    let symbols: Vec<(String, Option<usize>)> = args
        .symbol
        .iter()
        .map(|s| (s.clone(), cx.find_symbol(s)))
        .collect();

    match format {
        OutputFormat::Text => {
            println!("{} {}", "loaded".green().bold(), library.name());
            if library.is_builtin() {
                println!("  (builtin)");
            }
            for (symbol, address) in &symbols {
                match address {
                    Some(address) => println!("  {} {:#x}", symbol.bold(), address),
                    None => println!("  {} {}", symbol.bold(), "not found".red()),
                }
            }
        }
        OutputFormat::Json => {
            let symbols: serde_json::Map<String, serde_json::Value> = symbols
                .into_iter()
                .map(|(s, a)| (s, json!(a)))
                .collect();
            println!(
                "{}",
                json!({
                    "library": library.name(),
                    "builtin": library.is_builtin(),
                    "symbols": symbols,
                })
            );
        }
    }
    Ok(())
}

fn cmd_map_name(args: MapNameArgs, format: OutputFormat) -> anyhow::Result<()> {
    let primary = map_library_name(&args.name);
    let alternative = alternative_library_name(&args.name);
    match format {
        OutputFormat::Text => {
            println!("{}", primary.bold());
            if let Some(alternative) = alternative {
                println!("{} (alternative)", alternative);
            }
        }
        OutputFormat::Json => println!(
            "{}",
            json!({ "name": args.name, "file": primary, "alternative": alternative })
        ),
    }
    Ok(())
}

fn cmd_config(config: &SdkConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
