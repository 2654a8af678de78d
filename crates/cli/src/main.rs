//! apispec-builder CLI
//!
//! Command-line interface for turning handler-level API specs into a
//! deployment descriptor, an OpenAPI document and documentation pages.

use anyhow::{Context, Result};
use apispec_builder_common::{BuilderConfig, ProjectInfo, SpecRegistry};
use apispec_builder_generator::{
    publish_documentation, DeploymentGenerator, MarkdownPublisher, OpenApiGenerator,
};
use apispec_builder_loader::{load_registry, LoadReport};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "apispec-builder")]
#[command(version, about = "Generate serverless.yml, OpenAPI documents and API docs from handler specs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Handler root directory (overrides the configuration)
    #[arg(long, global = true)]
    source_dir: Option<PathBuf>,

    /// Path segment that marks the root of handler names
    #[arg(long, global = true)]
    root_marker: Option<String>,
}

/// Deployment target shared by the stage-aware subcommands
#[derive(Args, Debug, Clone)]
struct Target {
    /// Deployment stage
    #[arg(long, env = "STAGE")]
    stage: String,

    /// Deployment version
    #[arg(long = "ver", env = "VER")]
    ver: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the serverless deployment document
    #[command(after_help = "EXAMPLES:\n  \
        # Generate serverless.yml for the dev stage\n  \
        apispec-builder serverless --stage dev --ver v1\n\n  \
        # Use a custom template and output path\n  \
        apispec-builder serverless \\\n    \
        --stage prod --ver v2 \\\n    \
        --template ./deploy/template.yml \\\n    \
        --output ./deploy/serverless.yml")]
    Serverless {
        #[command(flatten)]
        target: Target,

        /// Base deployment template
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Generated deployment document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prefix of the handler reference
        #[arg(long)]
        handler_prefix: Option<String>,
    },

    /// Generate the OpenAPI document
    #[command(after_help = "EXAMPLES:\n  \
        # Generate api_doc_dev.yml from info_dev.yml\n  \
        apispec-builder openapi --stage dev\n\n  \
        # Generate api_doc.yml from info.yml\n  \
        apispec-builder openapi")]
    Openapi {
        /// Stage whose info file is used
        #[arg(long, env = "STAGE")]
        stage: Option<String>,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reusable components directory
        #[arg(long)]
        components: Option<PathBuf>,
    },

    /// Generate the API documentation page
    #[command(after_help = "EXAMPLES:\n  \
        apispec-builder docs --stage dev --ver v1 --output ./docs/generated")]
    Docs {
        #[command(flatten)]
        target: Target,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate the deployment document, the OpenAPI document and the docs
    All {
        #[command(flatten)]
        target: Target,

        /// Base deployment template
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Skip documentation generation
        #[arg(long)]
        skip_docs: bool,
    },

    /// List loaded specs by category
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli)?;
    let report = load_specs(&config)?;

    match cli.command {
        Commands::Serverless {
            target,
            template,
            output,
            handler_prefix,
        } => {
            let mut config = config;
            if let Some(template) = template {
                config.template_path = template;
            }
            if let Some(output) = output {
                config.output_path = output;
            }
            if let Some(prefix) = handler_prefix {
                config.handler_prefix = prefix;
            }
            serverless_command(&config, &report.registry, &target)
        }
        Commands::Openapi {
            stage,
            output,
            components,
        } => {
            let mut config = config;
            if let Some(components) = components {
                config.components_dir = components;
            }
            let info = load_info(&config, stage.as_deref())?;
            openapi_command(&config, &report.registry, &info, stage.as_deref(), output)
        }
        Commands::Docs { target, output } => {
            let mut config = config;
            if let Some(output) = output {
                config.docs_dir = output;
            }
            let info = load_info(&config, Some(&target.stage))?;
            docs_command(&config, &report.registry, &info, &target)
        }
        Commands::All {
            target,
            template,
            skip_docs,
        } => {
            let mut config = config;
            if let Some(template) = template {
                config.template_path = template;
            }
            all_command(&config, &report.registry, &target, skip_docs)
        }
        Commands::List => {
            list_command(&report.registry);
            Ok(())
        }
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over `-v`
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Configuration file (or defaults) with the global flag overrides applied
fn resolve_config(cli: &Cli) -> Result<BuilderConfig> {
    let mut config = match &cli.config {
        Some(path) => BuilderConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => BuilderConfig::default(),
    };

    if let Some(dir) = &cli.source_dir {
        config.source_dir = dir.clone();
    }
    if let Some(marker) = &cli.root_marker {
        config.root_marker = marker.clone();
    }

    Ok(config)
}

fn load_specs(config: &BuilderConfig) -> Result<LoadReport> {
    println!(
        "{} Scanning handlers in {}",
        "→".cyan(),
        config.source_dir.display()
    );

    let report = load_registry(config).with_context(|| {
        format!("Failed to load specs from {}", config.source_dir.display())
    })?;

    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.path.display(),
            failure.message
        );
    }

    println!(
        "{} Loaded {} specs in {} categories ({} without spec, {} failed)",
        "✓".green(),
        report.registry.len(),
        report.registry.category_count(),
        report.skipped,
        report.failures.len()
    );

    Ok(report)
}

/// Project info for `stage`, read before any artifact is written
fn load_info(config: &BuilderConfig, stage: Option<&str>) -> Result<ProjectInfo> {
    let info_path = config.info_path(stage);
    ProjectInfo::load(&info_path)
        .with_context(|| format!("Failed to load project info {}", info_path.display()))
}

fn all_command(
    config: &BuilderConfig,
    registry: &SpecRegistry,
    target: &Target,
    skip_docs: bool,
) -> Result<()> {
    let info = load_info(config, Some(&target.stage))?;

    serverless_command(config, registry, target)?;
    openapi_command(config, registry, &info, Some(&target.stage), None)?;
    if !skip_docs {
        docs_command(config, registry, &info, target)?;
    }

    println!("\n{}", "✓ All artifacts generated!".green().bold());
    Ok(())
}

fn serverless_command(config: &BuilderConfig, registry: &SpecRegistry, target: &Target) -> Result<()> {
    println!(
        "{} Generating {} for stage {} ({})",
        "→".cyan(),
        config.output_path.display(),
        target.stage.bold(),
        target.ver
    );

    DeploymentGenerator::new(&target.stage, &target.ver)
        .with_handler_prefix(&config.handler_prefix)
        .write(&config.template_path, &config.output_path, registry)
        .with_context(|| {
            format!(
                "Failed to generate deployment document from {}",
                config.template_path.display()
            )
        })?;

    println!(
        "{} Wrote {}",
        "✓".green(),
        config.output_path.display()
    );
    Ok(())
}

fn openapi_command(
    config: &BuilderConfig,
    registry: &SpecRegistry,
    info: &ProjectInfo,
    stage: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let output_path = output.unwrap_or_else(|| config.openapi_output_path(stage));

    println!(
        "{} Generating OpenAPI document for {}",
        "→".cyan(),
        info.title().bold()
    );

    OpenApiGenerator::new(registry, info)
        .write(&config.components_dir, &output_path)
        .context("Failed to generate OpenAPI document")?;

    println!("{} Wrote {}", "✓".green(), output_path.display());
    Ok(())
}

fn docs_command(
    config: &BuilderConfig,
    registry: &SpecRegistry,
    info: &ProjectInfo,
    target: &Target,
) -> Result<()> {
    println!(
        "{} Publishing documentation to {}",
        "→".cyan(),
        config.docs_dir.display()
    );

    let publisher = MarkdownPublisher::new(&config.docs_dir)
        .context("Failed to initialize documentation templates")?;

    let page = publish_documentation(
        &publisher,
        registry,
        info,
        &target.stage,
        &target.ver,
        chrono::Local::now().naive_local(),
    )
    .context("Failed to publish documentation")?;

    println!(
        "{} Published {} ({} entries)",
        "✓".green(),
        publisher.page_path(&page).display(),
        page.entries.len()
    );
    Ok(())
}

fn list_command(registry: &SpecRegistry) {
    if registry.is_empty() {
        println!("{}", "No specs found".yellow());
        return;
    }

    for (category, entries) in registry.categories() {
        println!("\n{} ({})", category.bold(), entries.len());
        for entry in entries {
            let item = &entry.item;
            let kinds: Vec<&str> = item.event.iter().map(|event| event.kind()).collect();
            let route = item
                .rest_event()
                .and_then(|event| event.http_method())
                .map(|method| format!(" {} /{}", method.to_uppercase(), item.uri))
                .unwrap_or_default();

            println!(
                "  • {} [{}]{}",
                item.name.cyan(),
                if kinds.is_empty() {
                    "pure".to_string()
                } else {
                    kinds.join(", ")
                },
                route
            );
        }
    }
}
