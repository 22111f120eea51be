use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};

use svg_translate::config::{load_app_config, CliOverrides, Settings};
use svg_translate::extraction::extract;
use svg_translate::injection::{inject, start_injects, InjectOptions};
use svg_translate::mapping::{load_mapping, save_mapping, GlobalTranslationMapping};
use svg_translate::progress::{ConsoleProgress, Diagnostics};

#[derive(Parser, Debug)]
#[command(name = "svg-translate")]
#[command(about = "Harvest and reapply translations stored in SVG <switch> blocks", long_about = None)]
struct Cli {
    /// Config file path (default: search for svg-translate.toml upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the translation mapping of an SVG as JSON
    Extract {
        #[arg(value_name = "SVG")]
        input: PathBuf,

        /// Output JSON (default: stdout)
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,

        /// Keep the case of default texts in mapping keys
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Inject translations into one SVG
    Inject {
        #[arg(value_name = "SVG")]
        input: PathBuf,

        #[command(flatten)]
        source: MappingSource,

        /// Output SVG (default: <input dir>/translated/<name>)
        #[arg(short, long, value_name = "SVG")]
        output: Option<PathBuf>,

        /// Replace existing language variants
        #[arg(long)]
        overwrite: bool,

        #[arg(long)]
        case_sensitive: bool,
    },
    /// Inject translations into many SVGs and print a JSON report
    Batch {
        #[arg(value_name = "SVG", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        source: MappingSource,

        /// Output directory (default: <first input dir>/translated)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct MappingSource {
    /// Mapping JSON written by `extract`
    #[arg(long, value_name = "JSON")]
    mapping: Option<PathBuf>,

    /// SVG to extract the mapping from
    #[arg(long, value_name = "SVG")]
    source: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let first_input = match &cli.command {
        Command::Extract { input, .. } | Command::Inject { input, .. } => input.clone(),
        Command::Batch { inputs, .. } => inputs.first().cloned().unwrap_or_default(),
    };
    let workdir = first_input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let (file_cfg, cfg_path) = load_app_config(cli.config.clone(), &workdir)?;
    let overrides = match &cli.command {
        Command::Extract { case_sensitive, .. } => CliOverrides {
            case_sensitive: *case_sensitive,
            ..CliOverrides::default()
        },
        Command::Inject {
            overwrite,
            case_sensitive,
            ..
        } => CliOverrides {
            case_sensitive: *case_sensitive,
            overwrite: *overwrite,
            ..CliOverrides::default()
        },
        Command::Batch {
            overwrite,
            output_dir,
            ..
        } => CliOverrides {
            overwrite: *overwrite,
            output_dir: output_dir.clone(),
            ..CliOverrides::default()
        },
    };
    let overrides = CliOverrides {
        verbose: cli.verbose,
        quiet: cli.quiet,
        ..overrides
    };
    let settings = Settings::resolve(&file_cfg, cfg_path.as_deref(), &workdir, &overrides);
    let progress = ConsoleProgress::new(!settings.quiet).verbose(settings.verbose);

    match cli.command {
        Command::Extract { input, output, .. } => {
            let mapping = extract(&input, settings.extract_case_insensitive, &progress)
                .ok_or_else(|| anyhow!("no translations extracted from {}", input.display()))?;
            match output {
                Some(path) => {
                    save_mapping(&mapping, &path)?;
                    progress.info(&format!("Wrote mapping: {}", path.display()));
                }
                None => {
                    let json = serde_json::to_string_pretty(&mapping).context("serialize mapping")?;
                    println!("{json}");
                }
            }
        }
        Command::Inject {
            input,
            source,
            output,
            ..
        } => {
            let mapping = resolve_mapping(&source, &settings, &progress)?;
            let options = InjectOptions {
                case_insensitive: mapping
                    .lookup_case_insensitive(settings.inject_case_insensitive, &progress),
                overwrite: settings.overwrite,
                save_result: true,
                return_stats: true,
                output_file: output,
                output_dir: None,
            };
            let (_, stats) = inject(&input, &mapping, &options, &progress);
            let stats = stats.context("injector returned no stats")?;
            let json = serde_json::to_string_pretty(&stats).context("serialize stats")?;
            println!("{json}");
            if let Some(kind) = stats.error {
                return Err(anyhow!("inject failed for {}: {}", input.display(), kind.as_str()));
            }
        }
        Command::Batch { inputs, source, .. } => {
            let mut mapping = resolve_mapping(&source, &settings, &progress)?;
            let case_insensitive =
                mapping.lookup_case_insensitive(settings.inject_case_insensitive, &progress);
            mapping.case_insensitive = Some(case_insensitive);
            let report = start_injects(
                &inputs,
                &mapping,
                &settings.output_dir,
                settings.overwrite,
                &progress,
            )?;
            progress.info(&format!(
                "Saved {}, skipped {}, nested {}",
                report.saved_done, report.no_save, report.nested_files
            ));
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn resolve_mapping(
    source: &MappingSource,
    settings: &Settings,
    progress: &dyn Diagnostics,
) -> anyhow::Result<GlobalTranslationMapping> {
    if let Some(path) = source.mapping.as_deref() {
        return load_mapping(path);
    }
    let svg: &Path = source
        .source
        .as_deref()
        .context("missing --mapping or --source")?;
    extract(svg, settings.extract_case_insensitive, progress)
        .ok_or_else(|| anyhow!("no translations extracted from {}", svg.display()))
}
