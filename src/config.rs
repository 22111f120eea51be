use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "svg-translate.toml";
pub const CONFIG_ENV: &str = "SVG_TRANSLATE_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub extract: ExtractSection,
    #[serde(default)]
    pub inject: InjectSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExtractSection {
    /// Fold case of default texts when building mapping keys (default: true).
    #[serde(default)]
    pub case_insensitive: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct InjectSection {
    /// Replace language variants already present in targets (default: false).
    #[serde(default)]
    pub overwrite: Option<bool>,
    #[serde(default)]
    pub case_insensitive: Option<bool>,
    /// Batch output directory. Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LogSection {
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub quiet: Option<bool>,
}

/// Effective settings after merging CLI flags over the config file over defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub extract_case_insensitive: bool,
    pub inject_case_insensitive: bool,
    pub overwrite: bool,
    pub output_dir: PathBuf,
    pub verbose: bool,
    pub quiet: bool,
}

/// Flags given on the command line; `None` means "not given".
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub case_sensitive: bool,
    pub overwrite: bool,
    pub output_dir: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
}

impl Settings {
    pub fn resolve(
        cfg: &AppConfig,
        config_path: Option<&Path>,
        workdir: &Path,
        cli: &CliOverrides,
    ) -> Self {
        let config_dir = config_path
            .and_then(|p| p.parent())
            .unwrap_or(workdir)
            .to_path_buf();

        let extract_case_insensitive = !cli.case_sensitive && cfg.extract.case_insensitive.unwrap_or(true);
        let inject_case_insensitive = !cli.case_sensitive
            && cfg
                .inject
                .case_insensitive
                .or(cfg.extract.case_insensitive)
                .unwrap_or(true);
        let overwrite = cli.overwrite || cfg.inject.overwrite.unwrap_or(false);
        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| {
                cfg.inject.output_dir.as_ref().map(|p| {
                    if p.is_relative() {
                        config_dir.join(p)
                    } else {
                        p.clone()
                    }
                })
            })
            .unwrap_or_else(|| workdir.join("translated"));

        Self {
            extract_case_insensitive,
            inject_case_insensitive,
            overwrite,
            output_dir,
            verbose: cli.verbose || cfg.log.verbose.unwrap_or(false),
            quiet: cli.quiet || cfg.log.quiet.unwrap_or(false),
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    find_file_upwards(workdir, filename, 8)
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Resolves and loads the config: explicit path, then `SVG_TRANSLATE_CONFIG`, then a
/// search upwards for `svg-translate.toml`. A missing file yields the defaults.
pub fn load_app_config(
    explicit: Option<PathBuf>,
    workdir: &Path,
) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    let cfg_file = explicit
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .or_else(|| find_default_config(workdir, CONFIG_FILENAME));
    match cfg_file {
        Some(p) if p.exists() => Ok((load_config(&p)?, Some(p))),
        _ => Ok((AppConfig::default(), None)),
    }
}
