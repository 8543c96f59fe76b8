use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use regex::Regex;
use crate::common::DispatchConfig;
use crate::data::CROSS_MARK;
use crate::utils;

/// Engine files checked and parsed once at startup.
///
/// Any failure here is fatal: the dispatcher cannot run without a model whose
/// class list matches the configured names.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineArtifacts {
    pub config_path: PathBuf,
    pub weights_path: PathBuf,
    pub meta_path: PathBuf,
    pub class_names: Vec<String>,
    pub net_width: u32,
    pub net_height: u32,
}

impl EngineArtifacts {
    pub fn load(config: &DispatchConfig) -> Result<Self> {
        let config_path = PathBuf::from(&config.config_path);
        let weights_path = PathBuf::from(&config.weights_path);
        let meta_path = PathBuf::from(&config.meta_path);

        let cfg_text = read_artifact(&config_path, "engine config")?;
        let meta_text = read_artifact(&meta_path, "engine meta")?;
        check_readable(&weights_path, "weights")?;

        let (net_width, net_height) = parse_net_size(&cfg_text)
            .with_context(|| format!("{CROSS_MARK} Malformed engine config {}", config_path.display()))?;
        let (classes, names_file) = parse_meta(&meta_text)
            .with_context(|| format!("{CROSS_MARK} Malformed engine meta {}", meta_path.display()))?;

        let class_names = resolve_class_names(config, &meta_path, names_file)?;
        if class_names.len() != classes {
            anyhow::bail!(
                "{CROSS_MARK} Class count mismatch: engine meta declares {} classes but {} class names are configured",
                classes,
                class_names.len()
            );
        }

        log::info!(
            "Engine artifacts loaded | Network: {}x{} | Classes: {}",
            net_width, net_height, classes
        );

        Ok(Self {
            config_path,
            weights_path,
            meta_path,
            class_names,
            net_width,
            net_height,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}

fn read_artifact(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("{CROSS_MARK} Unable to read {} file {}", what, path.display()))
}

fn check_readable(path: &Path, what: &str) -> Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("{CROSS_MARK} Unable to read {} file {}", what, path.display()))?;
    if !meta.is_file() || meta.len() == 0 {
        anyhow::bail!("{CROSS_MARK} {} file {} is empty or not a file", what, path.display());
    }
    Ok(())
}

/// Class names come from the config list, then `labels_path`, then the
/// meta file's `names` entry (relative to the meta file).
fn resolve_class_names(config: &DispatchConfig, meta_path: &Path, names_file: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(names) = config.configured_class_names()? {
        return Ok(names);
    }
    let labels = match names_file {
        Some(names) if names.is_relative() => match meta_path.parent() {
            Some(dir) => dir.join(names),
            None => names,
        },
        Some(names) => names,
        None => anyhow::bail!("{CROSS_MARK} No class names configured and the engine meta has no names entry"),
    };
    utils::file_to_vec(&labels)
        .with_context(|| format!("{CROSS_MARK} Unable to read class names from {}", labels.display()))
}

/// Parses `classes = N` and the optional `names = <file>` entry.
pub(crate) fn parse_meta(text: &str) -> Result<(usize, Option<PathBuf>)> {
    let classes_re = Regex::new(r"(?m)^\s*classes\s*=\s*(\d+)\s*$")?;
    let names_re = Regex::new(r"(?m)^\s*names\s*=\s*(\S.*?)\s*$")?;

    let classes = match classes_re.captures(text) {
        Some(caps) => caps[1].parse::<usize>()?,
        None => anyhow::bail!("missing `classes` entry"),
    };
    if classes == 0 {
        anyhow::bail!("`classes` must be greater than zero");
    }
    let names = names_re.captures(text).map(|caps| PathBuf::from(&caps[1]));
    Ok((classes, names))
}

/// Reads the network input resolution from the first `width=`/`height=` keys.
pub(crate) fn parse_net_size(text: &str) -> Result<(u32, u32)> {
    let width_re = Regex::new(r"(?m)^\s*width\s*=\s*(\d+)\s*$")?;
    let height_re = Regex::new(r"(?m)^\s*height\s*=\s*(\d+)\s*$")?;

    let width = width_re.captures(text).map(|caps| caps[1].parse::<u32>()).transpose()?;
    let height = height_re.captures(text).map(|caps| caps[1].parse::<u32>()).transpose()?;
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => anyhow::bail!("missing or zero network `width`/`height`"),
    }
}
