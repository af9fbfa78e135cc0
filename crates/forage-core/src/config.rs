//! Options files.
//!
//! Two formats are accepted. The native one is a flat list of
//! `key = value;` lines mapping onto [`SimulationOptions`] fields:
//!
//! ```text
//! # cautious-foragers
//! risky_choices = 0.9;
//! learn_time = 20;
//! common_knowledge = 0;
//! ```
//!
//! A line of the form `# name` names the run. The trailing `;` is optional,
//! blank lines are skipped and unknown keys are ignored. A value that fails
//! to parse is reported as an [`OptionsIssue`] and leaves that field alone;
//! every other line still applies.
//!
//! Files ending in `.yaml` or `.yml` are deserialized whole; missing keys
//! keep their defaults.

use std::path::Path;

use forage_types::SimulationOptions;
use tracing::{debug, warn};

/// Errors that can occur when loading an options file.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// Failed to read the options file from disk.
    #[error("failed to read options file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse options YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for OptionsError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A line of a `key = value` file that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: cannot apply {key} = {value:?}: {reason}")]
pub struct OptionsIssue {
    /// One-based line number.
    pub line: usize,
    /// Key as written.
    pub key: String,
    /// Value as written, without the trailing `;`.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

/// Apply every line of a `key = value` document to `options`.
///
/// Returns the lines that could not be applied; an empty list means the
/// whole document was accepted.
pub fn parse_options(source: &str, options: &mut SimulationOptions) -> Vec<OptionsIssue> {
    let mut issues = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx.saturating_add(1);
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        let Some((key, value)) = text.split_once('=') else {
            if let Some(name) = text.strip_prefix('#') {
                options.name = name.trim().to_owned();
                debug!(name = %options.name, "options name set");
            } else {
                issues.push(OptionsIssue {
                    line,
                    key: text.to_owned(),
                    value: String::new(),
                    reason: String::from("expected `key = value`"),
                });
            }
            continue;
        };

        let key = key.trim();
        let value = value.trim();
        let value = value.strip_suffix(';').unwrap_or(value).trim();

        match apply(options, key, value) {
            Ok(true) => debug!(key, value, "option applied"),
            Ok(false) => debug!(key, line, "unknown option ignored"),
            Err(reason) => {
                let issue = OptionsIssue {
                    line,
                    key: key.to_owned(),
                    value: value.to_owned(),
                    reason,
                };
                warn!(%issue, "option skipped");
                issues.push(issue);
            }
        }
    }

    issues
}

/// Parse a whole YAML options document.
///
/// # Errors
///
/// Returns [`OptionsError::Yaml`] if the document is malformed.
pub fn parse_yaml(source: &str) -> Result<SimulationOptions, OptionsError> {
    Ok(serde_yml::from_str(source)?)
}

/// Read an options file, choosing the format by extension.
///
/// Returns the options (defaults overridden by the file) and the lines that
/// could not be applied.
///
/// # Errors
///
/// Returns [`OptionsError::Io`] if the file cannot be read and
/// [`OptionsError::Yaml`] for a malformed YAML file.
pub fn load_options(
    path: impl AsRef<Path>,
) -> Result<(SimulationOptions, Vec<OptionsIssue>), OptionsError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        return Ok((parse_yaml(&contents)?, Vec::new()));
    }

    let mut options = SimulationOptions::default();
    let issues = parse_options(&contents, &mut options);
    Ok((options, issues))
}

/// Set one field. `Ok(false)` for an unknown key.
fn apply(options: &mut SimulationOptions, key: &str, value: &str) -> Result<bool, String> {
    match key {
        "target_threshold" => options.target_threshold = number(value)?,
        "share_good_path_place" => options.share_good_path_place = number(value)?,
        "share_good_path" => options.share_good_path = number(value)?,
        "share_good_place" => options.share_good_place = number(value)?,
        "share_good_distributed_place" => options.share_good_distributed_place = number(value)?,
        "share_good_direction" => options.share_good_direction = number(value)?,
        "share_bad_place" => options.share_bad_place = number(value)?,
        "share_bad_distributed_place" => options.share_bad_distributed_place = number(value)?,
        "risky_choices" => options.risky_choices = number(value)?,
        "survival_chance" => options.survival_chance = number(value)?,
        "good_threshold" => options.good_threshold = number(value)?,
        "bad_threshold" => options.bad_threshold = number(value)?,
        "share_radius" => options.share_radius = number(value)?,
        "share_chance" => options.share_chance = number(value)?,
        "repeated_share" => options.repeated_share = number(value)?,
        "step_time" => options.step_time = number(value)?,
        "learn_time" => options.learn_time = number(value)?,
        "distribute_radius" => options.distribute_radius = number(value)?,
        "start_agent_count" => options.start_agent_count = number(value)?,
        "agent_spawn_time" => options.agent_spawn_time = number(value)?,
        "foodless_survival" => options.foodless_survival = number(value)?,
        "terrain_modify_step" => options.terrain_modify_step = number(value)?,
        "default_field_value" => options.default_field_value = number(value)?,
        "common_knowledge" => options.common_knowledge = flag(value)?,
        "seed" => options.seed = Some(number(value)?),
        "name" => value.clone_into(&mut options.name),
        _ => return Ok(false),
    }
    Ok(true)
}

fn number<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|err| err.to_string())
}

fn flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(String::from("expected true, false, 1 or 0")),
    }
}
