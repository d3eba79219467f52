//! Configuration file support
//!
//! Loads analysis configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.gitpulserc.json` in the repository root
//! 3. `gitpulse.config.json` in the repository root
//!
//! All fields are optional. CLI flags take precedence over config file
//! values.

use crate::clones::CloneDetector;
use crate::errors::AnalysisError;
use crate::hours::HoursType;
use crate::similarity::MeasurementType;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default extension allow-list applied when no config names languages
const DEFAULT_LANGUAGES: &[&str] = &[
    "c", "cc", "cpp", "cs", "go", "h", "hpp", "java", "js", "kt", "py", "rb", "rs", "ts",
];

/// Default unified-diff context width
const DEFAULT_CONTEXT_LINES: u32 = 3;

/// Run-wide switch between maximum parallelism and forced serial execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    #[default]
    Parallel,
    Linear,
}

/// External clone-detector invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloneDetectionConfig {
    /// Path to the detector binary
    pub binary: PathBuf,
    /// Extra arguments passed before the working directory is entered
    #[serde(default)]
    pub args: Vec<String>,
}

/// Analysis configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitPulseConfig {
    /// File extensions to analyze (default: common source extensions)
    #[serde(default)]
    pub languages: Vec<String>,

    /// Glob patterns for paths to include (default: all)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for paths to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Enabled similarity measurements (default: the full catalog)
    #[serde(default)]
    pub measurements: Option<Vec<MeasurementType>>,

    /// Hours-estimation parameter sets; duplicates are rejected
    #[serde(default)]
    pub hours_types: Vec<HoursType>,

    /// Clone-detection subprocess; absent disables detection
    #[serde(default)]
    pub clone_detection: Option<CloneDetectionConfig>,

    /// Root for per-pair scratch trees (default: system temp)
    #[serde(default)]
    pub temp_directory: Option<PathBuf>,

    #[serde(default)]
    pub execution_policy: Option<ExecutionPolicy>,

    /// Unified-diff context width (default: 3)
    #[serde(default)]
    pub context_lines: Option<u32>,

    #[serde(default)]
    pub skip_initial_commit: Option<bool>,

    #[serde(default)]
    pub skip_merge_commits: Option<bool>,

    /// Skip the per-pair diff pipeline; span, developers, and hours still run
    #[serde(default)]
    pub skip_git_metrics: Option<bool>,
}

impl GitPulseConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for hours in &self.hours_types {
            if hours.max_commit_diff == 0 || hours.first_commit_add == 0 {
                return Err(AnalysisError::ConfigInvalid(format!(
                    "hours type ({}, {}) must use positive minutes",
                    hours.max_commit_diff, hours.first_commit_add
                ))
                .into());
            }
            if !seen.insert((hours.max_commit_diff, hours.first_commit_add)) {
                return Err(AnalysisError::ConfigInvalid(format!(
                    "duplicate hours type ({}, {})",
                    hours.max_commit_diff, hours.first_commit_add
                ))
                .into());
            }
        }

        for ext in &self.languages {
            if ext.trim().is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(AnalysisError::ConfigInvalid(format!(
                    "language entry '{}' must be a bare extension",
                    ext
                ))
                .into());
            }
        }

        Ok(())
    }
}

/// Resolved configuration with compiled glob patterns and defaults applied
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Lower-cased extension allow-list
    pub languages: Vec<String>,
    /// Compiled include patterns (None means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Enabled measurements, the sentinel always first
    pub measurements: Vec<MeasurementType>,
    pub hours_types: Vec<HoursType>,
    pub clone_detector: CloneDetector,
    pub temp_directory: PathBuf,
    pub execution_policy: ExecutionPolicy,
    pub context_lines: u32,
    pub skip_initial_commit: bool,
    pub skip_merge_commits: bool,
    pub skip_git_metrics: bool,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ResolvedConfig {
    /// True when the path passes the include/exclude globs
    pub fn should_include(&self, path: &str) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(path),
            None => true,
        }
    }

    /// True when the extension is in the allow-list
    pub fn language_allows(&self, extension: Option<&str>) -> bool {
        match extension {
            Some(ext) => self.languages.iter().any(|allowed| allowed == ext),
            None => false,
        }
    }

    /// Measurements without the sentinel
    pub fn real_measurements(&self) -> impl Iterator<Item = MeasurementType> + '_ {
        self.measurements
            .iter()
            .copied()
            .filter(|m| *m != MeasurementType::None)
    }
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            AnalysisError::ConfigInvalid(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::ConfigInvalid(format!("failed to compile globs: {}", e)).into())
}

/// Resolve a loaded configuration into its usable form
pub fn resolve(config: &GitPulseConfig, config_path: Option<PathBuf>) -> Result<ResolvedConfig> {
    config.validate()?;

    let languages = if config.languages.is_empty() {
        DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
    } else {
        config.languages.iter().map(|s| s.to_lowercase()).collect()
    };

    let include = if config.include.is_empty() {
        None
    } else {
        Some(compile_globs(&config.include)?)
    };
    let exclude = compile_globs(&config.exclude)?;

    // The sentinel is implicit and always leads; explicit mentions and
    // duplicates collapse away.
    let mut measurements = vec![MeasurementType::None];
    match &config.measurements {
        Some(enabled) => {
            for &m in enabled {
                if !measurements.contains(&m) {
                    measurements.push(m);
                }
            }
        }
        None => measurements.extend(MeasurementType::catalog()),
    }

    let hours_types = if config.hours_types.is_empty() {
        vec![HoursType::default()]
    } else {
        config.hours_types.clone()
    };

    let clone_detector = match &config.clone_detection {
        Some(detection) => CloneDetector {
            binary: Some(detection.binary.clone()),
            args: detection.args.clone(),
        },
        None => CloneDetector::default(),
    };

    let temp_directory = config
        .temp_directory
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("gitpulse"));

    Ok(ResolvedConfig {
        languages,
        include,
        exclude,
        measurements,
        hours_types,
        clone_detector,
        temp_directory,
        execution_policy: config.execution_policy.unwrap_or_default(),
        context_lines: config.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
        skip_initial_commit: config.skip_initial_commit.unwrap_or(false),
        skip_merge_commits: config.skip_merge_commits.unwrap_or(false),
        skip_git_metrics: config.skip_git_metrics.unwrap_or(false),
        config_path,
    })
}

/// Load configuration using the documented search order
pub fn load_config(explicit: Option<&Path>, repo_root: &Path) -> Result<GitPulseConfig> {
    if let Some(path) = explicit {
        return read_config_file(path);
    }
    for candidate in [".gitpulserc.json", "gitpulse.config.json"] {
        let path = repo_root.join(candidate);
        if path.is_file() {
            return read_config_file(&path);
        }
    }
    Ok(GitPulseConfig::default())
}

fn read_config_file(path: &Path) -> Result<GitPulseConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| {
        AnalysisError::ConfigInvalid(format!("{}: {}", path.display(), e)).into()
    })
}

/// Load and resolve in one step, remembering where the config came from
pub fn load_resolved(explicit: Option<&Path>, repo_root: &Path) -> Result<ResolvedConfig> {
    let config = load_config(explicit, repo_root)?;
    let path = explicit.map(|p| p.to_path_buf()).or_else(|| {
        [".gitpulserc.json", "gitpulse.config.json"]
            .iter()
            .map(|c| repo_root.join(c))
            .find(|p| p.is_file())
    });
    resolve(&config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::exit_code_for;

    #[test]
    fn test_defaults_resolve() {
        let resolved = resolve(&GitPulseConfig::default(), None).unwrap();
        assert!(resolved.languages.contains(&"rs".to_string()));
        assert_eq!(resolved.measurements[0], MeasurementType::None);
        // Sentinel plus the full catalog
        assert_eq!(resolved.measurements.len(), 24);
        assert_eq!(resolved.hours_types, vec![HoursType::default()]);
        assert_eq!(resolved.execution_policy, ExecutionPolicy::Parallel);
        assert_eq!(resolved.context_lines, 3);
        assert!(!resolved.clone_detector.is_enabled());
        assert!(!resolved.skip_git_metrics);
    }

    #[test]
    fn test_explicit_measurements_keep_sentinel_first() {
        let config = GitPulseConfig {
            measurements: Some(vec![
                MeasurementType::JaroWinkler,
                MeasurementType::None,
                MeasurementType::JaroWinkler,
                MeasurementType::Cosine3,
            ]),
            ..Default::default()
        };
        let resolved = resolve(&config, None).unwrap();
        assert_eq!(
            resolved.measurements,
            vec![
                MeasurementType::None,
                MeasurementType::JaroWinkler,
                MeasurementType::Cosine3
            ]
        );
        assert_eq!(resolved.real_measurements().count(), 2);
    }

    #[test]
    fn test_duplicate_hours_types_rejected() {
        let config = GitPulseConfig {
            hours_types: vec![
                HoursType {
                    max_commit_diff: 120,
                    first_commit_add: 120,
                },
                HoursType {
                    max_commit_diff: 120,
                    first_commit_add: 120,
                },
            ],
            ..Default::default()
        };
        let err = resolve(&config, None).unwrap_err();
        assert_eq!(exit_code_for(&err), -1);
    }

    #[test]
    fn test_zero_minute_hours_types_rejected() {
        let config = GitPulseConfig {
            hours_types: vec![HoursType {
                max_commit_diff: 0,
                first_commit_add: 120,
            }],
            ..Default::default()
        };
        assert!(resolve(&config, None).is_err());
    }

    #[test]
    fn test_language_entries_must_be_bare_extensions() {
        let config = GitPulseConfig {
            languages: vec!["rs".to_string(), ".cs".to_string()],
            ..Default::default()
        };
        assert!(resolve(&config, None).is_err());
    }

    #[test]
    fn test_globs_filter_paths() {
        let config = GitPulseConfig {
            include: vec!["src/**".to_string()],
            exclude: vec!["src/generated/**".to_string()],
            ..Default::default()
        };
        let resolved = resolve(&config, None).unwrap();
        assert!(resolved.should_include("src/lib.rs"));
        assert!(!resolved.should_include("tests/lib.rs"));
        assert!(!resolved.should_include("src/generated/schema.rs"));
    }

    #[test]
    fn test_language_allow_list_is_case_folded() {
        let config = GitPulseConfig {
            languages: vec!["RS".to_string(), "cs".to_string()],
            ..Default::default()
        };
        let resolved = resolve(&config, None).unwrap();
        assert!(resolved.language_allows(Some("rs")));
        assert!(resolved.language_allows(Some("cs")));
        assert!(!resolved.language_allows(Some("py")));
        assert!(!resolved.language_allows(None));
    }

    #[test]
    fn test_config_json_roundtrip_and_unknown_fields() {
        let json = r#"{
            "languages": ["rs"],
            "measurements": ["jaro_winkler", "n_gram2"],
            "hours_types": [{"max_commit_diff": 30, "first_commit_add": 120}],
            "execution_policy": "linear",
            "skip_merge_commits": true
        }"#;
        let config: GitPulseConfig = serde_json::from_str(json).unwrap();
        let resolved = resolve(&config, None).unwrap();
        assert_eq!(resolved.execution_policy, ExecutionPolicy::Linear);
        assert!(resolved.skip_merge_commits);
        assert!(!resolved.skip_initial_commit);
        assert_eq!(resolved.hours_types[0].max_commit_diff, 30);

        let bad: Result<GitPulseConfig, _> =
            serde_json::from_str(r#"{"no_such_field": true}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let err = load_config(
            Some(Path::new("/definitely/not/here.json")),
            Path::new("."),
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
