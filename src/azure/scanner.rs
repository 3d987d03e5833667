/// Detection of local files referenced by a kubectl/helm command line
///
/// `az aks command invoke` only sees files that are uploaded with `--file`,
/// so manifests, kustomize directories and local charts named in the command
/// have to be found and attached. This is a heuristic: a missed file is
/// acceptable, attaching a path that does not exist is not.
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::error::XksError;

/// One rule that proposes candidate paths from a command line
pub trait PathExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Candidate paths in the order they appear, existence unchecked
    fn candidates(&self, command: &str) -> Vec<String>;
}

/// Matches `<flag> <path>`, e.g. `-f deploy.yaml`
pub struct FlagExtractor {
    flag: String,
    pattern: Regex,
}

impl FlagExtractor {
    pub fn new(flag: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"{}\s+(\S+)", regex::escape(flag)))?;
        Ok(Self {
            flag: flag.to_string(),
            pattern,
        })
    }
}

impl PathExtractor for FlagExtractor {
    fn name(&self) -> &str {
        &self.flag
    }

    fn candidates(&self, command: &str) -> Vec<String> {
        self.pattern
            .captures_iter(command)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .collect()
    }
}

/// Local chart path of `helm install|upgrade <release> <chart>`
pub struct HelmChartExtractor;

impl HelmChartExtractor {
    /// Remote references like `bitnami/nginx` must not be treated as paths
    fn looks_local(chart: &str) -> bool {
        chart.starts_with("./") || chart.starts_with('/') || !chart.contains('/')
    }
}

impl PathExtractor for HelmChartExtractor {
    fn name(&self) -> &str {
        "helm chart"
    }

    fn candidates(&self, command: &str) -> Vec<String> {
        if !command.contains("helm install") && !command.contains("helm upgrade") {
            return Vec::new();
        }

        let parts: Vec<&str> = command.split_whitespace().collect();
        parts
            .iter()
            .enumerate()
            .find(|(i, part)| (**part == "install" || **part == "upgrade") && i + 2 < parts.len())
            .map(|(i, _)| parts[i + 2])
            .filter(|chart| Self::looks_local(chart))
            .map(|chart| vec![chart.to_string()])
            .unwrap_or_default()
    }
}

/// Ordered list of extractors plus an existence filter
pub struct FileReferenceScanner {
    extractors: Vec<Box<dyn PathExtractor>>,
}

impl FileReferenceScanner {
    /// Scanner with no rules; add them with [`FileReferenceScanner::with_extractor`]
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// `-f`, `--filename`, `-k`, `--kustomize`, then helm chart paths
    pub fn with_default_rules() -> Result<Self, XksError> {
        let mut scanner = Self::empty();
        for flag in ["-f", "--filename", "-k", "--kustomize"] {
            scanner = scanner.with_extractor(FlagExtractor::new(flag)?);
        }
        Ok(scanner.with_extractor(HelmChartExtractor))
    }

    pub fn with_extractor(mut self, extractor: impl PathExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Existing paths referenced by `command`, relative to the working directory
    pub fn scan(&self, command: &str) -> Vec<String> {
        match std::env::current_dir() {
            Ok(cwd) => self.scan_in(command, &cwd),
            Err(e) => {
                tracing::debug!("Cannot resolve working directory, attaching nothing: {}", e);
                Vec::new()
            }
        }
    }

    /// Existing paths referenced by `command`, relative paths resolved against `base`
    ///
    /// Paths are returned as written in the command, deduplicated in
    /// first-seen order.
    pub fn scan_in(&self, command: &str, base: &Path) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for extractor in &self.extractors {
            for candidate in extractor.candidates(command) {
                if candidate.is_empty() || seen.contains(&candidate) {
                    continue;
                }
                if base.join(&candidate).exists() {
                    tracing::debug!("Detected {} reference: {}", extractor.name(), candidate);
                    seen.insert(candidate.clone());
                    found.push(candidate);
                }
            }
        }

        found
    }
}
