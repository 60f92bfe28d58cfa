//! Dangerous Command Classification
//!
//! Flags command text that could destroy data or take the machine down so
//! the execution gate can demand an explicit confirmation first. This is a
//! heuristic safety net for upstream producers, not a sandbox.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GateConfig;
use crate::error::Result;

/// Start of a command: beginning of input or after a separator, with an
/// optional `sudo`
const CMD_START: &str = r"(?:^|[;&|(]\s*)(?:sudo\s+)?";

/// Built-in patterns and their warnings
const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    (
        r"rm\s+(?:-\S+\s+)*-[a-zA-Z]*[rR][a-zA-Z]*\b",
        "Recursively deletes files",
    ),
    (r"rm\s+(?:-\S+\s+)*(?:/|/\*|~/?)(?:\s|$)", "Deletes the root or home directory"),
    (r"mkfs(?:\.\w+)?\b", "Formats a filesystem"),
    (r"dd\s+.*\bof=/dev/", "Writes directly to a disk device"),
    (r"chmod\s+(?:-R\s+)?(?:777|666)\s+/(?:\s|$)", "Makes the root filesystem world-writable"),
    (r"(?:shutdown|reboot|halt|poweroff)\b", "Shuts down or restarts the machine"),
    (
        r"git\s+(?:push\s+(?:.*\s)?(?:--force|-f)\b|reset\s+--hard\b|clean\s+-[a-zA-Z]*f)",
        "Discards git history or uncommitted work",
    ),
];

/// Patterns that may appear anywhere in the command line
const ANYWHERE_PATTERNS: &[(&str, &str)] = &[
    (r">\s*/dev/(?:sd|hd|nvme|disk|mmcblk)", "Writes directly to a disk device"),
    (r":\(\)\s*\{", "Fork bomb pattern"),
    (
        r"(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z|da|k)?sh\b",
        "Pipes a download straight into a shell",
    ),
    (r"(?i)\bRemove-Item\b.*-Recurse", "Recursively deletes files"),
    (r"(?i)\bFormat-Volume\b", "Formats a filesystem"),
    (r"(?i)\bformat\s+[a-z]:", "Formats a drive"),
];

static BUILTIN_RULES: Lazy<Vec<DangerRule>> = Lazy::new(|| {
    let anchored = BUILTIN_PATTERNS
        .iter()
        .map(|(pattern, warning)| (format!("{}{}", CMD_START, pattern), *warning));
    let anywhere = ANYWHERE_PATTERNS
        .iter()
        .map(|(pattern, warning)| (pattern.to_string(), *warning));

    anchored
        .chain(anywhere)
        .filter_map(|(pattern, warning)| match DangerRule::new(&pattern, warning) {
            Ok(rule) => Some(rule),
            Err(e) => {
                error!("Built-in danger pattern '{}' failed to compile: {}", pattern, e);
                None
            }
        })
        .collect()
});

/// One classification rule
#[derive(Debug, Clone)]
pub struct DangerRule {
    pattern: Regex,
    warning: String,
}

impl DangerRule {
    /// Compile a rule
    pub fn new(pattern: &str, warning: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            warning: warning.into(),
        })
    }

    /// Warning shown when the rule matches
    pub fn warning(&self) -> &str {
        &self.warning
    }

    /// Whether the rule matches the command text
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Classifies command text as dangerous or not
#[derive(Debug, Clone)]
pub struct DangerClassifier {
    rules: Vec<DangerRule>,
}

impl DangerClassifier {
    /// Classifier with the built-in rules
    pub fn new() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
        }
    }

    /// Classifier with no rules at all
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Built-in rules plus the extra patterns from the gate configuration
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        config
            .extra_danger_patterns
            .iter()
            .try_fold(Self::new(), |classifier, extra| {
                classifier.with_rule(&extra.pattern, extra.warning.clone())
            })
    }

    /// Add a rule
    pub fn with_rule(mut self, pattern: &str, warning: impl Into<String>) -> Result<Self> {
        self.rules.push(DangerRule::new(pattern, warning)?);
        Ok(self)
    }

    /// Warning of the first rule matching any line of `text`
    pub fn classify(&self, text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .find_map(|line| {
                self.rules
                    .iter()
                    .find(|rule| rule.matches(line))
                    .map(|rule| rule.warning.clone())
            })
    }

    /// Whether `text` is flagged by any rule
    pub fn is_dangerous(&self, text: &str) -> bool {
        self.classify(text).is_some()
    }

    /// Number of active rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for DangerClassifier {
    fn default() -> Self {
        Self::new()
    }
}
