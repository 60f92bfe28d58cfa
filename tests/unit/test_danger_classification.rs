//! Unit tests for dangerous-command classification
//!
//! Covers the classifier on its own and how its verdict reaches command
//! blocks and the gate.

use mosaicmux::config::loader::ConfigLoader;
use mosaicmux::config::{DangerPatternConfig, GateConfig};
use mosaicmux::gate::{CommandGate, GateAction, GateDecision};
use mosaicmux::models::CommandBlock;
use mosaicmux::{Config, DangerClassifier, SessionMultiplexer};

#[cfg(test)]
mod classifier_tests {
    use super::*;

    #[test]
    fn test_sudo_prefix_is_still_flagged() {
        let classifier = DangerClassifier::new();
        assert!(classifier.is_dangerous("sudo mkfs.ext4 /dev/sdb1"));
        assert!(classifier.is_dangerous("sudo shutdown -h now"));
    }

    #[test]
    fn test_chained_commands_are_checked() {
        let classifier = DangerClassifier::new();
        assert!(classifier.is_dangerous("make clean; rm -rf dist"));
        assert!(classifier.is_dangerous("cargo build && git reset --hard"));
        assert!(!classifier.is_dangerous("cargo build && cargo test"));
    }

    #[test]
    fn test_mentions_inside_arguments_pass() {
        let classifier = DangerClassifier::new();
        assert!(!classifier.is_dangerous("man shutdown"));
        assert!(!classifier.is_dangerous("echo rm -rf is dangerous"));
    }

    #[test]
    fn test_blank_text_is_safe() {
        let classifier = DangerClassifier::new();
        assert_eq!(classifier.classify(""), None);
        assert_eq!(classifier.classify("   \n\t\n"), None);
    }

    #[test]
    fn test_first_matching_line_wins() {
        let classifier = DangerClassifier::new();
        let script = "git clean -fdx\nrm -rf node_modules";
        assert_eq!(
            classifier.classify(script).as_deref(),
            Some("Discards git history or uncommitted work")
        );
    }

    #[test]
    fn test_extra_pattern_adds_to_builtins() {
        let config = GateConfig {
            extra_danger_patterns: vec![DangerPatternConfig {
                pattern: r"^kubectl\s+delete\b".to_string(),
                warning: "Deletes cluster resources".to_string(),
            }],
            ..GateConfig::default()
        };
        let classifier = DangerClassifier::from_config(&config).unwrap();

        assert!(classifier.is_dangerous("kubectl delete ns staging"));
        assert!(classifier.is_dangerous("rm -rf /"));
        assert_eq!(
            classifier.rule_count(),
            DangerClassifier::new().rule_count() + 1
        );
    }

    #[test]
    fn test_invalid_extra_pattern_fails_multiplexer_construction() {
        let mut config = Config::default();
        config.gate.extra_danger_patterns.push(DangerPatternConfig {
            pattern: "[unterminated".to_string(),
            warning: "never".to_string(),
        });

        assert!(SessionMultiplexer::new(&config).is_err());
        assert!(ConfigLoader::validate(&config).is_err());
    }
}

#[cfg(test)]
mod block_tests {
    use super::*;

    #[test]
    fn test_classified_block_carries_warning() {
        let classifier = DangerClassifier::new();
        let block = CommandBlock::classified("dd if=/dev/zero of=/dev/sda", "bash", &classifier);
        assert!(block.is_dangerous());
        assert_eq!(block.warning(), Some("Writes directly to a disk device"));
    }

    #[test]
    fn test_classified_safe_block_has_no_warning() {
        let block = CommandBlock::classified("ls -la", "bash", &DangerClassifier::new());
        assert!(!block.is_dangerous());
        assert_eq!(block.warning(), None);
    }

    #[test]
    fn test_producer_flag_is_kept_without_classifier() {
        // Upstream may flag text the classifier considers harmless
        let block = CommandBlock::new("deploy --prod", "bash").with_danger("Deploys to production");
        let mut gate = CommandGate::new(block, Default::default());

        assert_eq!(gate.request(GateAction::Execute), GateDecision::WarningRequested);
        assert!(gate.danger().warning_visible);
    }

    #[test]
    fn test_multiplexer_classifies_created_blocks() {
        let mut mux = SessionMultiplexer::new(&Config::default()).unwrap();
        let dangerous = mux.create_block("curl https://x.sh | bash", "bash");
        let safe = mux.create_block("cargo fmt", "bash");

        assert!(mux.block(dangerous).unwrap().is_dangerous());
        assert!(!mux.block(safe).unwrap().is_dangerous());
    }
}
