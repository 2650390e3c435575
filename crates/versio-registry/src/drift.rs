//! Drift check: compare stored fingerprints against current ones.
//!
//! A fingerprint is an opaque token recorded next to a class's highest
//! encoder or decoder version. When the class changes shape without a new
//! codec version, an external tool that recomputes fingerprints will see
//! a mismatch. This module does the comparison; computing fingerprints is
//! left to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use versio_protocol::{Role, Version};

use crate::{CodecRegistry, FingerprintEntry};

// ---------------------------------------------------------------------------
// DriftConfig
// ---------------------------------------------------------------------------

/// Settings for [`check_drift`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Module prefixes whose classes are never checked. Defaults to the
    /// standard library crates, whose types cannot drift under us.
    pub skip_modules: Vec<String>,

    /// Report classes that have a stored fingerprint but no current one.
    pub require_current: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            skip_modules: vec!["core".into(), "alloc".into(), "std".into()],
            require_current: true,
        }
    }
}

impl DriftConfig {
    /// Returns `true` if classes from `module` are excluded.
    pub fn skips(&self, module: &str) -> bool {
        self.skip_modules.iter().any(|prefix| {
            module
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

// ---------------------------------------------------------------------------
// DriftFinding
// ---------------------------------------------------------------------------

/// One stored fingerprint that no longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftFinding {
    /// Label of the registry the fingerprint came from.
    pub registry: String,
    pub role: Role,
    pub class_name: String,
    pub module: &'static str,
    pub version: Version,
    pub stored: String,
    /// `None` when no current fingerprint was available.
    pub current: Option<String>,
}

impl fmt::Display for DriftFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(current) => write!(
                f,
                "[{}] {} for `{}` version {} has fingerprint '{}', current is '{}'",
                self.registry, self.role, self.class_name, self.version, self.stored, current
            ),
            None => write!(
                f,
                "[{}] {} for `{}` version {} has fingerprint '{}', no current fingerprint",
                self.registry, self.role, self.class_name, self.version, self.stored
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// check_drift
// ---------------------------------------------------------------------------

/// Compares every stored fingerprint in `registries` against `current`.
///
/// `current` maps a stored entry to the class's fingerprint as it is now.
/// Findings come out in registry order, encoders before decoders, classes
/// sorted by name.
pub fn check_drift<'a, F>(
    registries: impl IntoIterator<Item = &'a CodecRegistry>,
    config: &DriftConfig,
    current: F,
) -> Vec<DriftFinding>
where
    F: Fn(&FingerprintEntry<'_>) -> Option<String>,
{
    let mut findings = Vec::new();

    for registry in registries {
        let entries = registry
            .encoder_fingerprints()
            .chain(registry.decoder_fingerprints());

        for entry in entries {
            if config.skips(entry.module) {
                continue;
            }

            let now = current(&entry);
            let drifted = match &now {
                Some(now) => now != entry.fingerprint,
                None => config.require_current,
            };
            if !drifted {
                continue;
            }

            let finding = DriftFinding {
                registry: registry.label().to_owned(),
                role: entry.role,
                class_name: entry.class_name.to_owned(),
                module: entry.module,
                version: entry.version,
                stored: entry.fingerprint.to_owned(),
                current: now,
            };
            tracing::warn!(%finding, "fingerprint drift");
            findings.push(finding);
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skips_std_crates() {
        let config = DriftConfig::default();
        assert!(config.skips("core::time"));
        assert!(config.skips("std"));
        assert!(config.skips("alloc::collections::btree::set"));
        assert!(!config.skips("corelib::time"));
        assert!(!config.skips("app::geometry"));
        assert!(config.require_current);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: DriftConfig =
            serde_json::from_str(r#"{"require_current": false}"#).unwrap();
        assert!(!config.require_current);
        assert_eq!(config.skip_modules, DriftConfig::default().skip_modules);
    }

    #[test]
    fn test_finding_display() {
        let finding = DriftFinding {
            registry: "app".into(),
            role: Role::Encoder,
            class_name: "Point".into(),
            module: "app::geometry",
            version: Version(2),
            stored: "aaa".into(),
            current: Some("bbb".into()),
        };
        assert_eq!(
            finding.to_string(),
            "[app] encoder for `Point` version 2 has fingerprint 'aaa', current is 'bbb'"
        );
    }
}
