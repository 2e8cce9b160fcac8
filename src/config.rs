//! Extraction configuration, loadable from TOML.
//!
//! ```toml
//! hierarchy_predicates = ["rdfs:subClassOf", "rdfs:subPropertyOf", "BFO:0000050"]
//! intermediates = "none"
//! predicates = ["rdfs:label", "IAO:0000115"]
//! imported_from = "http://purl.obolibrary.org/obo/uberon.owl"
//!
//! [limits]
//! max_depth = 64
//! ```
//!
//! Every key is optional. Command-line flags override loaded values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::closure::{ClosureLimits, Hierarchy};
use crate::error::ConfigError;
use crate::import::Intermediates;
use crate::project::ValueFormat;
use crate::term::vocab;

fn default_hierarchy_predicates() -> Vec<String> {
    vec![
        vocab::RDFS_SUBCLASS_OF.to_string(),
        vocab::RDFS_SUBPROPERTY_OF.to_string(),
    ]
}

fn default_universal_root() -> Option<String> {
    Some(vocab::OWL_THING.to_string())
}

fn default_imported_from_property() -> String {
    vocab::IMPORTED_FROM.to_string()
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Predicates followed by the closure engine.
    #[serde(default = "default_hierarchy_predicates")]
    pub hierarchy_predicates: Vec<String>,
    /// Never entered by ancestor walks.
    #[serde(default = "default_universal_root")]
    pub universal_root: Option<String>,
    /// Used for specs whose source group does not set one.
    #[serde(default)]
    pub intermediates: Intermediates,
    /// Annotation predicates copied into modules. Empty means all.
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default = "default_imported_from_property")]
    pub imported_from_property: String,
    /// Provenance IRI for specs whose source group does not set one.
    #[serde(default)]
    pub imported_from: Option<String>,
    #[serde(default)]
    pub value_format: ValueFormat,
    #[serde(default)]
    pub limits: ClosureLimits,
    /// Compute independent seed closures in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Terms given on the command line are extracted without their
    /// ancestors.
    #[serde(default)]
    pub no_hierarchy: bool,
    /// Hang covered terms that have no parent edge under their nearest
    /// retained ancestors. Adding specs can then drop such an edge.
    #[serde(default)]
    pub placement: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            hierarchy_predicates: default_hierarchy_predicates(),
            universal_root: default_universal_root(),
            intermediates: Intermediates::default(),
            predicates: Vec::new(),
            imported_from_property: default_imported_from_property(),
            imported_from: None,
            value_format: ValueFormat::default(),
            limits: ClosureLimits::default(),
            parallel: default_parallel(),
            no_hierarchy: false,
            placement: false,
        }
    }
}

impl ExtractConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hierarchy_predicates.is_empty() {
            return Err(ConfigError::Invalid {
                message: "`hierarchy_predicates` must name at least one predicate".into(),
            });
        }
        if self.limits.max_terms == Some(0) {
            return Err(ConfigError::Invalid {
                message: "`limits.max_terms` must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The hierarchy relation described by this configuration.
    pub fn hierarchy(&self) -> Hierarchy {
        let hierarchy = Hierarchy::new(self.hierarchy_predicates.iter().map(String::as_str));
        match &self.universal_root {
            Some(root) => hierarchy.with_universal_root(root.as_str()),
            None => hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ExtractConfig = toml::from_str("").unwrap();
        assert_eq!(config, ExtractConfig::default());
        assert_eq!(config.universal_root.as_deref(), Some("owl:Thing"));
        assert_eq!(config.value_format, ValueFormat::Iri);
        assert!(config.parallel);
    }

    #[test]
    fn partial_config() {
        let config: ExtractConfig = toml::from_str(
            r#"
            intermediates = "none"
            value_format = "label"
            [limits]
            max_depth = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.intermediates, Intermediates::None);
        assert_eq!(config.value_format, ValueFormat::Label);
        assert_eq!(config.limits.max_depth, Some(5));
        assert_eq!(config.limits.max_terms, None);
    }

    #[test]
    fn written_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ontoslice.toml");
        let config = ExtractConfig {
            predicates: vec!["rdfs:label".into()],
            imported_from: Some("http://example.com/src.owl".into()),
            placement: true,
            ..Default::default()
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(ExtractConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn placement_is_off_by_default() {
        let config: ExtractConfig = toml::from_str("no_hierarchy = true\n").unwrap();
        assert!(config.no_hierarchy);
        assert!(!config.placement);
    }

    #[test]
    fn empty_hierarchy_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "hierarchy_predicates = []\n").unwrap();
        assert!(matches!(
            ExtractConfig::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn hierarchy_from_config() {
        let config = ExtractConfig::default();
        let hierarchy = config.hierarchy();
        assert_eq!(hierarchy.predicates().len(), 2);
        assert_eq!(hierarchy.universal_root().map(|r| r.as_str()), Some("owl:Thing"));
    }
}
