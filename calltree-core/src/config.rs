//! Loader options shared by the shard factory and the shard iterator.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::shard::ShardVariant;
use crate::tree::AdmissionPolicy;

/// Options for turning records into shards and pooling them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Target number of live shards in the pool.
    pub batch_size: usize,

    /// `<emb>` placeholders appended to every child representation.
    pub num_emb_tokens: usize,

    /// Traversal cap: subtree ids per document node, and descent depth for
    /// call trees.
    pub max_seq_len: usize,

    /// Padding target of the downstream model. Only checked as an upper
    /// bound for `max_seq_len`.
    pub max_dim: usize,

    pub variant: ShardVariant,

    pub admission: AdmissionPolicy,

    /// Serve only nodes at most this deep.
    pub max_depth: Option<usize>,
}

fn default_batch_size() -> usize {
    4
}

fn default_max_seq_len() -> usize {
    3
}

fn default_max_dim() -> usize {
    768
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            num_emb_tokens: 0,
            max_seq_len: default_max_seq_len(),
            max_dim: default_max_dim(),
            variant: ShardVariant::default(),
            admission: AdmissionPolicy::default(),
            max_depth: None,
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_seq_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_seq_len",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_seq_len > self.max_dim {
            return Err(ConfigError::InvalidValue {
                field: "max_seq_len",
                message: format!("{} exceeds max_dim {}", self.max_seq_len, self.max_dim),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoaderConfig::default();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.max_seq_len, 3);
        assert_eq!(config.admission, AdmissionPolicy::AncestorGated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"batch_size": 8, "variant": "contrastive"}"#).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.variant, ShardVariant::Contrastive);
        assert_eq!(config.max_dim, 768);
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_validation_errors() {
        let config = LoaderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "batch_size", .. })
        ));

        let config = LoaderConfig {
            max_seq_len: 1024,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "max_seq_len", .. })
        ));
    }
}
