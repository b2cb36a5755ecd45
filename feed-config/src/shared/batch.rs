use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batch sizing for cursor pages and feed upsert chunks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of entities processed per page and rows written per
    /// upsert chunk.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
}

impl BatchConfig {
    /// Default maximum batch size.
    pub const DEFAULT_MAX_SIZE: usize = 100;

    /// Validates batch configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::invalid(
                "batch.max_size",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_size_is_one_hundred() {
        assert_eq!(BatchConfig::default().max_size, 100);
    }

    #[test]
    fn zero_size_is_rejected() {
        let config = BatchConfig { max_size: 0 };
        assert!(config.validate().is_err());
    }
}
