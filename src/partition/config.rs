use anyhow::{Result, ensure};

/// Tunables controlling when partition leaves split and collapse.
///
/// The triggers are deliberately apart so that small oscillations in entity
/// counts do not thrash the tree: a leaf splits only above
/// `trigger_create_entities` and a subtree collapses only at or below
/// `trigger_destroy_entities`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Fewest entities a split may strand on either side of the dividing line.
    pub min_partition_entities: usize,
    /// Cap on the width of the candidate band scanned for a dividing line.
    pub max_partition_entities: usize,
    /// A leaf holding more than this many entities is split.
    pub trigger_create_entities: usize,
    /// A subtree holding at most this many entities is collapsed.
    pub trigger_destroy_entities: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            min_partition_entities: 4,
            max_partition_entities: 20,
            trigger_create_entities: 15,
            trigger_destroy_entities: 4,
        }
    }
}

impl PartitionConfig {
    /// Check the mutual constraints between the tunables.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.min_partition_entities >= 1, "min_partition_entities must be at least 1");
        ensure!(
            self.max_partition_entities >= self.min_partition_entities,
            "max_partition_entities ({}) must be at least min_partition_entities ({})",
            self.max_partition_entities,
            self.min_partition_entities,
        );
        ensure!(
            self.trigger_create_entities >= 2 * self.min_partition_entities,
            "trigger_create_entities ({}) must be at least twice min_partition_entities ({})",
            self.trigger_create_entities,
            self.min_partition_entities,
        );
        ensure!(
            self.trigger_destroy_entities <= 2 * self.min_partition_entities - 1,
            "trigger_destroy_entities ({}) must be below twice min_partition_entities ({})",
            self.trigger_destroy_entities,
            self.min_partition_entities,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PartitionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_limits() {
        let config = PartitionConfig { min_partition_entities: 8, max_partition_entities: 4, ..PartitionConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_overlapping_triggers() {
        let config = PartitionConfig { trigger_create_entities: 7, ..PartitionConfig::default() };
        assert!(config.validate().is_err());

        let config = PartitionConfig { trigger_destroy_entities: 8, ..PartitionConfig::default() };
        assert!(config.validate().is_err());
    }
}
