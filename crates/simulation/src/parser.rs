//! Loading and validation of YAML inputs.

use std::{collections::BTreeSet, path::Path};

use serde::de::DeserializeOwned;

use crate::{error::ConfigError, system::SystemConfig, transfer_simulation::TransferPlan};

fn read_yaml<T: DeserializeOwned, P: AsRef<Path>>(file: P) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
        path: file.as_ref().to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&content)?)
}

impl SystemConfig {
    /// Reads [SystemConfig] from YAML file and validates it.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self, ConfigError> {
        let config: Self = read_yaml(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [SystemConfig::from_yaml], but from a string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that node names are unique and links connect declared nodes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for node in self.nodes.iter() {
            if !names.insert(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode(node.name.clone()));
            }
        }
        for link in self.links.iter() {
            for end in [&link.from, &link.to] {
                if !names.contains(end.as_str()) {
                    return Err(ConfigError::UnknownNode(end.clone()));
                }
            }
        }
        Ok(())
    }
}

impl TransferPlan {
    /// Reads [TransferPlan] from YAML file. Use [TransferPlan::validate] to check it against a system.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self, ConfigError> {
        read_yaml(file)
    }

    /// Same as [TransferPlan::from_yaml], but from a string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Checks that all transfers reference nodes of `system` and have sane parameters.
    pub fn validate(&self, system: &SystemConfig) -> Result<(), ConfigError> {
        for transfer in self.transfers.iter() {
            for end in [&transfer.source, &transfer.target] {
                if !system.has_node(end) {
                    return Err(ConfigError::UnknownNode(end.clone()));
                }
            }
            if transfer.chunks_per_step == 0 {
                return Err(ConfigError::InvalidTransfer {
                    file_name: transfer.file_name.clone(),
                    reason: "chunks_per_step must be positive".to_string(),
                });
            }
            if !transfer.start_time.is_finite() || transfer.start_time < 0.0 {
                return Err(ConfigError::InvalidTransfer {
                    file_name: transfer.file_name.clone(),
                    reason: format!("bad start time {}", transfer.start_time),
                });
            }
        }
        Ok(())
    }
}
