//! Run configuration: optional TOML file merged with command-line flags

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use solvency_model::ExternalBalances;

/// Values that may come from the config file
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub snapshot: Option<String>,
    pub vault_balance: Option<f64>,
    pub total_settled_collateral: Option<f64>,
    pub output_dir: Option<String>,
}

/// Values given on the command line; these win over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub snapshot: Option<PathBuf>,
    pub vault_balance: Option<f64>,
    pub total_settled_collateral: Option<f64>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub snapshot: PathBuf,
    pub balances: ExternalBalances,
    pub output_dir: PathBuf,
}

impl FileConfig {
    /// Load a config file, `~` and `$VARS` in the path are expanded
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path)?;
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl RunConfig {
    /// Merge file values with overrides
    ///
    /// Only the snapshot path is needed by every command; balances are
    /// required when `require_balances` is set.
    pub fn resolve(file: FileConfig, overrides: Overrides, require_balances: bool) -> Result<Self> {
        let snapshot = match (overrides.snapshot, file.snapshot) {
            (Some(path), _) => path,
            (None, Some(path)) => expand_path(&path)?,
            (None, None) => anyhow::bail!(
                "No snapshot given.\n\
                 Pass --snapshot <FILE> or set `snapshot` in the config file"
            ),
        };

        let vault_balance = overrides.vault_balance.or(file.vault_balance);
        let total_settled_collateral = overrides
            .total_settled_collateral
            .or(file.total_settled_collateral);
        if require_balances && (vault_balance.is_none() || total_settled_collateral.is_none()) {
            anyhow::bail!(
                "Vault balances missing.\n\
                 Pass --vault-balance and --total-settled-collateral or set \
                 `vault_balance` and `total_settled_collateral` in the config file"
            );
        }

        let output_dir = match (overrides.output_dir, file.output_dir) {
            (Some(dir), _) => dir,
            (None, Some(dir)) => expand_path(&dir)?,
            (None, None) => PathBuf::from("."),
        };

        Ok(Self {
            snapshot,
            balances: ExternalBalances {
                vault_balance: vault_balance.unwrap_or_default(),
                total_settled_collateral: total_settled_collateral.unwrap_or_default(),
            },
            output_dir,
        })
    }
}

fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {}", path))?;
    Ok(Path::new(expanded.as_ref()).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_file_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "snapshot = \"snap.json\"\nvault_balance = 4937519.836505\ntotal_settled_collateral = 19493489.556705"
        )
        .unwrap();

        let config = FileConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.snapshot.as_deref(), Some("snap.json"));
        assert_eq!(config.vault_balance, Some(4937519.836505));
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "vault = 1.0").unwrap();
        assert!(FileConfig::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let file = FileConfig {
            snapshot: Some("from-file.json".to_string()),
            vault_balance: Some(1.0),
            total_settled_collateral: Some(2.0),
            output_dir: Some("out".to_string()),
        };
        let overrides = Overrides {
            snapshot: Some(PathBuf::from("flag.json")),
            vault_balance: Some(10.0),
            ..Default::default()
        };

        let config = RunConfig::resolve(file, overrides, true).unwrap();
        assert_eq!(config.snapshot, PathBuf::from("flag.json"));
        assert_eq!(config.balances.vault_balance, 10.0);
        assert_eq!(config.balances.total_settled_collateral, 2.0);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_missing_values() {
        let err = RunConfig::resolve(FileConfig::default(), Overrides::default(), false).unwrap_err();
        assert!(err.to_string().contains("No snapshot given"));

        let overrides = Overrides {
            snapshot: Some(PathBuf::from("snap.json")),
            ..Default::default()
        };
        let err = RunConfig::resolve(FileConfig::default(), overrides.clone(), true).unwrap_err();
        assert!(err.to_string().contains("Vault balances missing"));

        let config = RunConfig::resolve(FileConfig::default(), overrides, false).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("."));
    }
}
