use crate::utils::errors::{HostCaError, Result};
use dirs;
use std::fs;
use std::path::{Path, PathBuf};

pub struct HostCaPaths;
const PROGRAM_NAME: &str = "hostca";
const CONFIG_ENV: &str = "HOSTCA_CONFIG";
const CONFIG_FILE: &str = "authorities.yaml";

impl HostCaPaths {
    /// Get the config directory: ~/.config/hostca/
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| HostCaError::Config("Cannot determine config directory".to_string()))
    }

    /// Resolve the authority config file: explicit path, then $HOSTCA_CONFIG,
    /// then ~/.config/hostca/authorities.yaml
    pub fn authority_config(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Directory holding issued certificates: <root>/certs/by-name/
    pub fn certs_dir(storage_root: &Path) -> PathBuf {
        storage_root.join("certs").join("by-name")
    }

    /// Directory holding leaf private keys: <root>/private/by-name/
    pub fn private_dir(storage_root: &Path) -> PathBuf {
        storage_root.join("private").join("by-name")
    }

    /// Issued certificate path: <root>/certs/by-name/<hostname>.crt
    pub fn certificate_path(storage_root: &Path, hostname: &str) -> PathBuf {
        Self::certs_dir(storage_root).join(format!("{hostname}.crt"))
    }

    /// Leaf private key path: <root>/private/by-name/<hostname>.key
    pub fn private_key_path(storage_root: &Path, hostname: &str) -> PathBuf {
        Self::private_dir(storage_root).join(format!("{hostname}.key"))
    }

    /// Ensure a directory exists, applying `mode` to directories created here
    pub fn ensure_dir_exists(path: &Path, mode: u32) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(mode);
                fs::set_permissions(path, perms)?;
            }
            #[cfg(not(unix))]
            let _ = mode;
        }
        Ok(())
    }
}
