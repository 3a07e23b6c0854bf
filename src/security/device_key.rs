use crate::errors::{AppError, AppResult};
use crate::utils::path::ensure_parent_dir;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

pub const KEY_LEN: usize = 32;

/// Root secret of the local store. Generated once per device and never
/// leaves it; losing the file makes every sealed record unreadable.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKey([u8; KEY_LEN]);

impl DeviceKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> AppResult<Self> {
        let raw = hex::decode(s.trim()).map_err(|e| AppError::Crypto(format!("device key: {e}")))?;
        let bytes: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|_| AppError::Crypto("device key has the wrong length".into()))?;
        Ok(Self(bytes))
    }

    /// Read the key at `path`, creating it on first use.
    pub fn load_or_create(path: &Path) -> AppResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            return Self::from_hex(&content);
        }

        ensure_parent_dir(path)?;

        let key = Self::generate();
        fs::write(path, hex::encode(key.0))?;
        restrict_permissions(path)?;
        info!(path = %path.display(), "device key created");
        Ok(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceKey(..)")
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}
