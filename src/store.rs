use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::backend::KeyBackend;
use crate::codegen;
use crate::crypto::{self, KdfParams, MasterKey, Sealed};
use crate::encoding::OtpType;
use crate::entry::{CredentialEntry, FetchedEntry, InvalidEntryStub, LiveCode};
use crate::error::{CodeError, StoreError};

const VAULT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StoredEntry {
    #[serde(flatten)]
    entry: CredentialEntry,
    created_at: String,
    updated_at: String,
}

/// On-disk layout: the master key wrapped under the password, and the
/// entry list (JSON) sealed under the master key.
#[derive(Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    kdf: KdfParams,
    wrapped_key: Sealed,
    entries: Sealed,
}

struct Persistence {
    path: PathBuf,
    kdf: KdfParams,
    wrapped_key: Sealed,
    master_key: MasterKey,
}

/// Credential store: entries kept sorted by identifier, optionally backed
/// by an encrypted file that is rewritten after every change.
pub struct Vault {
    entries: Mutex<Vec<StoredEntry>>,
    persistence: Option<Persistence>,
}

impl Vault {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            persistence: None,
        }
    }

    pub fn create(path: &Path, password: &str) -> Result<Self, StoreError> {
        Self::create_with(path, password, KdfParams::generate())
    }

    pub fn create_with(path: &Path, password: &str, kdf: KdfParams) -> Result<Self, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }

        let master_key = crypto::generate_master_key();
        let wrapped_key = crypto::wrap_master_key(password, &kdf, &master_key)?;
        let vault = Self {
            entries: Mutex::new(Vec::new()),
            persistence: Some(Persistence {
                path: path.to_path_buf(),
                kdf,
                wrapped_key,
                master_key,
            }),
        };
        vault.save(&[])?;
        debug!(path = %path.display(), "vault created");
        Ok(vault)
    }

    pub fn open(path: &Path, password: &str) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read vault file {}", path.display()))?;
        let file: VaultFile = serde_json::from_str(&data)
            .with_context(|| format!("malformed vault file {}", path.display()))?;
        if file.version != VAULT_VERSION {
            return Err(anyhow!("unsupported vault version {}", file.version).into());
        }

        let master_key = crypto::unwrap_master_key(password, &file.kdf, &file.wrapped_key)?;
        let plain = crypto::open(&master_key, &file.entries)?
            .ok_or_else(|| anyhow!("vault contents are corrupted"))?;
        let entries: Vec<StoredEntry> =
            serde_json::from_slice(&plain).context("malformed vault contents")?;
        debug!(path = %path.display(), count = entries.len(), "vault opened");

        Ok(Self {
            entries: Mutex::new(entries),
            persistence: Some(Persistence {
                path: path.to_path_buf(),
                kdf: file.kdf,
                wrapped_key: file.wrapped_key,
                master_key,
            }),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.persistence.as_ref().map(|p| p.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|s| s.entry.identifier.clone())
            .collect()
    }

    fn save(&self, entries: &[StoredEntry]) -> anyhow::Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let json = Zeroizing::new(serde_json::to_vec(entries)?);
        let file = VaultFile {
            version: VAULT_VERSION,
            kdf: persistence.kdf.clone(),
            wrapped_key: persistence.wrapped_key.clone(),
            entries: crypto::seal(&persistence.master_key, &json)?,
        };

        // Write next to the target and rename, so a crash never leaves a
        // half-written vault.
        let tmp = persistence.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("cannot write {}", tmp.display()))?;
        set_perms_restrictive(&tmp)?;
        std::fs::rename(&tmp, &persistence.path)
            .with_context(|| format!("cannot replace {}", persistence.path.display()))?;
        Ok(())
    }

    /// Apply `change` to a copy of the list; keep it only if the change
    /// succeeded and could be written.
    fn mutate(&self, change: impl FnOnce(&mut Vec<StoredEntry>) -> bool) -> bool {
        let mut entries = self.entries.lock();
        let mut updated = entries.clone();
        if !change(&mut updated) {
            return false;
        }
        updated.sort_by(|a, b| a.entry.identifier.cmp(&b.entry.identifier));

        if let Err(e) = self.save(&updated) {
            error!("failed to write the vault: {e:#}");
            return false;
        }
        *entries = updated;
        true
    }
}

impl Vault {
    /// Every entry with its code at `unix_time`.
    pub fn fetch_entries_at(&self, unix_time: u64) -> Vec<FetchedEntry> {
        self.live_codes(Ok(unix_time))
    }

    fn live_codes(&self, now: Result<u64, CodeError>) -> Vec<FetchedEntry> {
        let entries = self.entries.lock();

        entries
            .iter()
            .map(|stored| {
                let entry = &stored.entry;
                let code = now
                    .clone()
                    .and_then(|now| codegen::calculate(entry, now).map(|code| (code, now)));
                match code {
                    Ok((current_code, now)) => FetchedEntry::Valid(LiveCode {
                        identifier: entry.identifier.clone(),
                        issuer: entry.issuer.clone(),
                        current_code,
                        otp_type: entry.otp_type,
                        hash_algorithm: entry.hash_algorithm,
                        period: entry.period,
                        hotp_counter: entry.counter_or_offset,
                        window_elapsed: codegen::window_elapsed(entry, now),
                    }),
                    Err(e) => {
                        warn!(identifier = %entry.identifier, "unable to calculate the code: {e}");
                        FetchedEntry::Invalid(InvalidEntryStub {
                            identifier: entry.identifier.clone(),
                            reason: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    }
}

impl KeyBackend for Vault {
    fn fetch_entries(&self) -> Option<Vec<FetchedEntry>> {
        Some(self.live_codes(codegen::unix_now()))
    }

    fn resolve_by_identifier(&self, identifier: &str) -> Option<CredentialEntry> {
        self.entries
            .lock()
            .iter()
            .find(|s| s.entry.identifier == identifier)
            .map(|s| s.entry.clone())
    }

    fn add_entry(&self, entry: &CredentialEntry) -> bool {
        let now = timestamp();
        let added = self.mutate(|entries| {
            if entries.iter().any(|s| s.entry.identifier == entry.identifier) {
                warn!(identifier = %entry.identifier, "an entry with this identifier already exists");
                return false;
            }
            entries.push(StoredEntry {
                entry: entry.clone(),
                created_at: now.clone(),
                updated_at: now,
            });
            true
        });
        if added {
            debug!(identifier = %entry.identifier, "new key was added");
        }
        added
    }

    fn update_entry(&self, original: &str, entry: &CredentialEntry) -> bool {
        let now = timestamp();
        self.mutate(|entries| {
            if entry.identifier != original
                && entries.iter().any(|s| s.entry.identifier == entry.identifier)
            {
                warn!(identifier = %entry.identifier, "cannot rename onto an existing entry");
                return false;
            }
            let Some(stored) = entries.iter_mut().find(|s| s.entry.identifier == original) else {
                warn!(identifier = original, "no entry to update");
                return false;
            };
            stored.entry = entry.clone();
            stored.updated_at = now;
            true
        })
    }

    fn delete_entry(&self, identifier: &str) -> bool {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|s| s.entry.identifier != identifier);
            entries.len() != before
        })
    }

    fn increment_hotp_counter(&self, identifier: &str) -> bool {
        let now = timestamp();
        self.mutate(|entries| {
            let Some(stored) = entries.iter_mut().find(|s| s.entry.identifier == identifier) else {
                warn!(identifier, "unable to locate the entry");
                return false;
            };
            if OtpType::from_code(stored.entry.otp_type) != Some(OtpType::Hotp) {
                warn!(identifier, "cannot increment the counter of a non-HOTP entry");
                return false;
            }
            let Some(next) = stored.entry.counter_or_offset.checked_add(1) else {
                return false;
            };
            stored.entry.counter_or_offset = next;
            stored.updated_at = now;
            true
        })
    }

    fn is_properly_encoded(&self, encoding: i32, secret: &str) -> bool {
        codegen::decode_secret(encoding, secret).is_ok()
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[cfg(unix)]
fn set_perms_restrictive(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_perms_restrictive(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
