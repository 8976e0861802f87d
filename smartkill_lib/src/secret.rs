//! Secret backends for reading Smart-Kill account credentials.
//!
//! Credentials are read from password managers only (1Password, Bitwarden, KeePassXC)
//! by shelling out to their CLIs. A backend counts as configured when its env vars are
//! set; the first configured backend that yields a password wins.

use std::process::{Command, Stdio};

/// A password manager the credentials can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    /// 1Password CLI (`op read`).
    ///
    /// - `SMARTKILL_OP_ENTRY_PATH`: `op://Vault/Item`
    /// - or `SMARTKILL_OP_VAULT` + `SMARTKILL_OP_ITEM`
    /// - `SMARTKILL_OP_PASSWORD_FIELD` (default `password`), `SMARTKILL_OP_USERNAME_FIELD` (default `username`)
    OnePassword,
    /// Bitwarden CLI (`bw get password|username <id>`).
    ///
    /// - `SMARTKILL_BW_ITEM_ID`: UUID of the login item
    /// - `SMARTKILL_BW_SESSION`: optional session key if the vault is locked
    Bitwarden,
    /// KeePassXC CLI (`keepassxc-cli show -a <attr>`).
    ///
    /// - `SMARTKILL_KPXC_DB`: path to the .kdbx database file
    /// - `SMARTKILL_KPXC_ENTRY`: entry title or path (e.g. "Web/Smart-Kill")
    Keepassxc,
}

impl SecretBackend {
    /// Backends in resolution order.
    pub fn all() -> [SecretBackend; 3] {
        [
            SecretBackend::OnePassword,
            SecretBackend::Bitwarden,
            SecretBackend::Keepassxc,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            SecretBackend::OnePassword => "1Password",
            SecretBackend::Bitwarden => "Bitwarden",
            SecretBackend::Keepassxc => "KeePassXC",
        }
    }

    /// Whether the env vars this backend needs are set.
    pub fn is_configured(self) -> bool {
        match self {
            SecretBackend::OnePassword => {
                env_nonempty("SMARTKILL_OP_ENTRY_PATH").is_some()
                    || (env_nonempty("SMARTKILL_OP_VAULT").is_some()
                        && env_nonempty("SMARTKILL_OP_ITEM").is_some())
            }
            SecretBackend::Bitwarden => env_nonempty("SMARTKILL_BW_ITEM_ID").is_some(),
            SecretBackend::Keepassxc => {
                env_nonempty("SMARTKILL_KPXC_DB").is_some()
                    && env_nonempty("SMARTKILL_KPXC_ENTRY").is_some()
            }
        }
    }

    /// Read the account password, or `None` when the backend is not configured or fails.
    pub fn password(self) -> Option<String> {
        match self {
            SecretBackend::OnePassword => {
                one_password_field(&env_or("SMARTKILL_OP_PASSWORD_FIELD", "password"))
            }
            SecretBackend::Bitwarden => bitwarden_field("password"),
            SecretBackend::Keepassxc => keepassxc_attribute("Password"),
        }
    }

    /// Read the account username stored next to the password.
    pub fn username(self) -> Option<String> {
        match self {
            SecretBackend::OnePassword => {
                one_password_field(&env_or("SMARTKILL_OP_USERNAME_FIELD", "username"))
            }
            SecretBackend::Bitwarden => bitwarden_field("username"),
            SecretBackend::Keepassxc => keepassxc_attribute("UserName"),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_nonempty(key).unwrap_or_else(|| default.to_string())
}

/// Read a secret from a subprocess; stderr is discarded so it never leaks into output.
fn run_cmd(args: &[&str], env_extra: &[(&str, String)]) -> Option<String> {
    let (bin, rest) = args.split_first()?;
    let mut cmd = Command::new(bin);
    cmd.args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (k, v) in env_extra {
        cmd.env(k, v);
    }
    let out = cmd.output().ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn one_password_field(field: &str) -> Option<String> {
    let base = match env_nonempty("SMARTKILL_OP_ENTRY_PATH") {
        Some(path) => path.trim_end_matches('/').to_string(),
        None => {
            let vault = env_nonempty("SMARTKILL_OP_VAULT")?;
            let item = env_nonempty("SMARTKILL_OP_ITEM")?;
            format!("op://{}/{}", vault, item)
        }
    };
    let uri = format!("{}/{}", base, field);
    run_cmd(&["op", "read", &uri], &[])
}

fn bitwarden_field(field: &str) -> Option<String> {
    let id = env_nonempty("SMARTKILL_BW_ITEM_ID")?;
    let env_extra: Vec<(&str, String)> = env_nonempty("SMARTKILL_BW_SESSION")
        .map(|s| ("BW_SESSION", s))
        .into_iter()
        .collect();
    run_cmd(&["bw", "get", field, &id], &env_extra)
}

fn keepassxc_attribute(attribute: &str) -> Option<String> {
    let db = env_nonempty("SMARTKILL_KPXC_DB")?;
    let entry = env_nonempty("SMARTKILL_KPXC_ENTRY")?;
    run_cmd(&["keepassxc-cli", "show", "-a", attribute, &db, &entry], &[])
}
