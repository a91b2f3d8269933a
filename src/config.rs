use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Flags that can be persisted as defaults with `--save`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub sessions_dir: Option<PathBuf>,
    pub flush_interval_ms: Option<u64>,
    pub name: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge two flag sets; values in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            sessions_dir: other
                .sessions_dir
                .clone()
                .or_else(|| self.sessions_dir.clone()),
            flush_interval_ms: other.flush_interval_ms.or(self.flush_interval_ms),
            name: other.name.clone().or_else(|| self.name.clone()),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("sync-edit").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("sync-edit")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("sync-edit").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("sync-edit")
                .join("config");
        }
    }

    PathBuf::from(".synceditrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".synceditrc")
}

/// Where session logs live unless `--sessions-dir` says otherwise.
pub fn default_sessions_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(appdata).join("sync-edit").join("sessions");
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("sync-edit").join("sessions");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("sync-edit")
                .join("sessions");
        }
    }

    std::env::temp_dir().join("sync-edit")
}

/// Display name for this participant when `--name` is not given.
pub fn default_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .map(|name| sanitize_name(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "editor".to_string())
}

/// Keep names to characters that are safe inside a client id.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .take(32)
        .collect()
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# sync-edit defaults (saved with --save)".to_string());
    if let Some(dir) = &flags.sessions_dir {
        lines.push(format!("--sessions-dir {}", dir.display()));
    }
    if let Some(ms) = flags.flush_interval_ms {
        lines.push(format!("--flush-interval {ms}"));
    }
    if let Some(name) = &flags.name {
        lines.push(format!("--name {name}"));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the persistable flags out of a command line.
///
/// Unknown tokens are ignored, and so is a flag whose value does not parse.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (key, inline) = match token.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (token, None),
        };
        let takes_value = matches!(
            key,
            "--sessions-dir" | "--flush-interval" | "--name" | "--log-file"
        );
        if takes_value {
            let value = inline.or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            });
            if let Some(value) = value {
                apply_flag(&mut flags, key, value);
            }
        }
        i += 1;
    }
    flags
}

fn apply_flag(flags: &mut ConfigFlags, key: &str, value: String) {
    match key {
        "--sessions-dir" => flags.sessions_dir = Some(PathBuf::from(value)),
        "--flush-interval" => flags.flush_interval_ms = value.parse().ok(),
        "--name" => flags.name = Some(value),
        "--log-file" => flags.log_file = Some(PathBuf::from(value)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "sync-edit".to_string(),
            "--sessions-dir".to_string(),
            "/tmp/sessions".to_string(),
            "--flush-interval=250".to_string(),
            "--name".to_string(),
            "ann".to_string(),
            "--log-file=sync.log".to_string(),
            "notes.txt".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert_eq!(flags.sessions_dir, Some(PathBuf::from("/tmp/sessions")));
        assert_eq!(flags.flush_interval_ms, Some(250));
        assert_eq!(flags.name.as_deref(), Some("ann"));
        assert_eq!(flags.log_file, Some(PathBuf::from("sync.log")));
    }

    #[test]
    fn test_parse_flag_tokens_ignores_bad_interval() {
        let args = vec!["--flush-interval".to_string(), "soon".to_string()];
        assert_eq!(parse_flag_tokens(&args).flush_interval_ms, None);
    }

    #[test]
    fn test_parse_flag_tokens_skips_other_flags() {
        let args = vec![
            "--join".to_string(),
            "abc".to_string(),
            "--save".to_string(),
        ];
        assert_eq!(parse_flag_tokens(&args), ConfigFlags::default());
    }

    #[test]
    fn test_config_union_prefers_cli_values() {
        let file = ConfigFlags {
            name: Some("file".to_string()),
            flush_interval_ms: Some(900),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            name: Some("cli".to_string()),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert_eq!(merged.name.as_deref(), Some("cli"));
        assert_eq!(merged.flush_interval_ms, Some(900));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".synceditrc");
        let flags = ConfigFlags {
            sessions_dir: Some(PathBuf::from("shared")),
            flush_interval_ms: Some(300),
            name: Some("ann".to_string()),
            log_file: Some(PathBuf::from("sync.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_sanitize_name_drops_separators() {
        assert_eq!(sanitize_name("ann lee-x/y"), "annleexy");
    }
}
