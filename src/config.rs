//! Configuration for the cache: where entry files live and which desktop
//! environment is current.

use std::path::PathBuf;

/// System-wide entry directory.
pub const SYSTEM_APPLICATIONS_DIR: &str = "/usr/share/applications";

/// Environment variable listing the current desktop environments.
pub const CURRENT_DESKTOP_VAR: &str = "XDG_CURRENT_DESKTOP";

/// Settings shared by the cache, scanner and watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directories scanned at startup and watched afterwards, in order.
    pub directories: Vec<PathBuf>,
    /// Environment names matched against `OnlyShowIn`/`NotShowIn`.
    pub current_environments: Vec<String>,
    /// Capacity of the cache event broadcast channel.
    pub event_buffer: usize,
}

impl CacheConfig {
    /// Start building a configuration with no directories.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Configuration for the current user session.
    ///
    /// Directories are `$XDG_DATA_HOME/applications` followed by
    /// [`SYSTEM_APPLICATIONS_DIR`]; environments come from
    /// `$XDG_CURRENT_DESKTOP`.
    pub fn from_env() -> Self {
        let mut builder = CacheConfigBuilder::new();
        if let Some(data_home) = dirs::data_dir() {
            builder = builder.directory(data_home.join("applications"));
        }
        builder = builder.directory(SYSTEM_APPLICATIONS_DIR);

        if let Ok(raw) = std::env::var(CURRENT_DESKTOP_VAR) {
            builder = builder.environments(parse_environments(&raw));
        } else {
            tracing::debug!("{} is not set, no environment-specific entries", CURRENT_DESKTOP_VAR);
        }

        builder.build()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfigBuilder::new().build()
    }
}

/// Split a `:`-separated environment list, dropping empty items.
pub fn parse_environments(raw: &str) -> Vec<String> {
    raw.split(':')
        .map(str::trim)
        .filter(|env| !env.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for [`CacheConfig`] with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    directories: Vec<PathBuf>,
    current_environments: Vec<String>,
    event_buffer: usize,
}

impl CacheConfigBuilder {
    /// Empty directory list, no environments.
    pub fn new() -> Self {
        Self {
            directories: Vec::new(),
            current_environments: Vec::new(),
            event_buffer: 256, // Default: 256 pending events
        }
    }

    /// Append a directory.
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Append several directories.
    pub fn directories<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.directories.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Add a current environment name.
    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.current_environments.push(env.into());
        self
    }

    /// Add several current environment names.
    pub fn environments<I, S>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.current_environments
            .extend(envs.into_iter().map(Into::into));
        self
    }

    /// Set the capacity of the event channel.
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            directories: self.directories,
            current_environments: self.current_environments,
            event_buffer: self.event_buffer,
        }
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environments() {
        assert_eq!(parse_environments("ubuntu:GNOME"), vec!["ubuntu", "GNOME"]);
        assert_eq!(parse_environments("XFCE"), vec!["XFCE"]);
        assert!(parse_environments("").is_empty());
        assert_eq!(parse_environments(":KDE::"), vec!["KDE"]);
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::builder()
            .directory("/home/user/.local/share/applications")
            .directories(["/usr/share/applications"])
            .environments(["X-Cinnamon"])
            .environment("GNOME")
            .event_buffer(16)
            .build();

        assert_eq!(
            config.directories,
            vec![
                PathBuf::from("/home/user/.local/share/applications"),
                PathBuf::from("/usr/share/applications"),
            ]
        );
        assert_eq!(config.current_environments, vec!["X-Cinnamon", "GNOME"]);
        assert_eq!(config.event_buffer, 16);
    }

    #[test]
    fn test_default_has_no_directories() {
        let config = CacheConfig::default();
        assert!(config.directories.is_empty());
        assert_eq!(config.event_buffer, 256);
    }

    #[test]
    fn test_from_env_ends_with_system_dir() {
        let config = CacheConfig::from_env();
        assert_eq!(
            config.directories.last(),
            Some(&PathBuf::from(SYSTEM_APPLICATIONS_DIR))
        );
    }
}
