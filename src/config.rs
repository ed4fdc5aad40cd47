use eyre::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    /// Quiet interval after the last resize before the book reflows.
    pub settle_interval_ms: u64,
    /// Viewport width at or below which the book opens flat.
    pub mobile_breakpoint_px: f64,
    /// Account allowed to push new-chapter notifications. Empty means
    /// nobody.
    pub admin_email: String,
    pub cover_image_url: String,
    pub cover_back_image_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 10,
            settle_interval_ms: 500,
            mobile_breakpoint_px: 768.0,
            admin_email: String::new(),
            cover_image_url: "images/cover.jpg".to_string(),
            cover_back_image_url: "images/cover-inner.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    filepath: PathBuf,
}

impl Config {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join("configuration.json");

        if filepath.exists() {
            return Self::load_from(filepath);
        }

        // Save initial config if it doesn't exist
        let settings = Settings::default();
        let initial_config = serde_json::json!({ "Setting": settings });
        fs::create_dir_all(&prefix)?;
        fs::write(&filepath, serde_json::to_string_pretty(&initial_config)?)?;

        Ok(Self { settings, filepath })
    }

    /// Load configuration from a custom path. Missing or malformed
    /// fields fall back to their defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut settings = Settings::default();

        if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            if let Ok(user_config) = serde_json::from_str::<serde_json::Value>(&config_str) {
                if let Some(user_settings_map) =
                    user_config.get("Setting").and_then(|v| v.as_object())
                {
                    if let Some(val) = user_settings_map
                        .get("backend_url")
                        .and_then(|v| v.as_str())
                    {
                        settings.backend_url = val.to_string();
                    }
                    if let Some(val) = user_settings_map
                        .get("request_timeout_secs")
                        .and_then(|v| v.as_u64())
                    {
                        settings.request_timeout_secs = val;
                    }
                    if let Some(val) = user_settings_map
                        .get("settle_interval_ms")
                        .and_then(|v| v.as_u64())
                    {
                        settings.settle_interval_ms = val;
                    }
                    if let Some(val) = user_settings_map
                        .get("mobile_breakpoint_px")
                        .and_then(|v| v.as_f64())
                    {
                        settings.mobile_breakpoint_px = val;
                    }
                    if let Some(val) = user_settings_map
                        .get("admin_email")
                        .and_then(|v| v.as_str())
                    {
                        settings.admin_email = val.to_string();
                    }
                    if let Some(val) = user_settings_map
                        .get("cover_image_url")
                        .and_then(|v| v.as_str())
                    {
                        settings.cover_image_url = val.to_string();
                    }
                    if let Some(val) = user_settings_map
                        .get("cover_back_image_url")
                        .and_then(|v| v.as_str())
                    {
                        settings.cover_back_image_url = val.to_string();
                    }
                }
            }
        }

        Ok(Self { settings, filepath })
    }

    /// Get the configuration file path
    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    /// Create a config with custom settings for testing
    pub fn with_settings(settings: Settings) -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join("test_configuration.json");
        Ok(Self { settings, filepath })
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({ "Setting": self.settings });
        let config_str = serde_json::to_string_pretty(&config_json)?;

        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.filepath, config_str)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.settings.request_timeout_secs)
    }

    pub fn settle_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settings.settle_interval_ms)
    }

    pub fn admin_email(&self) -> Option<&str> {
        if self.settings.admin_email.is_empty() {
            None
        } else {
            Some(&self.settings.admin_email)
        }
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(config_home).join("folio");
        return Ok(path);
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join("folio");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".folio"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".folio"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};
    use tempfile::tempdir;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("lock env mutex")
    }

    #[test]
    fn load_from_partial_config_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("configuration.json");
        let partial = serde_json::json!({
            "Setting": {
                "backend_url": "https://book.example.com",
                "settle_interval_ms": 250
            }
        });
        fs::write(&path, serde_json::to_string(&partial)?)?;

        let config = Config::load_from(path)?;
        assert_eq!(config.settings.backend_url, "https://book.example.com");
        assert_eq!(config.settings.settle_interval_ms, 250);
        // unspecified values keep their defaults
        assert_eq!(config.settings.mobile_breakpoint_px, 768.0);
        assert_eq!(config.settings.request_timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn load_from_invalid_json_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("configuration.json");
        fs::write(&path, "{ invalid json }")?;

        let config = Config::load_from(path)?;
        assert_eq!(config.settings, Settings::default());
        Ok(())
    }

    #[test]
    fn load_from_missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load_from(dir.path().join("nope.json"))?;
        assert_eq!(config.settings, Settings::default());
        Ok(())
    }

    #[test]
    fn save_and_reload_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("configuration.json");

        let mut config = Config::load_from(path.clone())?;
        config.settings.admin_email = "admin@example.com".to_string();
        config.settings.mobile_breakpoint_px = 600.0;
        config.save()?;

        let reloaded = Config::load_from(path)?;
        assert_eq!(reloaded.settings.admin_email, "admin@example.com");
        assert_eq!(reloaded.settings.mobile_breakpoint_px, 600.0);
        assert_eq!(reloaded.admin_email(), Some("admin@example.com"));
        Ok(())
    }

    #[test]
    fn admin_email_empty_means_nobody() -> Result<()> {
        let config = Config::load_from(PathBuf::from("/nonexistent/none.json"))?;
        assert_eq!(config.admin_email(), None);
        Ok(())
    }

    #[test]
    fn durations_derive_from_settings() -> Result<()> {
        let dir = tempdir()?;
        let mut config = Config::load_from(dir.path().join("c.json"))?;
        config.settings.request_timeout_secs = 3;
        config.settings.settle_interval_ms = 750;
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(3));
        assert_eq!(
            config.settle_interval(),
            std::time::Duration::from_millis(750)
        );
        Ok(())
    }

    #[test]
    fn app_data_prefix_prefers_xdg_config_home() {
        let _env_lock = lock_env();
        let original_home = env::var_os("HOME");
        let original_xdg = env::var_os("XDG_CONFIG_HOME");
        let original_profile = env::var_os("USERPROFILE");

        let dir = tempdir().unwrap();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
            env::remove_var("HOME");
            env::remove_var("USERPROFILE");
        }
        assert_eq!(get_app_data_prefix().unwrap(), dir.path().join("folio"));

        unsafe {
            if let Some(home) = original_home {
                env::set_var("HOME", home);
            } else {
                env::remove_var("HOME");
            }
            if let Some(xdg) = original_xdg {
                env::set_var("XDG_CONFIG_HOME", xdg);
            } else {
                env::remove_var("XDG_CONFIG_HOME");
            }
            if let Some(profile) = original_profile {
                env::set_var("USERPROFILE", profile);
            } else {
                env::remove_var("USERPROFILE");
            }
        }
    }
}
