//! Run settings: built-in defaults, an optional TOML file and environment.

mod settings;

pub use settings::{READER_KEY_ENV, Settings, SettingsError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ExistingPolicy;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.language, "en");
        assert_eq!(settings.reader_url, "https://r.jina.ai");
        assert_eq!(settings.timeout_secs, 120);
        assert_eq!(settings.on_existing, ExistingPolicy::Overwrite);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                host = "gpu-box"
                delay_ms = 3000
                on_existing = "error"
            "#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();

        assert_eq!(settings.host, "gpu-box");
        assert_eq!(settings.delay_ms, 3000);
        assert_eq!(settings.on_existing, ExistingPolicy::Error);
        assert_eq!(settings.language, "en");
        assert_eq!(settings.timeout_secs, 120);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = Settings::load(Some(PathBuf::from("/nonexistent/batch-synth.toml").as_path()));

        assert!(matches!(result.unwrap_err(), SettingsError::NotFound(_)));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();

        assert!(matches!(
            Settings::from_file(&path).unwrap_err(),
            SettingsError::Parse { .. }
        ));
    }

    #[test]
    fn test_reader_key_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "reader_api_key = \"from-file\"").unwrap();

        // Only this test touches the variable.
        unsafe { std::env::set_var(READER_KEY_ENV, "from-env") };
        let settings = Settings::load(Some(&path));
        unsafe { std::env::remove_var(READER_KEY_ENV) };

        assert_eq!(settings.unwrap().reader_api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_language_prefers_command_line() {
        let settings = Settings {
            language: "de".to_string(),
            ..Settings::default()
        };

        assert_eq!(settings.language_or(Some("fr")), "fr");
        assert_eq!(settings.language_or(None), "de");
    }
}
