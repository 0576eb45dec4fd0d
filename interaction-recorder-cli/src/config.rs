use anyhow::{Context, Result};
use interaction_recorder::RecorderConfig;
use std::path::Path;
use tracing::debug;

/// Load the recorder configuration, falling back to defaults without a file
pub fn load(path: Option<&Path>) -> Result<RecorderConfig> {
    let Some(path) = path else {
        return Ok(RecorderConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: RecorderConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!(?config, "loaded recorder config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = load(None).unwrap();
        assert!(config.record_clicks && config.record_keypresses && config.record_inputs);
        assert!(config.marker.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "record_keypresses: false\nmarker: \"__rec__\"").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert!(!config.record_keypresses);
        assert!(config.record_inputs);
        assert_eq!(config.marker.as_deref(), Some("__rec__"));
    }
}
