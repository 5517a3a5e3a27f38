//! 設定ファイルの読み込み

use std::path::Path;

use anyhow::{Context, Result};
use evalmap_core::AggregateConfig;

/// TOML の設定ファイルを読む（未指定なら既定値）
///
/// 書かれていない項目は既定値のまま。値の検証は呼び出し側で
/// コマンドライン引数を反映した後に行う。
pub fn load_config(path: Option<&Path>) -> Result<AggregateConfig> {
    let Some(path) = path else {
        return Ok(AggregateConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AggregateConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalmap_core::{CountBounds, ScoreSelection};

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), AggregateConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evalmap.toml");
        let toml = concat!(
            "selection = \"best\"\nworkers = 4\n\n",
            "[bounds]\nmax_piece = 20\n\n",
            "[mate]\nignore = false\n",
        );
        std::fs::write(&path, toml).unwrap();

        let config = load_config(Some(&path)).unwrap();
        let defaults = AggregateConfig::default();
        let bounds = CountBounds {
            max_piece: 20,
            ..CountBounds::default()
        };
        assert_eq!(config.selection, ScoreSelection::Best);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.bounds, bounds);
        assert!(!config.mate.ignore);
        assert_eq!(config.progress_interval, defaults.progress_interval);
    }

    #[test]
    fn test_unreadable_config_has_context() {
        let path = Path::new("/nonexistent/evalmap.toml");
        let err = load_config(Some(path)).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
