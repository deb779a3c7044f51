//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, StreamerBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<StreamerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<StreamerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReapPolicy, SourceConfig};

    #[test]
    fn test_parse_toml_cameras() {
        let content = r#"
[[cameras]]
id = "plaza"
idle_timeout_ms = 8000
reap_policy = "all_stale"
[cameras.source]
kind = "mock"
frequency_hz = 30.0

[[cameras]]
id = "replay"
[cameras.source]
kind = "files"
directory = "/var/frames"
loop_playback = false
[cameras.overlay]
text_file = "/var/overlay.txt"
refresh_interval_ms = 1000
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.cameras.len(), 2);

        let plaza = bp.camera("plaza").unwrap();
        assert_eq!(plaza.idle_timeout_ms, 8000);
        assert_eq!(plaza.reap_policy, ReapPolicy::AllStale);
        assert_eq!(plaza.source.frequency_hz(), 30.0);

        let replay = bp.camera("replay").unwrap();
        assert!(matches!(&replay.source, SourceConfig::Files(s) if !s.loop_playback));
        assert_eq!(replay.overlay.as_ref().unwrap().refresh_interval_ms, 1000);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "cameras": [{
                "id": "cam1",
                "source": { "kind": "mock", "payload_size": 128 }
            }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.cameras[0].id, "cam1");
        assert_eq!(bp.cameras[0].reap_policy, ReapPolicy::OnePerPublish);
    }

    #[test]
    fn test_parse_unknown_source_kind() {
        let content = r#"
[[cameras]]
id = "cam"
[cameras.source]
kind = "rtsp"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
