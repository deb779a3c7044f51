//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (由 `validator` derive 声明，例如 frequency_hz > 0)
//! - camera id 唯一
//! - stale_timeout 小于 idle_timeout
//! - files 源的目录不能为空路径

use std::collections::HashSet;

use contracts::{CameraConfig, ContractError, SourceConfig, StreamerBlueprint};
use validator::{Validate, ValidationErrors};

/// 校验 StreamerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| field_errors("cameras", &e))?;

    validate_camera_ids(blueprint)?;
    for camera in &blueprint.cameras {
        validate_camera(camera)?;
    }
    Ok(())
}

/// 将 derive 校验错误转为 ContractError
fn field_errors(path: &str, errors: &ValidationErrors) -> ContractError {
    ContractError::config_validation(path, errors.to_string())
}

/// 校验 camera id 唯一性
fn validate_camera_ids(blueprint: &StreamerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for camera in &blueprint.cameras {
        if !seen.insert(camera.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("cameras[id={}]", camera.id),
                "duplicate camera id",
            ));
        }
    }
    Ok(())
}

/// 校验单个相机
fn validate_camera(camera: &CameraConfig) -> Result<(), ContractError> {
    let path = format!("cameras[{}]", camera.id);

    camera.validate().map_err(|e| field_errors(&path, &e))?;
    camera
        .source
        .validate()
        .map_err(|e| field_errors(&format!("{path}.source"), &e))?;
    if let Some(overlay) = &camera.overlay {
        overlay
            .validate()
            .map_err(|e| field_errors(&format!("{path}.overlay"), &e))?;
    }

    // 失效回收窗口必须短于空闲超时，否则空闲停止前无法回收
    if camera.stale_timeout_ms >= camera.idle_timeout_ms {
        return Err(ContractError::config_validation(
            format!("{path}.stale_timeout_ms"),
            format!(
                "stale_timeout_ms ({}) must be < idle_timeout_ms ({})",
                camera.stale_timeout_ms, camera.idle_timeout_ms
            ),
        ));
    }

    if let SourceConfig::Files(settings) = &camera.source {
        if settings.directory.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("{path}.source.directory"),
                "directory cannot be empty",
            ));
        }
    }

    Ok(())
}
