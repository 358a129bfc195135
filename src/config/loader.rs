//! 環境変数からの設定読み込み

use std::path::PathBuf;

use super::{
    ConfigError,
    ServerSettings,
    ValidationError,
};

/// バインドアドレス
pub const HOST_VAR: &str = "HOST";
/// ポート番号
pub const PORT_VAR: &str = "PORT";
/// 接続を許可するオリジン
pub const CLIENT_ORIGIN_VAR: &str = "CLIENT_ORIGIN";
/// 辞書ファイルのパス
pub const TRANSLATIONS_PATH_VAR: &str = "TRANSLATIONS_PATH";

/// プロセスの環境変数から設定を読み込む
///
/// カレントディレクトリに `.env` があれば先に読み込む（既存の環境変数は上書きしない）。
///
/// # Errors
/// - 値のパースエラー
/// - バリデーションエラー
pub fn load_from_env() -> Result<ServerSettings, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from: {:?}", path),
        Err(error) if error.not_found() => tracing::debug!(".env file not found"),
        Err(error) => tracing::warn!("Failed to read .env file: {}", error),
    }

    load_with(|key| std::env::var(key).ok())
}

/// 任意の変数ソースから設定を読み込む
///
/// 未設定の変数はデフォルト値を使う。エラーはすべて収集してまとめて返す。
///
/// # Arguments
/// * `lookup` - 変数名から値を返す関数
///
/// # Errors
/// - 値のパースエラー
/// - バリデーションエラー
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerSettings, ConfigError> {
    let mut settings = ServerSettings::default();
    let mut errors = Vec::new();

    if let Some(host) = lookup(HOST_VAR) {
        match host.trim().parse() {
            Ok(host) => settings.host = host,
            Err(_) => errors.push(ValidationError::new(
                HOST_VAR,
                format!("'{host}' is not an IP address. Example: \"0.0.0.0\""),
            )),
        }
    }

    if let Some(port) = lookup(PORT_VAR) {
        match port.trim().parse() {
            Ok(port) => settings.port = port,
            Err(_) => errors.push(ValidationError::new(
                PORT_VAR,
                format!("'{port}' is not a port number (0-65535)"),
            )),
        }
    }

    if let Some(origin) = lookup(CLIENT_ORIGIN_VAR) {
        settings.client_origin = origin;
    }

    if let Some(path) = lookup(TRANSLATIONS_PATH_VAR) {
        settings.translations_path = PathBuf::from(path);
    }

    if let Err(validation_errors) = settings.validate() {
        errors.extend(validation_errors);
    }

    if !errors.is_empty() {
        return Err(ConfigError::ValidationErrors(errors));
    }

    tracing::debug!("Settings loaded successfully: {:?}", settings);
    Ok(settings)
}
