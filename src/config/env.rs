use std::env;
use std::str::FromStr;

pub enum EnvKey {
    AwsRegion,
    S3Endpoint,
    AwsAccessKey,
    AwsSecretKey,
    AwsSessionToken,
    JobTmpDir,
    Home,
    JobTimeoutSecs,
    TargetFormat,
    SofficePath,
    MaxObjectBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::AwsRegion => "AWS_REGION",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::AwsAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::AwsSessionToken => "AWS_SESSION_TOKEN",
            EnvKey::JobTmpDir => "JOB_TMP_DIR",
            EnvKey::Home => "HOME",
            EnvKey::JobTimeoutSecs => "JOB_TIMEOUT_SECS",
            EnvKey::TargetFormat => "TARGET_FORMAT",
            EnvKey::SofficePath => "SOFFICE_PATH",
            EnvKey::MaxObjectBytes => "MAX_OBJECT_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Like [`get`], but treats an empty value the same as an unset one.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parses the variable if set. A present but malformed value is an error.
pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    let name = key.as_str();
    match get_opt(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        None => Ok(default),
    }
}
