use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use super::error::JobError;
use super::model::{ErrorKind, JobReceipt, JobRequest};

pub const SOURCE_BUCKET: &str = "source_bucket";
pub const SOURCE_KEY: &str = "source_key";
pub const DEST_BUCKET: &str = "dest_bucket";
pub const DEST_KEY: &str = "dest_key";

/// Inbound job event before validation. A field is `None` when the key is
/// absent or holds something other than a string.
#[derive(Debug, Default, Validate)]
pub struct JobEvent {
    #[validate(required, length(min = 1))]
    pub source_bucket: Option<String>,
    #[validate(required, length(min = 1))]
    pub source_key: Option<String>,
    #[validate(required, length(min = 1))]
    pub dest_bucket: Option<String>,
    #[validate(required, length(min = 1))]
    pub dest_key: Option<String>,
}

impl JobEvent {
    pub fn from_value(raw: &Value) -> Self {
        let field = |name: &str| {
            raw.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            source_bucket: field(SOURCE_BUCKET),
            source_key: field(SOURCE_KEY),
            dest_bucket: field(DEST_BUCKET),
            dest_key: field(DEST_KEY),
        }
    }
}

/// Turns an arbitrary event into a [`JobRequest`]. Extra keys are ignored.
/// On failure the error lists every offending key, sorted.
pub fn validate(raw: &Value) -> Result<JobRequest, JobError> {
    let event = JobEvent::from_value(raw);

    if let Err(errors) = event.validate() {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        return Err(JobError::InvalidRequest { fields });
    }

    match (
        event.source_bucket,
        event.source_key,
        event.dest_bucket,
        event.dest_key,
    ) {
        (Some(sb), Some(sk), Some(db), Some(dk)) => Ok(JobRequest::new(sb, sk, db, dk)),
        _ => Err(JobError::InvalidRequest {
            fields: vec![
                SOURCE_BUCKET.to_string(),
                SOURCE_KEY.to_string(),
                DEST_BUCKET.to_string(),
                DEST_KEY.to_string(),
            ],
        }),
    }
}

/// Invocation result as returned to the invoker.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "RESULT")]
pub enum JobResponse {
    Success {
        bucket: String,
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        etag: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        version_id: Option<String>,
    },
    Failure {
        error_code: ErrorKind,
        message: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        missing_fields: Vec<String>,
    },
}

impl JobResponse {
    /// Failure raised outside the pipeline, e.g. while bootstrapping the worker.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        JobResponse::Failure {
            error_code: kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            missing_fields: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Success { .. })
    }
}

impl From<JobReceipt> for JobResponse {
    fn from(r: JobReceipt) -> Self {
        JobResponse::Success {
            bucket: r.bucket,
            key: r.key,
            etag: r.e_tag,
            version_id: r.version_id,
        }
    }
}

impl From<&JobError> for JobResponse {
    fn from(e: &JobError) -> Self {
        let kind = e.kind();
        let missing_fields = match e {
            JobError::InvalidRequest { fields } => fields.clone(),
            _ => Vec::new(),
        };

        JobResponse::Failure {
            error_code: kind,
            message: e.to_string(),
            retryable: kind.is_retryable(),
            missing_fields,
        }
    }
}

impl From<Result<JobReceipt, JobError>> for JobResponse {
    fn from(result: Result<JobReceipt, JobError>) -> Self {
        match result {
            Ok(receipt) => receipt.into(),
            Err(e) => (&e).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn full_event() -> Value {
        json!({
            "source_bucket": "dogstoragedev-eu-west-2",
            "source_key": "dev/file.docx",
            "dest_bucket": "doggwdev-eu-west-2-inst-foobar",
            "dest_key": "path/to/my/file.pdf"
        })
    }

    #[test]
    fn complete_event_is_accepted() {
        let request = validate(&full_event()).unwrap();
        assert_eq!(request.source_bucket(), "dogstoragedev-eu-west-2");
        assert_eq!(request.source_key(), "dev/file.docx");
        assert_eq!(request.dest_bucket(), "doggwdev-eu-west-2-inst-foobar");
        assert_eq!(request.dest_key(), "path/to/my/file.pdf");
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut event = full_event();
        event["callback_url"] = json!("https://example.com");
        event["attempt"] = json!(3);
        assert!(validate(&event).is_ok());
    }

    #[test]
    fn missing_keys_are_named() {
        let event = json!({ "source_bucket": "b", "dest_key": "out.pdf" });
        assert_matches!(
            validate(&event),
            Err(JobError::InvalidRequest { fields }) if fields == vec!["dest_bucket", "source_key"]
        );
    }

    #[test]
    fn empty_and_non_string_values_are_invalid() {
        let mut event = full_event();
        event["source_key"] = json!("");
        event["dest_bucket"] = json!(42);
        assert_matches!(
            validate(&event),
            Err(JobError::InvalidRequest { fields }) if fields == vec!["dest_bucket", "source_key"]
        );
    }

    #[test]
    fn non_object_event_names_every_key() {
        assert_matches!(
            validate(&json!("not an object")),
            Err(JobError::InvalidRequest { fields }) if fields.len() == 4
        );
    }

    #[test]
    fn success_response_keeps_legacy_shape() {
        let response = JobResponse::from(JobReceipt {
            bucket: "out".to_string(),
            key: "path/to/my/file.pdf".to_string(),
            e_tag: Some("\"abc\"".to_string()),
            version_id: None,
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "RESULT": "Success",
                "bucket": "out",
                "key": "path/to/my/file.pdf",
                "etag": "\"abc\""
            })
        );
    }

    #[test]
    fn failure_response_carries_code_and_fields() {
        let err = JobError::InvalidRequest {
            fields: vec!["dest_key".to_string()],
        };
        let value = serde_json::to_value(JobResponse::from(&err)).unwrap();
        assert_eq!(value["RESULT"], "Failure");
        assert_eq!(value["error_code"], "INVALID_REQUEST");
        assert_eq!(value["retryable"], false);
        assert_eq!(value["missing_fields"], json!(["dest_key"]));
    }

    #[test]
    fn bootstrap_failure_is_a_regular_failure_envelope() {
        let response = JobResponse::failure(
            ErrorKind::ConfigurationError,
            "AWS_ACCESS_KEY_ID is not set",
        );
        assert!(!response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "RESULT": "Failure",
                "error_code": "CONFIGURATION_ERROR",
                "message": "AWS_ACCESS_KEY_ID is not set",
                "retryable": false
            })
        );
    }
}
