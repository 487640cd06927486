//! Structural validation of raw manifest payloads.

use serde_json::Value;

use super::{InputDescriptor, ManifestError, RawManifest};

/// Parse and validate raw manifest bytes.
///
/// Newlines are stripped before parsing. The payload must be an object with a
/// `files` array whose entries each carry a non-empty string `file_path`;
/// every other key on a file entry is kept as metadata.
pub fn parse_manifest_bytes(bytes: &[u8]) -> Result<RawManifest, ManifestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ManifestError::InvalidEncoding(e.to_string()))?;
    let text: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let value: Value =
        serde_json::from_str(&text).map_err(|e| ManifestError::InvalidJson(e.to_string()))?;

    validate_manifest_value(&value)?;

    serde_json::from_value(value).map_err(|e| ManifestError::Schema(e.to_string()))
}

/// Check a parsed payload against the manifest contract.
pub fn validate_manifest_value(value: &Value) -> Result<(), ManifestError> {
    let obj = value
        .as_object()
        .ok_or_else(|| schema("manifest must be a JSON object"))?;

    let files = obj
        .get("files")
        .ok_or_else(|| schema("missing required property `files`"))?
        .as_array()
        .ok_or_else(|| schema("`files` must be an array"))?;

    for (i, file) in files.iter().enumerate() {
        let entry = file
            .as_object()
            .ok_or_else(|| schema(&format!("files[{}] must be an object", i)))?;

        match entry.get("file_path") {
            None => {
                return Err(schema(&format!(
                    "files[{}] is missing required property `file_path`",
                    i
                )))
            }
            Some(Value::String(path)) if !path.trim().is_empty() => {}
            Some(_) => {
                return Err(schema(&format!(
                    "files[{}].file_path must be a non-empty string",
                    i
                )))
            }
        }
    }

    Ok(())
}

fn schema(msg: &str) -> ManifestError {
    ManifestError::Schema(msg.to_string())
}

impl RawManifest {
    /// Input file paths in manifest order.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f: &InputDescriptor| f.file_path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_manifest() {
        let bytes = br#"{"files": [{"file_path": "/outbox/a.txt", "size": 12}, {"file_path": "/outbox/b.txt"}]}"#;
        let manifest = parse_manifest_bytes(bytes).unwrap();

        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].file_path, "/outbox/a.txt");
        assert_eq!(manifest.files[0].metadata.get("size"), Some(&Value::from(12)));
        assert!(manifest.files[1].metadata.is_empty());
        assert_eq!(
            manifest.file_paths().collect::<Vec<_>>(),
            vec!["/outbox/a.txt", "/outbox/b.txt"]
        );
    }

    #[test]
    fn test_parse_strips_newlines() {
        let bytes = b"{\n  \"files\": [\r\n    {\"file_path\": \"/outbox/a.txt\"}\n  ]\n}\n";
        let manifest = parse_manifest_bytes(bytes).unwrap();
        assert_eq!(manifest.files.len(), 1);
    }

    #[test]
    fn test_parse_empty_files_is_valid() {
        let manifest = parse_manifest_bytes(br#"{"files": []}"#).unwrap();
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_manifest_bytes(b"{files: ").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        let err = parse_manifest_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEncoding(_)));
    }

    #[test]
    fn test_missing_files_property() {
        let err = parse_manifest_bytes(br#"{"inputs": []}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Schema(_)));
        assert!(err.to_string().contains("`files`"));
    }

    #[test]
    fn test_files_must_be_array() {
        let err = parse_manifest_bytes(br#"{"files": "a.txt"}"#).unwrap_err();
        assert!(err.to_string().contains("must be an array"));
    }

    #[test]
    fn test_file_entry_requires_path() {
        let err =
            parse_manifest_bytes(br#"{"files": [{"file_path": "a"}, {"name": "b"}]}"#).unwrap_err();
        assert!(err.to_string().contains("files[1]"));
    }

    #[test]
    fn test_file_path_must_be_non_empty_string() {
        let err = parse_manifest_bytes(br#"{"files": [{"file_path": 3}]}"#).unwrap_err();
        assert!(err.to_string().contains("non-empty string"));

        let err = parse_manifest_bytes(br#"{"files": [{"file_path": "  "}]}"#).unwrap_err();
        assert!(err.to_string().contains("non-empty string"));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = parse_manifest_bytes(br#"[{"file_path": "a"}]"#).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }
}
