//! Remote id and job name derivation.

/// Every manifest file name starts with this; it is how manifests are told
/// apart from the input files sitting next to them in the outbox.
pub const MANIFEST_PREFIX: &str = "tapis_pipeline_manifest";

/// Upper bound the execution platform places on job names.
pub const MAX_JOB_NAME_LEN: usize = 64;

/// Remote ids longer than this are used alone when the joined name is too long.
const SHORT_REMOTE_ID_LEN: usize = 15;

/// Whether an outbox entry name denotes a manifest.
pub fn is_manifest_name(name: &str) -> bool {
    name.starts_with(MANIFEST_PREFIX)
}

/// Derive the remote id from a manifest file name.
///
/// Strips the manifest prefix and a single `_` separator after it. Returns
/// `None` for names that are not manifests or leave nothing behind.
pub fn remote_id_from_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix(MANIFEST_PREFIX)?;
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Deterministic, length-bounded job name for a manifest.
///
/// `{pipeline_name}.{remote_id}` when it fits in 64 characters. Otherwise a
/// remote id longer than 15 characters is used alone (capped at 64), and a
/// shorter one keeps its full text while the pipeline name is cut to
/// `63 - len(remote_id)` characters.
pub fn job_name(pipeline_name: &str, remote_id: &str) -> String {
    let joined = format!("{}.{}", pipeline_name, remote_id);
    if joined.chars().count() <= MAX_JOB_NAME_LEN {
        return joined;
    }

    let id_len = remote_id.chars().count();
    if id_len > SHORT_REMOTE_ID_LEN {
        return remote_id.chars().take(MAX_JOB_NAME_LEN).collect();
    }

    let keep = MAX_JOB_NAME_LEN - 1 - id_len;
    let prefix: String = pipeline_name.chars().take(keep).collect();
    format!("{}.{}", prefix, remote_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_manifest_name() {
        assert!(is_manifest_name("tapis_pipeline_manifest_job42"));
        assert!(is_manifest_name("tapis_pipeline_manifestX"));
        assert!(!is_manifest_name("input_1.txt"));
        assert!(!is_manifest_name("my_tapis_pipeline_manifest"));
    }

    #[test]
    fn test_remote_id_strips_prefix_and_separator() {
        assert_eq!(
            remote_id_from_name("tapis_pipeline_manifest_job42").as_deref(),
            Some("job42")
        );
        assert_eq!(
            remote_id_from_name("tapis_pipeline_manifestjob7.json").as_deref(),
            Some("job7.json")
        );
        // Only one separator is stripped
        assert_eq!(
            remote_id_from_name("tapis_pipeline_manifest__x").as_deref(),
            Some("_x")
        );
    }

    #[test]
    fn test_remote_id_rejects_bare_prefix() {
        assert_eq!(remote_id_from_name("tapis_pipeline_manifest"), None);
        assert_eq!(remote_id_from_name("tapis_pipeline_manifest_"), None);
        assert_eq!(remote_id_from_name("other_file"), None);
    }

    #[test]
    fn test_job_name_short_enough_is_joined() {
        let name = job_name("word_stats_pipeline_example_that_is_long", "abc123");
        assert_eq!(name, "word_stats_pipeline_example_that_is_long.abc123");
        assert_eq!(name.len(), 47);
    }

    #[test]
    fn test_job_name_exactly_64_is_joined() {
        let pipeline = "p".repeat(57);
        let name = job_name(&pipeline, "abc123");
        assert_eq!(name.len(), 64);
        assert_eq!(name, format!("{}.abc123", pipeline));
    }

    #[test]
    fn test_job_name_short_remote_id_truncates_pipeline() {
        let pipeline = "word_stats_pipeline_example_that_is_long".repeat(2);
        let name = job_name(&pipeline, "abc123");

        assert_eq!(name.len(), 64);
        assert!(name.ends_with(".abc123"));
        assert_eq!(&name[..57], &pipeline[..57]);
    }

    #[test]
    fn test_job_name_fifteen_char_id_still_truncates_pipeline() {
        let pipeline = "x".repeat(60);
        let remote_id = "r".repeat(15);
        let name = job_name(&pipeline, &remote_id);
        assert_eq!(name, format!("{}.{}", "x".repeat(48), remote_id));
        assert_eq!(name.len(), 64);
    }

    #[test]
    fn test_job_name_long_remote_id_used_alone() {
        let pipeline = "word_stats_pipeline_example_that_is_long";
        let remote_id = "0123456789abcdef-request-0042"; // 29 chars
        let name = job_name(pipeline, remote_id);
        assert_eq!(name, remote_id);
    }

    #[test]
    fn test_job_name_oversized_remote_id_capped() {
        let remote_id = "z".repeat(80);
        let name = job_name("pipe", &remote_id);
        assert_eq!(name.chars().count(), MAX_JOB_NAME_LEN);
    }

    #[test]
    fn test_job_name_counts_characters() {
        let pipeline = "é".repeat(70);
        let name = job_name(&pipeline, "id1");
        assert_eq!(name.chars().count(), 64);
        assert!(name.ends_with(".id1"));
    }

    #[test]
    fn test_job_name_is_deterministic() {
        let a = job_name("pipeline", "abc");
        let b = job_name("pipeline", "abc");
        assert_eq!(a, b);
    }
}
