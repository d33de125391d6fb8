use chrono::{DateTime, Utc};
use errors::WorkspaceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Labels of the fixed metadata fields, in storage order.
pub const FIELD_LABELS: [&str; 12] = [
    "file",
    "description",
    "tags",
    "path",
    "created_at",
    "updated_at",
    "status",
    "dependencies",
    "context_length",
    "max_context",
    "content_hash",
    "content"
];

pub const FIELD_COUNT: usize = FIELD_LABELS.len();

pub(crate) mod field {
    pub const FILE: usize = 0;
    pub const DESCRIPTION: usize = 1;
    pub const TAGS: usize = 2;
    pub const PATH: usize = 3;
    pub const CREATED_AT: usize = 4;
    pub const UPDATED_AT: usize = 5;
    pub const STATUS: usize = 6;
    pub const DEPENDENCIES: usize = 7;
    pub const CONTEXT_LENGTH: usize = 8;
    pub const MAX_CONTEXT: usize = 9;
    pub const CONTENT_HASH: usize = 10;
    pub const CONTENT: usize = 11;
}

pub const AGENTS_FILE: &str = "AGENTS.md";
pub const PLAN_FILE: &str = "PLAN.md";

/// Files that always exist and cannot be deleted.
pub const RESERVED_FILES: [&str; 2] = [AGENTS_FILE, PLAN_FILE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Active,
    Draft,
    Archived,
    Deprecated
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Active => "active",
            FileStatus::Draft => "draft",
            FileStatus::Archived => "archived",
            FileStatus::Deprecated => "deprecated"
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(FileStatus::Active),
            "draft" => Ok(FileStatus::Draft),
            "archived" => Ok(FileStatus::Archived),
            "deprecated" => Ok(FileStatus::Deprecated),
            other => Err(WorkspaceError::validation(
                "status",
                format!("unknown file status '{other}'")
            ))
        }
    }
}

/// A named markdown document with metadata.
///
/// `context_length` and `content_hash` are derived from `content`; values
/// set by callers are ignored on write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VirtualFile {
    pub file: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Defaults to `/<file>`.
    pub path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Defaults to [`FileStatus::Active`].
    pub status: Option<FileStatus>,
    pub dependencies: Vec<String>,
    pub context_length: usize,
    pub max_context: Option<usize>,
    pub content_hash: String,
    pub content: String
}

impl VirtualFile {
    pub fn new(file: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            file: file.into(),
            context_length: context_length(&content),
            content_hash: content_hash(&content),
            content,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = Some(max_context);
        self
    }

    pub fn default_path(&self) -> String {
        format!("/{}", self.file)
    }

    /// True when `max_context` is set and the content is longer.
    pub fn exceeds_max_context(&self) -> bool {
        self.max_context
            .is_some_and(|max| context_length(&self.content) > max)
    }
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_FILES.contains(&name)
}

/// Character count, as `LEN` computes it for text without astral characters.
pub fn context_length(content: &str) -> usize {
    content.chars().count()
}

const HASH_MODULUS: u64 = 1 << 39;

/// Position-weighted code point sum modulo 2^39, as 10 upper-case hex
/// digits. Empty content hashes to the empty string. The stored formula
/// computes the same value.
pub fn content_hash(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let sum = content
        .chars()
        .enumerate()
        .fold(0u64, |acc, (i, ch)| {
            let term = (u64::from(ch) * (i as u64 + 1)) % HASH_MODULUS;
            (acc + term) % HASH_MODULUS
        });
    format!("{sum:010X}")
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rejects names the store cannot hold.
pub(crate) fn validate_name(name: &str) -> Result<(), WorkspaceError> {
    if name.trim().is_empty() {
        return Err(WorkspaceError::validation("file", "must not be empty"));
    }
    if name != name.trim() {
        return Err(WorkspaceError::validation(
            "file",
            "must not start or end with whitespace"
        ));
    }
    if name.contains('\n') || name.contains('\r') {
        return Err(WorkspaceError::validation("file", "must be a single line"));
    }
    if FIELD_LABELS.iter().any(|label| label.eq_ignore_ascii_case(name)) {
        return Err(WorkspaceError::validation(
            "file",
            format!("'{name}' is a metadata label")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_values() {
        // 'a' = 97 at position 1, 'b' = 98 at position 2: 97 + 196 = 293.
        assert_eq!(content_hash("ab"), "0000000125");
        assert_eq!(content_hash(""), "");
        assert_ne!(content_hash("ab"), content_hash("ba"));
    }

    #[test]
    fn test_context_length_counts_chars() {
        assert_eq!(context_length("héllo"), 5);
        assert_eq!(VirtualFile::new("a.md", "abc").context_length, 3);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("notes.md").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a\nb").is_err());
        assert!(validate_name("content").is_err());
        assert!(validate_name(" padded.md").is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Draft".parse::<FileStatus>().unwrap(), FileStatus::Draft);
        assert!("gone".parse::<FileStatus>().is_err());
        assert_eq!(FileStatus::default(), FileStatus::Active);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_exceeds_max_context() {
        let file = VirtualFile::new("a.md", "abcdef").with_max_context(4);
        assert!(file.exceeds_max_context());
        assert!(!VirtualFile::new("a.md", "abc").exceeds_max_context());
    }
}
