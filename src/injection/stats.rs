use serde::{Deserialize, Serialize};

/// Why a file produced no output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "structure-error-nested-tspans-not-supported")]
    NestedTspans,
    #[serde(rename = "write-failed")]
    WriteFailed,
    #[serde(rename = "parse-failed")]
    ParseFailed,
    #[serde(rename = "file-not-found")]
    FileNotFound,
    /// Batch input whose file name was already used earlier in the same run.
    #[serde(rename = "duplicate-file-name")]
    DuplicateName,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NestedTspans => "structure-error-nested-tspans-not-supported",
            ErrorKind::WriteFailed => "write-failed",
            ErrorKind::ParseFailed => "parse-failed",
            ErrorKind::FileNotFound => "file-not-found",
            ErrorKind::DuplicateName => "duplicate-file-name",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Written to `file_path`.
    Saved,
    /// Injected in memory but not persisted.
    #[default]
    Skipped,
    Error,
}

/// Per-file outcome of an injection attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectStats {
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub file_path: String,
    pub all_languages: usize,
    pub new_languages: usize,
    pub processed_switches: usize,
    pub inserted_translations: usize,
    pub updated_translations: usize,
    pub skipped_translations: usize,
}

impl InjectStats {
    pub fn fail(&mut self, kind: ErrorKind) {
        self.status = OutcomeStatus::Error;
        self.error = Some(kind);
        self.file_path.clear();
    }

    pub fn saved(&mut self, path: String) {
        self.status = OutcomeStatus::Saved;
        self.error = None;
        self.file_path = path;
    }
}
