//! Domain models for file processing.
//!
//! # Design
//! - Outcomes are small copyable values.
//! - Only the constructors below can build one, so a file is never both
//!   uploaded and duplicated and is never deleted without an upload.

/// Result of processing one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    uploaded: bool,
    deleted: bool,
    duplicated: bool,
}

impl ProcessOutcome {
    /// The file vanished before it could be handled.
    #[must_use]
    pub const fn no_action() -> Self {
        Self {
            uploaded: false,
            deleted: false,
            duplicated: false,
        }
    }

    /// The file was uploaded, and removed locally when `deleted` is set.
    #[must_use]
    pub const fn uploaded(deleted: bool) -> Self {
        Self {
            uploaded: true,
            deleted,
            duplicated: false,
        }
    }

    /// The key already existed remotely; the file was moved aside.
    #[must_use]
    pub const fn duplicated() -> Self {
        Self {
            uploaded: false,
            deleted: false,
            duplicated: true,
        }
    }

    /// Whether the file was uploaded.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Whether the local file was deleted after upload.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether the file was diverted to the duplicate folder.
    #[must_use]
    pub const fn is_duplicated(&self) -> bool {
        self.duplicated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_keep_flags_consistent() {
        let none = ProcessOutcome::no_action();
        assert!(!none.is_uploaded() && !none.is_deleted() && !none.is_duplicated());

        let kept = ProcessOutcome::uploaded(false);
        assert!(kept.is_uploaded() && !kept.is_deleted() && !kept.is_duplicated());

        let removed = ProcessOutcome::uploaded(true);
        assert!(removed.is_uploaded() && removed.is_deleted());

        let duplicate = ProcessOutcome::duplicated();
        assert!(duplicate.is_duplicated() && !duplicate.is_uploaded() && !duplicate.is_deleted());
    }
}
