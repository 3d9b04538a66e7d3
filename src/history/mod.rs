//! Linear undo/redo history of image versions.

use crate::artifact::ImageArtifact;

/// Ordered image versions plus a cursor. `cursor == None` means no image is loaded.
///
/// `entries[0]` is the original for the session. Committing while the cursor is
/// not at the end discards every entry after the cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<ImageArtifact>,
    cursor: Option<usize>,
}

impl History {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
        }
    }

    pub fn commit(&mut self, artifact: ImageArtifact) {
        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        let discarded = self.entries.len().saturating_sub(keep);
        self.entries.truncate(keep);
        self.entries.push(artifact);
        self.cursor = Some(self.entries.len() - 1);
        tracing::debug!(
            len = self.entries.len(),
            discarded,
            "history commit"
        );
    }

    pub fn undo(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                true
            }
            _ => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                true
            }
            _ => false,
        }
    }

    pub fn reset_to_original(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.cursor = Some(0);
        true
    }

    /// Starts a new history whose original is `artifact`.
    pub fn replace_all(&mut self, artifact: ImageArtifact) {
        self.entries.clear();
        self.entries.push(artifact);
        self.cursor = Some(0);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|cursor| cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor
            .is_some_and(|cursor| cursor + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&ImageArtifact> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn original(&self) -> Option<&ImageArtifact> {
        self.entries.first()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ImageArtifact] {
        &self.entries
    }
}
