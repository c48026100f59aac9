//! Shared append-only log written by the specialists during one orchestration

use serde::{Deserialize, Serialize};
use std::fmt;

use super::specialists::SpecialistRole;

const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Research,
    Analysis,
    Draft,
    RevisionNote,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Research => "research",
            EntryType::Analysis => "analysis",
            EntryType::Draft => "draft",
            EntryType::RevisionNote => "revision_note",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub author: SpecialistRole,
    pub entry_type: EntryType,
    pub content: String,
}

impl WorkspaceEntry {
    fn render(&self) -> String {
        format!(
            "[{} - {}]\n{}",
            self.author.as_str().to_uppercase(),
            self.entry_type,
            self.content
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    entries: Vec<WorkspaceEntry>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, author: SpecialistRole, entry_type: EntryType, content: impl Into<String>) {
        self.entries.push(WorkspaceEntry {
            author,
            entry_type,
            content: content.into(),
        });
    }

    /// Every entry rendered as `[AUTHOR - type]` blocks separated by rules.
    pub fn read_all(&self) -> String {
        render(self.entries.iter())
    }

    /// Rendered entries of one type only.
    pub fn render_by_type(&self, entry_type: EntryType) -> String {
        render(self.entries.iter().filter(|entry| entry.entry_type == entry_type))
    }

    pub fn read_by_type(&self, entry_type: EntryType) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.entry_type == entry_type)
            .map(|entry| entry.content.as_str())
            .collect()
    }

    pub fn count_by_type(&self, entry_type: EntryType) -> usize {
        self.entries.iter().filter(|entry| entry.entry_type == entry_type).count()
    }

    pub fn entries(&self) -> &[WorkspaceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn render<'a>(entries: impl Iterator<Item = &'a WorkspaceEntry>) -> String {
    entries
        .map(WorkspaceEntry::render)
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_all_format() {
        let mut workspace = Workspace::new();
        workspace.write(SpecialistRole::Researcher, EntryType::Research, "Finding A");
        workspace.write(SpecialistRole::Analyst, EntryType::Analysis, "Looks solid");

        assert_eq!(
            workspace.read_all(),
            "[RESEARCHER - research]\nFinding A\n\n---\n\n[ANALYST - analysis]\nLooks solid"
        );
    }

    #[test]
    fn test_read_by_type() {
        let mut workspace = Workspace::new();
        workspace.write(SpecialistRole::Researcher, EntryType::Research, "one");
        workspace.write(SpecialistRole::Writer, EntryType::Draft, "draft");
        workspace.write(SpecialistRole::Researcher, EntryType::Research, "two");

        assert_eq!(workspace.read_by_type(EntryType::Research), vec!["one", "two"]);
        assert_eq!(workspace.count_by_type(EntryType::RevisionNote), 0);
        assert_eq!(
            workspace.render_by_type(EntryType::Research),
            "[RESEARCHER - research]\none\n\n---\n\n[RESEARCHER - research]\ntwo"
        );
        assert_eq!(workspace.len(), 3);
    }

    #[test]
    fn test_empty_workspace() {
        let workspace = Workspace::new();
        assert!(workspace.is_empty());
        assert_eq!(workspace.read_all(), "");
    }

    #[test]
    fn test_entry_type_names() {
        assert_eq!(EntryType::RevisionNote.to_string(), "revision_note");
        assert_eq!(serde_json::to_string(&EntryType::RevisionNote).unwrap(), "\"revision_note\"");
    }
}
