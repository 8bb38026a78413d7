//! Working-tree status: parsing `git status --porcelain=v1 -z` and
//! collapsing the per-category path lists into one ordered change list.

use crate::models::ChangeKind;

/// A rename recorded in the working tree or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Changed paths grouped by category, as reported by version control.
///
/// The same path may appear in more than one category (for example a
/// renamed file that was also edited); [`WorkingTreeStatus::entries`]
/// resolves that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub untracked: Vec<String>,
    pub renamed: Vec<Rename>,
}

/// One deduplicated changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub kind: ChangeKind,
    /// Path at HEAD for renames.
    pub original_path: Option<String>,
}

impl WorkingTreeStatus {
    /// Flatten all categories into a single list with each path once.
    ///
    /// Categories are visited modified → renamed → added → untracked and
    /// the first occurrence of a path wins.
    pub fn entries(&self) -> Vec<StatusEntry> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        let mut push = |path: &str, kind: ChangeKind, original: Option<&str>| {
            if seen.insert(path.to_string()) {
                out.push(StatusEntry {
                    path: path.to_string(),
                    kind,
                    original_path: original.map(str::to_string),
                });
            }
        };

        for path in &self.modified {
            push(path, ChangeKind::Modified, None);
        }
        for rename in &self.renamed {
            push(&rename.to, ChangeKind::Renamed, Some(&rename.from));
        }
        for path in self.added.iter().chain(&self.untracked) {
            push(path, ChangeKind::Added, None);
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
            && self.added.is_empty()
            && self.untracked.is_empty()
            && self.renamed.is_empty()
    }
}

/// Parse NUL-separated `git status --porcelain=v1 -z` output.
///
/// Each record is `XY <path>`; renames and copies are followed by an
/// extra NUL-terminated field holding the original path. Deleted and
/// ignored entries are dropped.
pub fn parse_porcelain(output: &str) -> WorkingTreeStatus {
    let mut status = WorkingTreeStatus::default();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(record) = fields.next() {
        if record.len() < 4 {
            continue;
        }
        let (code, path) = record.split_at(3);
        let mut code = code.chars();
        let x = code.next().unwrap_or(' ');
        let y = code.next().unwrap_or(' ');
        let path = path.to_string();

        match (x, y) {
            ('?', '?') => status.untracked.push(path),
            ('!', '!') => {}
            ('R', _) | ('C', _) => {
                let from = fields.next().unwrap_or_default().to_string();
                if y == 'D' {
                    continue;
                }
                if x == 'R' {
                    status.renamed.push(Rename { from, to: path });
                } else {
                    status.added.push(path);
                }
            }
            (_, 'D') | ('D', _) => {}
            ('A', _) => status.added.push(path),
            _ => status.modified.push(path),
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_mixed_status() {
        let out = " M src/a.ts\0M  src/b.ts\0A  src/new.ts\0?? notes.md\0 D gone.ts\0R  src/new_name.ts\0src/old_name.ts\0";
        let status = parse_porcelain(out);
        assert_eq!(status.modified, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(status.added, vec!["src/new.ts"]);
        assert_eq!(status.untracked, vec!["notes.md"]);
        assert_eq!(
            status.renamed,
            vec![Rename {
                from: "src/old_name.ts".into(),
                to: "src/new_name.ts".into()
            }]
        );
    }

    #[test]
    fn parse_paths_with_spaces() {
        let status = parse_porcelain(" M docs/read me.md\0");
        assert_eq!(status.modified, vec!["docs/read me.md"]);
    }

    #[test]
    fn parse_empty_output() {
        assert!(parse_porcelain("").is_empty());
    }

    #[test]
    fn added_then_deleted_in_worktree_is_dropped() {
        let status = parse_porcelain("AD tmp.txt\0");
        assert!(status.is_empty());
    }

    #[test]
    fn entries_deduplicate_across_categories() {
        let status = WorkingTreeStatus {
            modified: vec!["a.ts".into(), "b.ts".into()],
            added: vec!["c.ts".into(), "a.ts".into()],
            untracked: vec!["c.ts".into(), "d.ts".into()],
            renamed: vec![Rename {
                from: "old.ts".into(),
                to: "b.ts".into(),
            }],
        };
        let entries = status.entries();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts", "b.ts", "c.ts", "d.ts"]);
        assert_eq!(entries[1].kind, ChangeKind::Modified);
        assert_eq!(entries[2].kind, ChangeKind::Added);
    }

    #[test]
    fn entries_keep_rename_origin() {
        let status = WorkingTreeStatus {
            renamed: vec![Rename {
                from: "old.ts".into(),
                to: "new.ts".into(),
            }],
            ..Default::default()
        };
        let entries = status.entries();
        assert_eq!(entries[0].kind, ChangeKind::Renamed);
        assert_eq!(entries[0].original_path.as_deref(), Some("old.ts"));
    }
}
