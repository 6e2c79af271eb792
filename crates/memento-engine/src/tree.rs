//! The transcripts tree: `<tool>/<session id>.<ext>` blobs under one ref.
//!
//! Updates are copy-on-write. The current root is read as an immutable
//! snapshot, each affected tool's subtree is rebuilt, and every other
//! top-level entry is carried over by value with its object id untouched.
//! The ref moves with a single compare-and-set once all new trees are
//! written, so readers never see a partial update.

use std::collections::BTreeMap;

use memento_store::{ObjectKind, ObjectStore, StoreError, Tree, TreeEntry};
use memento_types::{ObjectId, SessionKey};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// One change to the transcripts tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobUpdate {
    pub key: SessionKey,
    pub ext: String,
    /// The new blob, or `None` to delete the session's entry.
    pub blob: Option<ObjectId>,
}

impl BlobUpdate {
    pub fn new(key: SessionKey, ext: impl Into<String>, blob: Option<ObjectId>) -> Self {
        Self {
            key,
            ext: ext.into(),
            blob,
        }
    }

    /// `<id>.<ext>`
    pub fn name(&self) -> String {
        format!("{}.{}", self.key.id, self.ext)
    }

    fn validate(&self) -> EngineResult<()> {
        self.key
            .validate()
            .map_err(|e| EngineError::InvalidTarget(e.to_string()))?;
        if self.ext.is_empty() || self.ext.contains(|c| c == '/' || c == '.') {
            return Err(EngineError::InvalidTarget(format!("bad extension '{}'", self.ext)));
        }
        Ok(())
    }
}

/// The extension of `name` if it is the blob name of session `id`.
///
/// Extensions never contain a dot, so `abc.aaa.jsonl` belongs to session
/// `abc.aaa` and never to `abc`.
pub fn session_ext<'n>(name: &'n str, id: &str) -> Option<&'n str> {
    let ext = name.strip_prefix(id)?.strip_prefix('.')?;
    (!ext.is_empty() && !ext.contains('.')).then_some(ext)
}

pub struct TranscriptTree<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    reference: &'a str,
}

impl<'a, S: ObjectStore + ?Sized> TranscriptTree<'a, S> {
    pub fn new(store: &'a S, reference: &'a str) -> Self {
        Self { store, reference }
    }

    /// The current root id and tree. A missing ref is an empty tree.
    pub fn snapshot(&self) -> EngineResult<(Option<ObjectId>, Tree)> {
        match self.store.read_ref(self.reference)? {
            Some(root) => Ok((Some(root), self.store.read_tree(&root)?)),
            None => Ok((None, Tree::empty())),
        }
    }

    /// The subtree for `tool`, or an empty tree if there is none yet.
    fn tool_tree(&self, root: &Tree, tool: &str) -> EngineResult<Tree> {
        match root.get(tool) {
            None => Ok(Tree::empty()),
            Some(entry) if entry.kind() == ObjectKind::Tree => {
                Ok(self.store.read_tree(&entry.object_id)?)
            }
            Some(entry) => Err(StoreError::WrongKind {
                id: entry.object_id,
                expected: ObjectKind::Tree.to_string(),
                actual: entry.kind().to_string(),
            }
            .into()),
        }
    }

    /// The stored entry for a session, whatever its extension.
    pub fn find_session(&self, key: &SessionKey) -> EngineResult<Option<TreeEntry>> {
        let (_, root) = self.snapshot()?;
        if root.get(&key.tool).is_none() {
            return Ok(None);
        }
        Ok(self
            .tool_tree(&root, &key.tool)?
            .entries
            .into_iter()
            .find(|e| e.kind() == ObjectKind::Blob && session_ext(&e.name, &key.id).is_some()))
    }

    /// Set (`Some`) or delete (`None`) the blob for one session and move the
    /// ref. Returns the new root id.
    pub fn upsert_blob(
        &self,
        tool: &str,
        session_id: &str,
        ext: &str,
        blob: Option<ObjectId>,
    ) -> EngineResult<ObjectId> {
        self.apply(&[BlobUpdate::new(SessionKey::new(tool, session_id), ext, blob)])
    }

    /// Apply `updates` in order and move the ref once. Returns the new root
    /// id.
    ///
    /// Each touched tool's subtree is rebuilt and written, even when it ends
    /// up empty. Every other top-level entry is carried over unchanged.
    pub fn apply(&self, updates: &[BlobUpdate]) -> EngineResult<ObjectId> {
        for update in updates {
            update.validate()?;
        }
        let (old_root, root) = self.snapshot()?;
        if updates.is_empty() {
            if let Some(old) = old_root {
                return Ok(old);
            }
        }

        let mut by_tool: BTreeMap<&str, Vec<&BlobUpdate>> = BTreeMap::new();
        for update in updates {
            by_tool.entry(update.key.tool.as_str()).or_default().push(update);
        }

        let mut root_entries: Vec<TreeEntry> = root
            .entries
            .iter()
            .filter(|e| !by_tool.contains_key(e.name.as_str()))
            .cloned()
            .collect();
        for (tool, changes) in &by_tool {
            let mut entries = self.tool_tree(&root, tool)?.entries;
            for change in changes {
                let name = change.name();
                entries.retain(|e| e.name != name);
                if let Some(blob) = change.blob {
                    entries.push(TreeEntry::blob(name, blob));
                }
            }
            let subtree = self.store.write_tree(&Tree::new(entries))?;
            root_entries.push(TreeEntry::tree(*tool, subtree));
        }
        let new_root = self.store.write_tree(&Tree::new(root_entries))?;

        if old_root == Some(new_root) {
            debug!(reference = self.reference, updates = updates.len(), "transcripts tree unchanged");
            return Ok(new_root);
        }
        self.store
            .update_ref(self.reference, &new_root, old_root.as_ref())?;
        debug!(
            reference = self.reference,
            updates = updates.len(),
            tools = by_tool.len(),
            root = %new_root.short_hex(),
            "transcripts tree updated"
        );
        Ok(new_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_store::InMemoryStore;
    use proptest::prelude::*;

    const REF: &str = "refs/memento/transcripts";

    fn subtree_id(store: &InMemoryStore, tool: &str) -> Option<ObjectId> {
        let root = store.read_ref(REF).unwrap()?;
        store.read_tree(&root).unwrap().get(tool).map(|e| e.object_id)
    }

    #[test]
    fn missing_ref_starts_empty() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let blob = store.write_blob(b"{}\n").unwrap();
        tree.upsert_blob("claude", "s1", "jsonl", Some(blob)).unwrap();
        assert_eq!(
            store.read_path(REF, "claude/s1.jsonl").unwrap(),
            Some(b"{}\n".to_vec())
        );
    }

    #[test]
    fn replace_and_delete_one_session() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let v1 = store.write_blob(b"v1").unwrap();
        let v2 = store.write_blob(b"v2").unwrap();
        let other = store.write_blob(b"other").unwrap();
        tree.upsert_blob("claude", "s1", "jsonl", Some(v1)).unwrap();
        tree.upsert_blob("claude", "s2", "jsonl", Some(other)).unwrap();
        tree.upsert_blob("claude", "s1", "jsonl", Some(v2)).unwrap();
        assert_eq!(store.read_path(REF, "claude/s1.jsonl").unwrap(), Some(b"v2".to_vec()));

        tree.upsert_blob("claude", "s1", "jsonl", None).unwrap();
        assert_eq!(store.read_path(REF, "claude/s1.jsonl").unwrap(), None);
        assert_eq!(store.read_path(REF, "claude/s2.jsonl").unwrap(), Some(b"other".to_vec()));
        assert!(tree.find_session(&SessionKey::new("claude", "s2")).unwrap().is_some());
    }

    #[test]
    fn empty_tool_subtree_is_kept() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let b = store.write_blob(b"x").unwrap();
        tree.upsert_blob("codex", "r1", "jsonl", Some(b)).unwrap();
        tree.upsert_blob("codex", "r1", "jsonl", None).unwrap();
        let subtree = subtree_id(&store, "codex").unwrap();
        assert!(store.read_tree(&subtree).unwrap().is_empty());
        assert_eq!(tree.find_session(&SessionKey::new("codex", "r1")).unwrap(), None);
    }

    #[test]
    fn dotted_session_ids_are_told_apart() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let plain = store.write_blob(b"plain").unwrap();
        let dotted = store.write_blob(b"dotted").unwrap();
        tree.upsert_blob("claude", "abc.aaa", "jsonl", Some(dotted)).unwrap();
        tree.upsert_blob("claude", "abc", "jsonl", Some(plain)).unwrap();

        let found = tree.find_session(&SessionKey::new("claude", "abc")).unwrap().unwrap();
        assert_eq!((found.name.as_str(), found.object_id), ("abc.jsonl", plain));
        let found = tree.find_session(&SessionKey::new("claude", "abc.aaa")).unwrap().unwrap();
        assert_eq!((found.name.as_str(), found.object_id), ("abc.aaa.jsonl", dotted));
        assert_eq!(tree.find_session(&SessionKey::new("claude", "ab")).unwrap(), None);

        assert_eq!(session_ext("abc.jsonl", "abc"), Some("jsonl"));
        assert_eq!(session_ext("abc.aaa.jsonl", "abc"), None);
        assert_eq!(session_ext("abcd.jsonl", "abc"), None);
        assert_eq!(session_ext("abc.", "abc"), None);
    }

    #[test]
    fn batch_moves_the_ref_once() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let a = store.write_blob(b"a").unwrap();
        let b = store.write_blob(b"b").unwrap();
        let before = store.ref_update_count();
        tree.apply(&[
            BlobUpdate::new(SessionKey::new("claude", "s1"), "jsonl", Some(a)),
            BlobUpdate::new(SessionKey::new("codex", "r1"), "jsonl", Some(b)),
            BlobUpdate::new(SessionKey::new("claude", "s2"), "jsonl", Some(b)),
        ])
        .unwrap();
        assert_eq!(store.ref_update_count(), before + 1);
        assert_eq!(store.read_path(REF, "claude/s1.jsonl").unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.read_path(REF, "claude/s2.jsonl").unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.read_path(REF, "codex/r1.jsonl").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn invalid_update_in_batch_writes_nothing() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let a = store.write_blob(b"a").unwrap();
        let result = tree.apply(&[
            BlobUpdate::new(SessionKey::new("claude", "s1"), "jsonl", Some(a)),
            BlobUpdate::new(SessionKey::new("claude", "s2"), "tar.gz", Some(a)),
        ]);
        assert!(matches!(result, Err(EngineError::InvalidTarget(_))));
        assert_eq!(store.read_ref(REF).unwrap(), None);
        assert_eq!(store.ref_update_count(), 0);
    }

    #[test]
    fn non_tool_entries_pass_through() {
        let store = InMemoryStore::new();
        let readme = store.write_blob(b"readme").unwrap();
        let root = store
            .write_tree(&Tree::new(vec![TreeEntry::blob("README", readme)]))
            .unwrap();
        store.update_ref(REF, &root, None).unwrap();

        let tree = TranscriptTree::new(&store, REF);
        let b = store.write_blob(b"x").unwrap();
        tree.upsert_blob("claude", "s1", "jsonl", Some(b)).unwrap();
        assert_eq!(store.read_path(REF, "README").unwrap(), Some(b"readme".to_vec()));

        let err = tree.upsert_blob("README", "s1", "jsonl", Some(b)).unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::WrongKind { .. })));
    }

    #[test]
    fn read_failure_leaves_ref_untouched() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let b = store.write_blob(b"x").unwrap();
        tree.upsert_blob("claude", "s1", "jsonl", Some(b)).unwrap();
        let before = store.read_ref(REF).unwrap();

        store.set_read_only(true);
        assert!(tree.upsert_blob("claude", "s2", "jsonl", Some(b)).is_err());
        assert_eq!(store.read_ref(REF).unwrap(), before);
    }

    #[test]
    fn rejects_unsafe_names() {
        let store = InMemoryStore::new();
        let tree = TranscriptTree::new(&store, REF);
        let b = store.write_blob(b"x").unwrap();
        assert!(matches!(
            tree.upsert_blob("claude", "../s", "jsonl", Some(b)),
            Err(EngineError::InvalidTarget(_))
        ));
        assert!(tree.upsert_blob("claude", "s", "", Some(b)).is_err());
    }

    proptest! {
        #[test]
        fn other_tools_keep_their_subtree_id(
            ops in prop::collection::vec((0usize..3, "[a-z]{1,4}", any::<bool>()), 1..20),
        ) {
            let tools = ["claude", "codex", "cursor"];
            let store = InMemoryStore::new();
            let tree = TranscriptTree::new(&store, REF);
            for (t, id, delete) in ops {
                let before: Vec<_> = tools.iter().map(|tool| subtree_id(&store, tool)).collect();
                let blob = if delete {
                    None
                } else {
                    Some(store.write_blob(id.as_bytes()).unwrap())
                };
                tree.upsert_blob(tools[t], &id, "jsonl", blob).unwrap();
                for (i, tool) in tools.iter().enumerate() {
                    if i != t {
                        prop_assert_eq!(subtree_id(&store, tool), before[i]);
                    }
                }
            }
        }
    }
}
