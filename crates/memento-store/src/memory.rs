use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use memento_types::{ObjectId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::hasher::ContentHasher;
use crate::names::validate_ref_name;
use crate::object::{CommitInfo, ObjectKind, Tree};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Commits cannot be created through the
/// [`ObjectStore`] trait (the engine never creates commits); tests script a
/// history with [`InMemoryStore::add_commit`] instead.
pub struct InMemoryStore {
    objects: RwLock<HashMap<ObjectId, (ObjectKind, Vec<u8>)>>,
    refs: RwLock<HashMap<String, ObjectId>>,
    notes: RwLock<HashMap<(String, ObjectId), Vec<u8>>>,
    commits: RwLock<Vec<CommitInfo>>,
    revs: RwLock<HashMap<String, ObjectId>>,
    remotes: RwLock<HashMap<(String, String), ObjectId>>,
    read_only: AtomicBool,
    ref_updates: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(HashMap::new()),
            notes: RwLock::new(HashMap::new()),
            commits: RwLock::new(Vec::new()),
            revs: RwLock::new(HashMap::new()),
            remotes: RwLock::new(HashMap::new()),
            read_only: AtomicBool::new(false),
            ref_updates: AtomicU64::new(0),
        }
    }

    /// Number of blobs and trees currently stored.
    pub fn object_count(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Number of successful ref updates so far.
    pub fn ref_update_count(&self) -> u64 {
        self.ref_updates.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Script a commit with the given committer time and parents. `HEAD`
    /// moves to the new commit.
    pub fn add_commit(&self, timestamp: Timestamp, parents: &[ObjectId]) -> StoreResult<ObjectId> {
        let id = {
            let mut commits = write(&self.commits)?;
            let seed = format!(
                "{}|{}|{}",
                commits.len(),
                timestamp.timestamp_millis(),
                parents.iter().map(|p| p.to_hex()).collect::<Vec<_>>().join(",")
            );
            let id = ContentHasher::COMMIT.hash(seed.as_bytes());
            commits.push(CommitInfo {
                id,
                timestamp,
                parents: parents.to_vec(),
            });
            id
        };
        write(&self.revs)?.insert("HEAD".into(), id);
        Ok(id)
    }

    /// Give a commit a symbolic name usable by `resolve_commit`.
    pub fn set_rev(&self, name: &str, commit: ObjectId) -> StoreResult<()> {
        write(&self.revs)?.insert(name.to_string(), commit);
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    fn put(&self, kind: ObjectKind, id: ObjectId, data: &[u8]) -> StoreResult<ObjectId> {
        self.check_writable()?;
        let mut objects = write(&self.objects)?;
        // Same id always maps to the same content.
        objects.entry(id).or_insert_with(|| (kind, data.to_vec()));
        Ok(id)
    }

    fn get(&self, id: &ObjectId, expected: ObjectKind) -> StoreResult<Vec<u8>> {
        let objects = read(&self.objects)?;
        let (kind, data) = objects.get(id).ok_or(StoreError::NotFound(*id))?;
        if *kind != expected {
            return Err(StoreError::WrongKind {
                id: *id,
                expected: expected.to_string(),
                actual: kind.to_string(),
            });
        }
        Ok(data.clone())
    }

    fn commit_index(&self, id: &ObjectId) -> StoreResult<Option<usize>> {
        Ok(read(&self.commits)?.iter().position(|c| c.id == *id))
    }

    /// `id` plus every ancestor reachable through parents.
    fn ancestors(&self, start: ObjectId) -> StoreResult<HashSet<ObjectId>> {
        let commits = read(&self.commits)?;
        let by_id: HashMap<ObjectId, &CommitInfo> = commits.iter().map(|c| (c.id, c)).collect();
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(info) = by_id.get(&id) {
                stack.extend(info.parents.iter().copied());
            }
        }
        Ok(seen)
    }
}

/// Content id of every note under `notes_ref`.
fn notes_tip(notes: &HashMap<(String, ObjectId), Vec<u8>>, notes_ref: &str) -> ObjectId {
    let mut entries: Vec<(&ObjectId, &Vec<u8>)> = notes
        .iter()
        .filter(|((r, _), _)| r == notes_ref)
        .map(|((_, commit), body)| (commit, body))
        .collect();
    entries.sort();
    let mut buf = Vec::new();
    for (commit, body) in entries {
        buf.extend_from_slice(commit.as_bytes());
        buf.extend_from_slice(ContentHasher::BLOB.hash(body).as_bytes());
    }
    ContentHasher::COMMIT.hash(&buf)
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryStore {
    fn hash_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        Ok(ContentHasher::BLOB.hash(data))
    }

    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.put(ObjectKind::Blob, ContentHasher::BLOB.hash(data), data)
    }

    fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.get(id, ObjectKind::Blob)
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        let data = Tree::new(tree.entries.clone()).encode()?;
        self.put(ObjectKind::Tree, ContentHasher::TREE.hash(&data), &data)
    }

    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let data = self.get(id, ObjectKind::Tree)?;
        Tree::decode(id, &data)
    }

    fn read_ref(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        Ok(read(&self.refs)?.get(name).copied())
    }

    fn update_ref(
        &self,
        name: &str,
        new: &ObjectId,
        expected: Option<&ObjectId>,
    ) -> StoreResult<()> {
        validate_ref_name(name)?;
        self.check_writable()?;
        let mut refs = write(&self.refs)?;
        let current = refs.get(name);
        if current != expected {
            return Err(StoreError::RefConflict {
                name: name.to_string(),
                expected: expected.map_or_else(|| "(absent)".into(), |id| id.to_hex()),
                actual: current.map_or_else(|| "(absent)".into(), |id| id.to_hex()),
            });
        }
        refs.insert(name.to_string(), *new);
        self.ref_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resolve_commit(&self, rev: &str) -> StoreResult<ObjectId> {
        let unknown = || StoreError::UnknownRevision(rev.to_string());
        let (base, back) = match rev.rsplit_once('~') {
            Some((base, n)) => (base, n.parse::<usize>().map_err(|_| unknown())?),
            None => (rev, 0),
        };
        let mut id = match read(&self.revs)?.get(base) {
            Some(id) => *id,
            None => {
                let id = ObjectId::from_hex(base).map_err(|_| unknown())?;
                self.commit_index(&id)?.ok_or_else(unknown)?;
                id
            }
        };
        for _ in 0..back {
            id = self.previous_commit(&id)?.ok_or_else(unknown)?;
        }
        Ok(id)
    }

    fn list_commits(&self, range: &str) -> StoreResult<Vec<ObjectId>> {
        let selected = match range.split_once("..") {
            Some((from, to)) => {
                let exclude = self.ancestors(self.resolve_commit(from)?)?;
                let include = self.ancestors(self.resolve_commit(to)?)?;
                include.difference(&exclude).copied().collect::<HashSet<_>>()
            }
            None => self.ancestors(self.resolve_commit(range)?)?,
        };
        let commits = read(&self.commits)?;
        Ok(commits
            .iter()
            .filter(|c| selected.contains(&c.id))
            .map(|c| c.id)
            .collect())
    }

    fn commit_info(&self, commit: &ObjectId) -> StoreResult<CommitInfo> {
        read(&self.commits)?
            .iter()
            .find(|c| c.id == *commit)
            .cloned()
            .ok_or(StoreError::NotFound(*commit))
    }

    fn read_note(&self, notes_ref: &str, commit: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        Ok(read(&self.notes)?
            .get(&(notes_ref.to_string(), *commit))
            .cloned())
    }

    fn write_note(&self, notes_ref: &str, commit: &ObjectId, body: &[u8]) -> StoreResult<()> {
        validate_ref_name(notes_ref)?;
        self.check_writable()?;
        self.commit_index(commit)?.ok_or(StoreError::NotFound(*commit))?;
        let tip = {
            let mut notes = write(&self.notes)?;
            notes.insert((notes_ref.to_string(), *commit), body.to_vec());
            notes_tip(&notes, notes_ref)
        };
        // The notes ref tracks the note set so it can be pushed like any ref.
        write(&self.refs)?.insert(notes_ref.to_string(), tip);
        self.ref_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remote_ref(&self, remote: &str, name: &str) -> StoreResult<Option<ObjectId>> {
        Ok(read(&self.remotes)?
            .get(&(remote.to_string(), name.to_string()))
            .copied())
    }

    fn push_refs(&self, remote: &str, names: &[&str]) -> StoreResult<()> {
        let refs = read(&self.refs)?;
        let mut remotes = write(&self.remotes)?;
        for name in names {
            if let Some(id) = refs.get(*name) {
                remotes.insert((remote.to_string(), name.to_string()), *id);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("object_count", &self.object_count())
            .field("ref_updates", &self.ref_update_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::TreeEntry;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // Content addressing
    // -----------------------------------------------------------------------

    #[test]
    fn same_blob_content_is_stored_once() {
        let store = InMemoryStore::new();
        let id1 = store.write_blob(b"identical").unwrap();
        let id2 = store.write_blob(b"identical").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.hash_blob(b"identical").unwrap(), id1);
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.read_blob(&id1).unwrap(), b"identical");
    }

    #[test]
    fn tree_id_ignores_entry_order() {
        let store = InMemoryStore::new();
        let a = TreeEntry::blob("a", store.write_blob(b"a").unwrap());
        let b = TreeEntry::blob("b", store.write_blob(b"b").unwrap());
        let t1 = store.write_tree(&Tree { entries: vec![a.clone(), b.clone()] }).unwrap();
        let t2 = store.write_tree(&Tree { entries: vec![b, a] }).unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn reading_blob_as_tree_is_an_error() {
        let store = InMemoryStore::new();
        let id = store.write_blob(b"x").unwrap();
        assert!(matches!(store.read_tree(&id), Err(StoreError::WrongKind { .. })));
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryStore::new();
        let id = ObjectId::from_bytes(b"never");
        assert!(matches!(store.read_blob(&id), Err(StoreError::NotFound(_))));
    }

    // -----------------------------------------------------------------------
    // Refs
    // -----------------------------------------------------------------------

    #[test]
    fn update_ref_is_compare_and_set() {
        let store = InMemoryStore::new();
        let t1 = store.write_tree(&Tree::empty()).unwrap();
        let blob = store.write_blob(b"x").unwrap();
        let t2 = store.write_tree(&Tree::new(vec![TreeEntry::blob("x", blob)])).unwrap();

        store.update_ref("refs/memento/t", &t1, None).unwrap();
        let err = store.update_ref("refs/memento/t", &t2, None).unwrap_err();
        assert!(matches!(err, StoreError::RefConflict { .. }));
        store.update_ref("refs/memento/t", &t2, Some(&t1)).unwrap();
        assert_eq!(store.read_ref("refs/memento/t").unwrap(), Some(t2));
        assert_eq!(store.ref_update_count(), 2);
    }

    #[test]
    fn update_ref_rejects_bad_names() {
        let store = InMemoryStore::new();
        let t = store.write_tree(&Tree::empty()).unwrap();
        assert!(matches!(
            store.update_ref("transcripts", &t, None),
            Err(StoreError::InvalidRefName { .. })
        ));
    }

    #[test]
    fn read_only_blocks_writes() {
        let store = InMemoryStore::new();
        store.set_read_only(true);
        assert!(matches!(store.write_blob(b"x"), Err(StoreError::ReadOnly)));
    }

    #[test]
    fn read_path_walks_subtrees() {
        let store = InMemoryStore::new();
        let blob = store.write_blob(b"{}").unwrap();
        let sub = store.write_tree(&Tree::new(vec![TreeEntry::blob("s1.jsonl", blob)])).unwrap();
        let root = store.write_tree(&Tree::new(vec![TreeEntry::tree("claude", sub)])).unwrap();
        store.update_ref("refs/memento/t", &root, None).unwrap();

        assert_eq!(
            store.read_path("refs/memento/t", "claude/s1.jsonl").unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(store.read_path("refs/memento/t", "claude/nope").unwrap(), None);
        assert_eq!(store.read_path("refs/memento/none", "claude/s1.jsonl").unwrap(), None);
        assert!(store.read_path("refs/memento/t", "claude").is_err());
    }

    // -----------------------------------------------------------------------
    // Commits and notes
    // -----------------------------------------------------------------------

    #[test]
    fn scripted_history_resolves_and_lists() {
        let store = InMemoryStore::new();
        let c1 = store.add_commit(at(0), &[]).unwrap();
        let c2 = store.add_commit(at(10), &[c1]).unwrap();
        let c3 = store.add_commit(at(20), &[c2]).unwrap();

        assert_eq!(store.resolve_commit("HEAD").unwrap(), c3);
        assert_eq!(store.resolve_commit("HEAD~2").unwrap(), c1);
        assert_eq!(store.resolve_commit(&c2.to_hex()).unwrap(), c2);
        assert!(store.resolve_commit("HEAD~3").is_err());
        assert!(store.resolve_commit("nope").is_err());

        assert_eq!(store.list_commits("HEAD").unwrap(), vec![c1, c2, c3]);
        assert_eq!(
            store.list_commits(&format!("{}..HEAD", c1.to_hex())).unwrap(),
            vec![c2, c3]
        );
        assert_eq!(store.previous_commit(&c2).unwrap(), Some(c1));
        assert_eq!(store.previous_commit(&c1).unwrap(), None);
        assert_eq!(store.commit_timestamp(&c3).unwrap(), at(20));
    }

    #[test]
    fn notes_are_keyed_by_ref_and_commit() {
        let store = InMemoryStore::new();
        let c1 = store.add_commit(at(0), &[]).unwrap();
        store.write_note("refs/notes/a", &c1, b"one").unwrap();
        assert_eq!(store.read_note("refs/notes/a", &c1).unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.read_note("refs/notes/b", &c1).unwrap(), None);
        let tip = store.read_ref("refs/notes/a").unwrap();
        store.write_note("refs/notes/a", &c1, b"two").unwrap();
        assert_eq!(store.read_note("refs/notes/a", &c1).unwrap(), Some(b"two".to_vec()));
        assert!(tip.is_some());
        assert_ne!(store.read_ref("refs/notes/a").unwrap(), tip);
    }

    #[test]
    fn note_on_unknown_commit_fails() {
        let store = InMemoryStore::new();
        let bogus = ObjectId::from_bytes(b"bogus");
        assert!(store.write_note("refs/notes/a", &bogus, b"x").is_err());
    }

    #[test]
    fn push_copies_refs_to_remote() {
        let store = InMemoryStore::new();
        let t = store.write_tree(&Tree::empty()).unwrap();
        store.update_ref("refs/memento/t", &t, None).unwrap();
        assert_eq!(store.remote_ref("origin", "refs/memento/t").unwrap(), None);
        store.push_refs("origin", &["refs/memento/t"]).unwrap();
        assert_eq!(store.remote_ref("origin", "refs/memento/t").unwrap(), Some(t));
    }
}
