use memento_types::{ObjectId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::object::{CommitInfo, ObjectKind, Tree};

/// The object store the engine is built on.
///
/// Implementations must satisfy these invariants:
/// - Blobs and trees are content-addressed: writing the same bytes twice
///   yields the same id and stores one object.
/// - [`update_ref`](Self::update_ref) is atomic compare-and-set: the ref
///   either moves from `expected` to `new` or is left untouched.
/// - Reads never observe a partially written tree.
/// - All calls are synchronous and blocking.
pub trait ObjectStore: Send + Sync {
    /// The id `data` would have as a blob, without storing it.
    fn hash_blob(&self, data: &[u8]) -> StoreResult<ObjectId>;

    /// Store bytes as a blob and return its content-addressed id.
    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId>;

    /// Read a blob's bytes.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>>;

    /// Store a tree and return its content-addressed id.
    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId>;

    /// Read a tree's entries.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree>;

    /// Read a ref. Returns `Ok(None)` if it does not exist.
    fn read_ref(&self, name: &str) -> StoreResult<Option<ObjectId>>;

    /// Move `name` to `new` only if it currently points at `expected`
    /// (`None` meaning "must not exist yet").
    fn update_ref(&self, name: &str, new: &ObjectId, expected: Option<&ObjectId>)
        -> StoreResult<()>;

    /// Resolve a revision expression (`HEAD`, `main~2`, an id) to a commit.
    fn resolve_commit(&self, rev: &str) -> StoreResult<ObjectId>;

    /// List the commits selected by a revision range, oldest first.
    ///
    /// `A..B` selects commits reachable from `B` but not `A`; a single
    /// revision selects it and all its ancestors.
    fn list_commits(&self, range: &str) -> StoreResult<Vec<ObjectId>>;

    /// Timestamp and parents of a commit.
    fn commit_info(&self, commit: &ObjectId) -> StoreResult<CommitInfo>;

    /// Read the note attached to `commit` under `notes_ref`.
    fn read_note(&self, notes_ref: &str, commit: &ObjectId) -> StoreResult<Option<Vec<u8>>>;

    /// Attach (or replace) the note on `commit` under `notes_ref`.
    fn write_note(&self, notes_ref: &str, commit: &ObjectId, body: &[u8]) -> StoreResult<()>;

    /// Where `name` points on `remote`, if the remote has it.
    ///
    /// Advisory only: used to warn that a destructive rewrite must be pushed.
    fn remote_ref(&self, remote: &str, name: &str) -> StoreResult<Option<ObjectId>>;

    /// Push the named refs to `remote`, replacing what is there.
    fn push_refs(&self, remote: &str, names: &[&str]) -> StoreResult<()>;

    /// Read the blob at a slash-separated `path` inside the tree `reference`
    /// points at. Returns `Ok(None)` if the ref or any path component is
    /// missing.
    fn read_path(&self, reference: &str, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let Some(mut current) = self.read_ref(reference)? else {
            return Ok(None);
        };
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        for (i, component) in components.iter().enumerate() {
            let tree = self.read_tree(&current)?;
            let Some(entry) = tree.get(component) else {
                return Ok(None);
            };
            let last = i + 1 == components.len();
            match (last, entry.kind()) {
                (true, ObjectKind::Blob) => return self.read_blob(&entry.object_id).map(Some),
                (false, ObjectKind::Tree) => current = entry.object_id,
                (_, actual) => {
                    return Err(StoreError::WrongKind {
                        id: entry.object_id,
                        expected: if last { "blob" } else { "tree" }.into(),
                        actual: actual.to_string(),
                    })
                }
            }
        }
        Ok(None)
    }

    /// The first parent of `commit`, if it has one.
    fn previous_commit(&self, commit: &ObjectId) -> StoreResult<Option<ObjectId>> {
        Ok(self.commit_info(commit)?.first_parent().copied())
    }

    /// Committer timestamp of `commit`.
    fn commit_timestamp(&self, commit: &ObjectId) -> StoreResult<Timestamp> {
        Ok(self.commit_info(commit)?.timestamp)
    }
}
