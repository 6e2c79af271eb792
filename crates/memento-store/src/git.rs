//! [`ObjectStore`] backed by a real git repository.
//!
//! Every operation shells out to the `git` binary with the repository root
//! as working directory. Notes are written from a blob (`notes add -C`) so
//! the note body is stored byte-for-byte, without git's message cleanup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use chrono::{TimeZone, Utc};
use memento_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::names::validate_ref_name;
use crate::object::{CommitInfo, EntryMode, ObjectKind, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// Git-backed object store.
#[derive(Clone, Debug)]
pub struct GitStore {
    root: PathBuf,
}

impl GitStore {
    /// Open the repository containing `path`.
    pub fn discover(path: &Path) -> StoreResult<Self> {
        let out = run_checked(path, &["rev-parse", "--show-toplevel"], None)?;
        let root = PathBuf::from(String::from_utf8_lossy(&out).trim());
        Ok(Self { root })
    }

    /// Working tree root of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the `.git` directory.
    pub fn git_dir(&self) -> StoreResult<PathBuf> {
        let out = self.git(&["rev-parse", "--absolute-git-dir"], None)?;
        Ok(PathBuf::from(String::from_utf8_lossy(&out).trim()))
    }

    fn git(&self, args: &[&str], stdin: Option<&[u8]>) -> StoreResult<Vec<u8>> {
        run_checked(&self.root, args, stdin)
    }

    fn git_text(&self, args: &[&str]) -> StoreResult<String> {
        Ok(String::from_utf8_lossy(&self.git(args, None)?).trim().to_string())
    }

    fn object_kind(&self, id: &ObjectId) -> StoreResult<Option<ObjectKind>> {
        let hex = id.to_hex();
        let output = run(&self.root, &["cat-file", "-t", &hex], None)?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(ObjectKind::parse(String::from_utf8_lossy(&output.stdout).trim()))
    }

    fn expect_kind(&self, id: &ObjectId, expected: ObjectKind) -> StoreResult<()> {
        match self.object_kind(id)? {
            None => Err(StoreError::NotFound(*id)),
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(StoreError::WrongKind {
                id: *id,
                expected: expected.to_string(),
                actual: kind.to_string(),
            }),
        }
    }
}

impl ObjectStore for GitStore {
    fn hash_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let out = self.git(&["hash-object", "--stdin"], Some(data))?;
        parse_id(&out)
    }

    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        let out = self.git(&["hash-object", "-w", "--stdin"], Some(data))?;
        parse_id(&out)
    }

    fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.expect_kind(id, ObjectKind::Blob)?;
        self.git(&["cat-file", "blob", &id.to_hex()], None)
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        let mut input = Vec::new();
        for entry in &tree.entries {
            write!(
                input,
                "{} {} {}\t{}\0",
                entry.mode,
                entry.kind(),
                entry.object_id,
                entry.name
            )?;
        }
        let out = self.git(&["mktree", "-z"], Some(&input))?;
        parse_id(&out)
    }

    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        self.expect_kind(id, ObjectKind::Tree)?;
        let out = self.git(&["ls-tree", "-z", &id.to_hex()], None)?;
        let mut entries = Vec::new();
        for record in out.split(|b| *b == 0).filter(|r| !r.is_empty()) {
            entries.push(parse_ls_tree_record(id, record)?);
        }
        Ok(Tree::new(entries))
    }

    fn read_ref(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        let output = run(&self.root, &["rev-parse", "--verify", "--quiet", name], None)?;
        if !output.status.success() {
            return Ok(None);
        }
        parse_id(&output.stdout).map(Some)
    }

    fn update_ref(
        &self,
        name: &str,
        new: &ObjectId,
        expected: Option<&ObjectId>,
    ) -> StoreResult<()> {
        validate_ref_name(name)?;
        let new_hex = new.to_hex();
        let old_hex = expected.map(|id| id.to_hex()).unwrap_or_default();
        let args = ["update-ref", "-m", "memento", name, &new_hex, &old_hex];
        let output = run(&self.root, &args, None)?;
        if output.status.success() {
            debug!(name, new = %new.short_hex(), "ref updated");
            return Ok(());
        }
        let actual = self.read_ref(name)?;
        if actual.as_ref() != expected {
            return Err(StoreError::RefConflict {
                name: name.to_string(),
                expected: expected.map_or_else(|| "(absent)".into(), |id| id.to_hex()),
                actual: actual.map_or_else(|| "(absent)".into(), |id| id.to_hex()),
            });
        }
        Err(backend_error(&args, &output))
    }

    fn resolve_commit(&self, rev: &str) -> StoreResult<ObjectId> {
        let spec = format!("{rev}^{{commit}}");
        let output = run(&self.root, &["rev-parse", "--verify", "--quiet", &spec], None)?;
        if !output.status.success() {
            return Err(StoreError::UnknownRevision(rev.to_string()));
        }
        parse_id(&output.stdout)
    }

    fn list_commits(&self, range: &str) -> StoreResult<Vec<ObjectId>> {
        let output = run(&self.root, &["rev-list", "--reverse", range, "--"], None)?;
        if !output.status.success() {
            return Err(StoreError::UnknownRevision(range.to_string()));
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| parse_id(l.as_bytes()))
            .collect()
    }

    fn commit_info(&self, commit: &ObjectId) -> StoreResult<CommitInfo> {
        self.expect_kind(commit, ObjectKind::Commit)?;
        let text = self.git_text(&["show", "-s", "--format=%ct %P", &commit.to_hex()])?;
        let mut fields = text.split_whitespace();
        let secs = fields
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| StoreError::CorruptObject {
                id: *commit,
                reason: format!("unparseable commit header: {text}"),
            })?;
        let timestamp = Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| StoreError::CorruptObject {
                id: *commit,
                reason: format!("timestamp out of range: {secs}"),
            })?;
        let parents = fields
            .map(|p| parse_id(p.as_bytes()))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(CommitInfo {
            id: *commit,
            timestamp,
            parents,
        })
    }

    fn read_note(&self, notes_ref: &str, commit: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        let hex = commit.to_hex();
        let args = ["notes", "--ref", notes_ref, "show", &hex];
        let output = run(&self.root, &args, None)?;
        if output.status.success() {
            return Ok(Some(output.stdout));
        }
        if String::from_utf8_lossy(&output.stderr).contains("no note found") {
            return Ok(None);
        }
        Err(backend_error(&args, &output))
    }

    fn write_note(&self, notes_ref: &str, commit: &ObjectId, body: &[u8]) -> StoreResult<()> {
        validate_ref_name(notes_ref)?;
        let blob = self.write_blob(body)?.to_hex();
        let hex = commit.to_hex();
        self.git(
            &["notes", "--ref", notes_ref, "add", "-f", "-C", &blob, &hex],
            None,
        )?;
        debug!(notes_ref, commit = %commit.short_hex(), "note written");
        Ok(())
    }

    fn remote_ref(&self, remote: &str, name: &str) -> StoreResult<Option<ObjectId>> {
        let out = self.git_text(&["ls-remote", remote, name])?;
        out.lines()
            .find_map(|line| {
                let (id, refname) = line.split_once('\t')?;
                (refname == name).then(|| parse_id(id.as_bytes()))
            })
            .transpose()
    }

    fn push_refs(&self, remote: &str, names: &[&str]) -> StoreResult<()> {
        let specs: Vec<String> = names.iter().map(|n| format!("+{n}:{n}")).collect();
        let mut args = vec!["push", remote];
        args.extend(specs.iter().map(String::as_str));
        self.git(&args, None)?;
        Ok(())
    }
}

fn run(root: &Path, args: &[&str], stdin: Option<&[u8]>) -> StoreResult<Output> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let Some(input) = stdin else {
        return Ok(cmd.stdin(Stdio::null()).output()?);
    };
    let mut child = cmd.stdin(Stdio::piped()).spawn()?;
    if let Some(mut pipe) = child.stdin.take() {
        pipe.write_all(input)?;
    }
    Ok(child.wait_with_output()?)
}

fn run_checked(root: &Path, args: &[&str], stdin: Option<&[u8]>) -> StoreResult<Vec<u8>> {
    let output = run(root, args, stdin)?;
    if !output.status.success() {
        return Err(backend_error(args, &output));
    }
    Ok(output.stdout)
}

fn backend_error(args: &[&str], output: &Output) -> StoreError {
    StoreError::Backend {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn parse_id(raw: &[u8]) -> StoreResult<ObjectId> {
    let text = String::from_utf8_lossy(raw);
    ObjectId::from_hex(text.trim())
        .map_err(|e| StoreError::Serialization(format!("bad object id {:?}: {e}", text.trim())))
}

/// Parse one `ls-tree -z` record: `<mode> SP <type> SP <id> TAB <name>`.
fn parse_ls_tree_record(tree: &ObjectId, record: &[u8]) -> StoreResult<TreeEntry> {
    let corrupt = |reason: &str| StoreError::CorruptObject {
        id: *tree,
        reason: format!("{reason}: {:?}", String::from_utf8_lossy(record)),
    };
    let text = std::str::from_utf8(record).map_err(|_| corrupt("non-utf8 entry"))?;
    let (meta, name) = text.split_once('\t').ok_or_else(|| corrupt("missing tab"))?;
    let mut parts = meta.split(' ');
    let mode = parts
        .next()
        .and_then(|m| u32::from_str_radix(m, 8).ok())
        .and_then(EntryMode::from_mode_bits)
        .ok_or_else(|| corrupt("bad mode"))?;
    let _kind = parts.next().ok_or_else(|| corrupt("missing type"))?;
    let id = parts
        .next()
        .ok_or_else(|| corrupt("missing id"))
        .and_then(|id| parse_id(id.as_bytes()))?;
    Ok(TreeEntry::new(mode, name, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn init_repo(dir: &Path) -> GitStore {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Test"],
            vec!["config", "user.email", "test@example.invalid"],
            vec!["commit", "-q", "--allow-empty", "-m", "first"],
            vec!["commit", "-q", "--allow-empty", "-m", "second"],
        ] {
            run_checked(dir, &args, None).unwrap();
        }
        GitStore::discover(dir).unwrap()
    }

    #[test]
    fn parses_ls_tree_records() {
        let tree = ObjectId::from_bytes(b"t");
        let entry = parse_ls_tree_record(
            &tree,
            b"040000 tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\tclaude",
        )
        .unwrap();
        assert_eq!(entry.mode, EntryMode::Directory);
        assert_eq!(entry.name, "claude");
        assert!(parse_ls_tree_record(&tree, b"garbage").is_err());
    }

    #[test]
    fn blob_tree_ref_roundtrip() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let store = init_repo(dir.path());

        let hashed = store.hash_blob(b"{\"a\":1}\n").unwrap();
        let blob = store.write_blob(b"{\"a\":1}\n").unwrap();
        assert_eq!(hashed, blob);
        assert_eq!(store.write_blob(b"{\"a\":1}\n").unwrap(), blob);
        let sub = store.write_tree(&Tree::new(vec![TreeEntry::blob("s.jsonl", blob)])).unwrap();
        let root = store.write_tree(&Tree::new(vec![TreeEntry::tree("claude", sub)])).unwrap();

        assert_eq!(store.read_tree(&root).unwrap().entries[0].object_id, sub);
        store.update_ref("refs/memento/transcripts", &root, None).unwrap();
        assert!(matches!(
            store.update_ref("refs/memento/transcripts", &root, None),
            Err(StoreError::RefConflict { .. })
        ));
        assert_eq!(
            store.read_path("refs/memento/transcripts", "claude/s.jsonl").unwrap(),
            Some(b"{\"a\":1}\n".to_vec())
        );
    }

    #[test]
    fn notes_and_commits() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let store = init_repo(dir.path());

        let head = store.resolve_commit("HEAD").unwrap();
        let first = store.resolve_commit("HEAD~1").unwrap();
        assert_eq!(store.previous_commit(&head).unwrap(), Some(first));
        assert_eq!(store.list_commits("HEAD").unwrap(), vec![first, head]);
        assert!(store.resolve_commit("no-such-branch").is_err());

        assert_eq!(store.read_note("refs/notes/memento", &head).unwrap(), None);
        store.write_note("refs/notes/memento", &head, b"{\"version\":1}\n").unwrap();
        assert_eq!(
            store.read_note("refs/notes/memento", &head).unwrap(),
            Some(b"{\"version\":1}\n".to_vec())
        );
    }
}
