use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use memento_notes::{Note, SessionEntry, WorkPeriod};
use memento_scrub::ScrubPipeline;
use memento_sessions::{Discovery, LocalSession};
use memento_store::ObjectStore;
use memento_types::{ObjectId, SessionKey, Transcript};
use tracing::{debug, info, warn};

use crate::config::MementoConfig;
use crate::error::{EngineError, EngineResult};
use crate::outcome::{BatchReport, Outcome};
use crate::redact::{self, RedactTarget};
use crate::tree::{session_ext, BlobUpdate, TranscriptTree};

// ---------------------------------------------------------------------------
// Options and reports
// ---------------------------------------------------------------------------

/// Options for Add and Repair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Merge into an existing note instead of skipping the commit.
    pub force: bool,
    /// Compute everything but write nothing.
    pub dry_run: bool,
    /// Store transcripts without scrubbing.
    pub no_scrub: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Also ban the session from future capture.
    pub ban: bool,
    /// Push the notes and transcripts refs afterwards.
    pub push: bool,
    /// Reason recorded with the ban.
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RemoveReport {
    pub batch: BatchReport,
    /// The blob was present in the transcripts tree and has been deleted.
    pub blob_deleted: bool,
    pub banned: bool,
    pub pushed: bool,
    /// The remote already holds a copy, so the removal must be pushed to
    /// take effect there.
    pub remote_has_copy: bool,
}

#[derive(Clone, Debug)]
pub struct ShownSession {
    pub entry: SessionEntry,
    /// Whether the transcript blob is in the transcripts tree.
    pub stored: bool,
    /// Records inside the work period, when the blob is stored.
    pub records_in_period: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ShowReport {
    pub commit: ObjectId,
    pub period: WorkPeriod,
    pub sessions: Vec<ShownSession>,
}

/// A transcript ready to be stored.
struct Captured {
    session: LocalSession,
    blob: ObjectId,
    bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Memento
// ---------------------------------------------------------------------------

/// The lifecycle engine over one object store.
///
/// One instance serves one invocation. It holds no locks; concurrent
/// invocations rely on the store's compare-and-set ref updates.
pub struct Memento<S: ObjectStore> {
    store: S,
    config: MementoConfig,
    discovery: Discovery,
    pipeline: ScrubPipeline,
    ban_file: Option<PathBuf>,
}

impl<S: ObjectStore> Memento<S> {
    pub fn new(store: S, config: MementoConfig, discovery: Discovery) -> EngineResult<Self> {
        config.validate()?;
        let pipeline = ScrubPipeline::from_config(&config.scrub)?;
        Ok(Self {
            store,
            config,
            discovery,
            pipeline,
            ban_file: None,
        })
    }

    /// Persist ban list changes to `path`.
    pub fn with_ban_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ban_file = Some(path.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MementoConfig {
        &self.config
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn tree(&self) -> TranscriptTree<'_, S> {
        TranscriptTree::new(&self.store, &self.config.refs.transcripts)
    }

    // ---- Resolution ----

    /// Commits named by a revision or an `A..B` range, oldest first.
    pub fn resolve_targets(&self, target: &str) -> EngineResult<Vec<ObjectId>> {
        let resolved = if target.contains("..") {
            self.store.list_commits(target)
        } else {
            self.store.resolve_commit(target).map(|c| vec![c])
        };
        resolved.map_err(|source| EngineError::Resolution {
            rev: target.to_string(),
            source,
        })
    }

    /// The window whose sessions belong to `commit`: from the previous
    /// commit (or the beginning of time) to the commit itself.
    pub fn discovery_window(&self, commit: &ObjectId) -> EngineResult<WorkPeriod> {
        let info = self.store.commit_info(commit)?;
        let start = match info.first_parent() {
            Some(parent) => self.store.commit_timestamp(parent)?,
            None => DateTime::<Utc>::MIN_UTC,
        };
        Ok(WorkPeriod::new(start, info.timestamp))
    }

    /// The work period of a noted commit.
    pub fn work_period(&self, commit: &ObjectId, note: &Note) -> EngineResult<WorkPeriod> {
        let previous = match self.store.previous_commit(commit)? {
            Some(parent) => Some(self.store.commit_timestamp(&parent)?),
            None => None,
        };
        Ok(WorkPeriod::for_note(note, previous))
    }

    fn read_note(&self, commit: &ObjectId) -> EngineResult<Option<Note>> {
        match self.store.read_note(&self.config.refs.notes, commit)? {
            Some(body) => Ok(Some(Note::parse(&body)?)),
            None => Ok(None),
        }
    }

    fn write_note(&self, commit: &ObjectId, note: &Note) -> EngineResult<()> {
        self.store
            .write_note(&self.config.refs.notes, commit, &note.to_bytes()?)?;
        Ok(())
    }

    fn run_batch<F>(&self, commits: &[ObjectId], mut op: F) -> BatchReport
    where
        F: FnMut(&ObjectId) -> EngineResult<Outcome>,
    {
        let mut report = BatchReport::default();
        for commit in commits {
            let outcome = Outcome::from_result(op(commit));
            if let Outcome::Failed(err) = &outcome {
                warn!(commit = %commit.short_hex(), error = %err, "commit failed");
            }
            report.record(*commit, outcome);
        }
        report
    }

    // ---- Add / Repair ----

    /// Attach the sessions of each target commit.
    pub fn add(&self, target: &str, options: CaptureOptions) -> EngineResult<BatchReport> {
        let commits = self.resolve_targets(target)?;
        Ok(self.run_batch(&commits, |c| self.add_commit(c, options)))
    }

    pub fn add_commit(&self, commit: &ObjectId, options: CaptureOptions) -> EngineResult<Outcome> {
        let existing = self.store.read_note(&self.config.refs.notes, commit)?;
        if existing.is_some() && !options.force {
            return Ok(Outcome::skipped("note already exists (use --force to merge)"));
        }
        self.capture(commit, existing.as_deref(), options)
    }

    /// Re-derive the note of each target commit that lacks one.
    pub fn repair(&self, target: &str, options: CaptureOptions) -> EngineResult<BatchReport> {
        let commits = self.resolve_targets(target)?;
        Ok(self.run_batch(&commits, |c| self.repair_commit(c, options)))
    }

    /// Repair every commit reachable from `HEAD`.
    pub fn repair_scan(&self, options: CaptureOptions) -> EngineResult<BatchReport> {
        let commits = self
            .store
            .list_commits("HEAD")
            .map_err(|source| EngineError::Resolution {
                rev: "HEAD".into(),
                source,
            })?;
        Ok(self.run_batch(&commits, |c| self.repair_commit(c, options)))
    }

    pub fn repair_commit(&self, commit: &ObjectId, options: CaptureOptions) -> EngineResult<Outcome> {
        let existing = self.store.read_note(&self.config.refs.notes, commit)?;
        if existing.is_some() && !options.force {
            return Ok(Outcome::skipped("note present"));
        }
        self.capture(commit, existing.as_deref(), options)
    }

    /// Shared write path of Add and Repair.
    fn capture(
        &self,
        commit: &ObjectId,
        existing: Option<&[u8]>,
        options: CaptureOptions,
    ) -> EngineResult<Outcome> {
        let window = self.discovery_window(commit)?;
        let sessions = self.discovery.discover(&window)?;
        if sessions.is_empty() {
            return Ok(Outcome::skipped("no sessions found in work period"));
        }

        // A forced merge over an unreadable note replaces it.
        let existing = match existing.map(Note::parse).transpose() {
            Ok(note) => note,
            Err(err) => {
                warn!(commit = %commit.short_hex(), error = %err, "replacing malformed note");
                None
            }
        };
        let removed = |key: &SessionKey| {
            existing
                .as_ref()
                .and_then(|n| n.find(key))
                .is_some_and(|e| e.removed)
        };

        let unscrubbed;
        let scrubber = if options.no_scrub {
            unscrubbed = ScrubPipeline::disabled();
            &unscrubbed
        } else {
            &self.pipeline
        };
        let mut captured = Vec::new();
        for session in sessions {
            if removed(&session.key) {
                debug!(session = %session.key, "session was removed from this commit");
                continue;
            }
            let raw = self.discovery.read(&session)?;
            let (bytes, report) = scrubber.scrub_bytes(&raw);
            debug!(
                session = %session.key,
                replacements = report.replacements(),
                "transcript scrubbed"
            );
            let blob = self.store.hash_blob(&bytes)?;
            captured.push(Captured {
                session,
                blob,
                bytes,
            });
        }
        if captured.is_empty() {
            return Ok(Outcome::skipped("every session found was removed earlier"));
        }

        let start_work = captured
            .iter()
            .map(|c| c.session.created)
            .min()
            .unwrap_or(window.end);
        let entries = captured
            .iter()
            .map(|c| {
                SessionEntry::new(
                    &c.session.key,
                    &c.session.ext,
                    c.session.created,
                    c.session.modified,
                )
            })
            .collect();
        let fresh = Note::new(start_work, entries);
        let note = match existing {
            Some(mut note) => {
                note.merge(fresh);
                note
            }
            None => fresh,
        };

        if options.dry_run {
            let blobs: Vec<String> = captured
                .iter()
                .map(|c| format!("{}={}", c.session.key, c.blob.short_hex()))
                .collect();
            return Ok(Outcome::applied(format!(
                "dry run: would attach {} session(s): {}",
                captured.len(),
                blobs.join(", ")
            )));
        }

        let mut updates = Vec::with_capacity(captured.len());
        for c in &captured {
            let blob = self.store.write_blob(&c.bytes)?;
            updates.push(BlobUpdate::new(c.session.key.clone(), &c.session.ext, Some(blob)));
        }
        self.tree().apply(&updates)?;
        self.write_note(commit, &note)?;
        info!(
            commit = %commit.short_hex(),
            sessions = captured.len(),
            "sessions attached"
        );
        Ok(Outcome::applied(format!("attached {} session(s)", captured.len())))
    }

    // ---- Remove ----

    /// Whether the remote already has the notes or transcripts ref.
    ///
    /// Advisory: a failed lookup (no such remote, offline) counts as no copy.
    pub fn remote_has_copy(&self) -> bool {
        let refs = &self.config.refs;
        [&refs.notes, &refs.transcripts].into_iter().any(|name| {
            match self.store.remote_ref(&refs.remote, name) {
                Ok(found) => found.is_some(),
                Err(err) => {
                    debug!(remote = %refs.remote, error = %err, "remote lookup failed");
                    false
                }
            }
        })
    }

    /// Flag `key` removed in every target commit's note and delete its blob.
    pub fn remove(
        &mut self,
        target: &str,
        key: &SessionKey,
        options: &RemoveOptions,
    ) -> EngineResult<RemoveReport> {
        key.validate()
            .map_err(|e| EngineError::InvalidTarget(e.to_string()))?;
        let commits = self.resolve_targets(target)?;
        let mut report = RemoveReport {
            remote_has_copy: self.remote_has_copy(),
            ..Default::default()
        };

        report.batch = self.run_batch(&commits, |commit| self.remove_from_note(commit, key));

        let tree = self.tree();
        if let Some(entry) = tree.find_session(key)? {
            let ext = session_ext(&entry.name, &key.id).unwrap_or("jsonl");
            tree.upsert_blob(&key.tool, &key.id, ext, None)?;
            report.blob_deleted = true;
            info!(session = %key, "transcript deleted");
        }

        if options.ban {
            report.banned = self.ban(key, &options.reason)?;
        }
        if options.push {
            let refs = &self.config.refs;
            self.store
                .push_refs(&refs.remote, &[refs.notes.as_str(), refs.transcripts.as_str()])?;
            report.pushed = true;
            info!(remote = %refs.remote, "refs pushed");
        }
        Ok(report)
    }

    fn remove_from_note(&self, commit: &ObjectId, key: &SessionKey) -> EngineResult<Outcome> {
        let Some(mut note) = self.read_note(commit)? else {
            return Ok(Outcome::skipped("no note"));
        };
        if note.mark_removed(key) == 0 {
            return Ok(Outcome::skipped(format!("{key} not attached")));
        }
        self.write_note(commit, &note)?;
        info!(commit = %commit.short_hex(), session = %key, "session marked removed");
        Ok(Outcome::applied(format!("{key} marked removed")))
    }

    // ---- Redact ----

    /// Blank the content of one record in a stored transcript. The note is
    /// not touched.
    pub fn redact(&self, target: &RedactTarget) -> EngineResult<Outcome> {
        let tree = self.tree();
        let entry = tree
            .find_session(&target.key)?
            .ok_or_else(|| EngineError::NotFound(format!("no stored transcript for {}", target.key)))?;
        let ext = session_ext(&entry.name, &target.key.id).unwrap_or("jsonl");

        let mut transcript = Transcript::parse(&self.store.read_blob(&entry.object_id)?);
        let tolerance = Duration::milliseconds(self.config.redact.tolerance_ms);
        let placeholder = &self.config.redact.placeholder;
        let fields = redact::redact_at(&mut transcript, target.timestamp, tolerance, placeholder)
            .map_err(|err| match err {
                EngineError::NotFound(what) => {
                    EngineError::NotFound(format!("{what} in {}", target.key))
                }
                other => other,
            })?;
        if fields == 0 {
            return Ok(Outcome::skipped("record has no content to redact"));
        }

        let blob = self.store.write_blob(&transcript.to_bytes())?;
        if blob == entry.object_id {
            return Ok(Outcome::applied("record already redacted"));
        }
        tree.upsert_blob(&target.key.tool, &target.key.id, ext, Some(blob))?;
        info!(record = %target, blob = %blob.short_hex(), "record redacted");
        Ok(Outcome::applied(format!("redacted {fields} field(s)")))
    }

    // ---- Ban / Unban ----

    /// Ban a session from future capture. Returns `false` if already banned.
    pub fn ban(&mut self, key: &SessionKey, reason: &str) -> EngineResult<bool> {
        let added = self.discovery.bans_mut().ban(key, reason);
        if added {
            self.save_bans()?;
            info!(session = %key, "session banned");
        }
        Ok(added)
    }

    /// Lift bans. `id` is `tool/id` or a bare session id (every tool).
    pub fn unban(&mut self, id: &str) -> EngineResult<usize> {
        let lifted = match id.split_once('/') {
            Some((tool, id)) => self.discovery.bans_mut().unban(id, Some(tool)),
            None => self.discovery.bans_mut().unban(id, None),
        };
        if lifted > 0 {
            self.save_bans()?;
            info!(id, lifted, "session unbanned");
        }
        Ok(lifted)
    }

    fn save_bans(&self) -> EngineResult<()> {
        if let Some(path) = &self.ban_file {
            self.discovery.bans().save(path)?;
        }
        Ok(())
    }

    // ---- Show ----

    /// The live sessions of a commit's note, with windowed record counts.
    pub fn show(&self, rev: &str) -> EngineResult<Option<ShowReport>> {
        let commit = self
            .store
            .resolve_commit(rev)
            .map_err(|source| EngineError::Resolution {
                rev: rev.to_string(),
                source,
            })?;
        let Some(note) = self.read_note(&commit)? else {
            return Ok(None);
        };
        let period = self.work_period(&commit, &note)?;
        let mut sessions = Vec::new();
        for entry in note.active_sessions() {
            let blob = self
                .store
                .read_path(&self.config.refs.transcripts, &entry.path)?;
            let records_in_period = blob
                .as_deref()
                .map(|bytes| period.count_records(&Transcript::parse(bytes)));
            sessions.push(ShownSession {
                entry: entry.clone(),
                stored: blob.is_some(),
                records_in_period,
            });
        }
        Ok(Some(ShowReport {
            commit,
            period,
            sessions,
        }))
    }
}
