use memento_notes::WorkPeriod;
use tracing::debug;

use crate::ban::BanList;
use crate::error::{SessionError, SessionResult};
use crate::source::{LocalSession, SessionSource};

/// Finds the local sessions relevant to a commit.
pub struct Discovery {
    sources: Vec<Box<dyn SessionSource>>,
    bans: BanList,
}

impl Discovery {
    pub fn new(sources: Vec<Box<dyn SessionSource>>, bans: BanList) -> Self {
        Self { sources, bans }
    }

    pub fn bans(&self) -> &BanList {
        &self.bans
    }

    pub fn bans_mut(&mut self) -> &mut BanList {
        &mut self.bans
    }

    /// Every session from every source, banned ones excluded.
    pub fn list_all(&self) -> SessionResult<Vec<LocalSession>> {
        let mut all = Vec::new();
        for source in &self.sources {
            for session in source.list()? {
                if self.bans.is_banned(&session.key) {
                    debug!(session = %session.key, "skipping banned session");
                    continue;
                }
                all.push(session);
            }
        }
        Ok(all)
    }

    /// Sessions with activity inside `window`, oldest first.
    pub fn discover(&self, window: &WorkPeriod) -> SessionResult<Vec<LocalSession>> {
        let mut found: Vec<LocalSession> = self
            .list_all()?
            .into_iter()
            .filter(|s| window.overlaps(s.created, s.modified))
            .collect();
        found.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.key.cmp(&b.key)));
        debug!(
            start = %window.start,
            end = %window.end,
            found = found.len(),
            "session discovery complete"
        );
        Ok(found)
    }

    /// Raw transcript bytes of a session.
    pub fn read(&self, session: &LocalSession) -> SessionResult<Vec<u8>> {
        self.sources
            .iter()
            .find(|s| s.tool() == session.key.tool)
            .ok_or_else(|| SessionError::UnknownTool(session.key.tool.clone()))?
            .read(session)
    }
}
