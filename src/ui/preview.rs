use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub(crate) const CURRENT_FILE: &str = "current.html";
pub(crate) const PROPOSAL_FILE: &str = "proposal.html";

/// Mirrors the live document and the pending proposal into a directory so
/// they can be opened in a browser.
pub(crate) struct PreviewSink {
    dir: PathBuf,
}

impl PreviewSink {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub(crate) fn proposal_path(&self) -> PathBuf {
        self.dir.join(PROPOSAL_FILE)
    }

    /// Write `current.html`, and `proposal.html` when something is pending;
    /// a stale `proposal.html` is removed otherwise.
    pub(crate) fn sync(&self, current: &str, pending: Option<&str>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let current_path = self.current_path();
        fs::write(&current_path, current)
            .with_context(|| format!("failed to write {}", current_path.display()))?;

        let proposal_path = self.proposal_path();
        match pending {
            Some(content) => fs::write(&proposal_path, content)
                .with_context(|| format!("failed to write {}", proposal_path.display()))?,
            None => match fs::remove_file(&proposal_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to remove {}", proposal_path.display()));
                }
            },
        }
        debug!(dir = %self.dir.display(), pending = pending.is_some(), "preview synced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_current_and_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = PreviewSink::new(tmp.path().join("preview"));

        sink.sync("<html>A</html>", Some("<html>B</html>")).unwrap();

        assert_eq!(
            fs::read_to_string(sink.current_path()).unwrap(),
            "<html>A</html>"
        );
        assert_eq!(
            fs::read_to_string(sink.proposal_path()).unwrap(),
            "<html>B</html>"
        );
    }

    #[test]
    fn removes_proposal_when_nothing_pending() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = PreviewSink::new(tmp.path());
        sink.sync("<html>A</html>", Some("<html>B</html>")).unwrap();

        sink.sync("<html>B</html>", None).unwrap();
        sink.sync("<html>B</html>", None).unwrap();

        assert!(!sink.proposal_path().exists());
        assert_eq!(
            fs::read_to_string(sink.current_path()).unwrap(),
            "<html>B</html>"
        );
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let sink = PreviewSink::new(blocker.join("nested"));

        let err = sink.sync("<html></html>", None).unwrap_err();

        assert!(format!("{err:#}").contains("failed to create"));
    }
}
