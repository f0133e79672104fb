use gix::bstr::ByteSlice;
use gix::object::tree::EntryKind;
use gix::{ObjectId, Repository};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::{PathFilter, RepoLocation};
use crate::error::{ChurnError, Result};
use crate::model::{Author, CommitInfo, CommitTime, FileSnapshot};
use crate::source::HistorySource;

// Same heuristic as git: a NUL byte early in the blob means binary.
const BINARY_CHECK_LEN: usize = 8000;

/// A git repository read through gix. Remote repositories are cloned bare
/// into a temporary directory that lives as long as this value.
pub struct GixRepository {
    repo: Repository,
    // Blobs of the previous `files_of` call, so unchanged files are not
    // decoded again. `None` marks a binary blob.
    blob_cache: HashMap<ObjectId, Option<Arc<str>>>,
    _clone_dir: Option<TempDir>,
}

impl GixRepository {
    pub fn open(location: &RepoLocation) -> Result<Self> {
        match location {
            RepoLocation::Local(path) => Self::open_local(path),
            RepoLocation::Remote(url) => Self::clone_remote(url),
        }
    }

    pub fn open_local(path: &Path) -> Result<Self> {
        let repo = gix::discover(path)
            .map_err(|e| ChurnError::repository(format!("open {}", path.display()), e))?;
        debug!(git_dir = %repo.git_dir().display(), "opened repository");
        Ok(Self {
            repo,
            blob_cache: HashMap::new(),
            _clone_dir: None,
        })
    }

    pub fn clone_remote(url: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("git-churn-")
            .tempdir()
            .map_err(|e| ChurnError::repository(format!("create clone directory for {url}"), e))?;
        info!(url, dir = %dir.path().display(), "cloning repository");
        let should_interrupt = AtomicBool::new(false);
        let (repo, _outcome) = gix::prepare_clone_bare(url, dir.path())
            .map_err(|e| ChurnError::repository(format!("clone {url}"), e))?
            .fetch_only(gix::progress::Discard, &should_interrupt)
            .map_err(|e| ChurnError::repository(format!("fetch {url}"), e))?;
        Ok(Self {
            repo,
            blob_cache: HashMap::new(),
            _clone_dir: Some(dir),
        })
    }

    fn find_commit(&self, id: &str) -> Result<gix::Commit<'_>> {
        let oid = ObjectId::from_hex(id.as_bytes())
            .map_err(|e| ChurnError::repository(format!("parse commit id {id}"), e))?;
        self.repo
            .find_commit(oid)
            .map_err(|e| ChurnError::repository(format!("find commit {id}"), e))
    }

    fn read_blob(&self, oid: ObjectId, path: &str, commit: &str) -> Result<Option<Arc<str>>> {
        let blob = self
            .repo
            .find_blob(oid)
            .map_err(|e| ChurnError::content(path, commit, e))?;
        let prefix = &blob.data[..blob.data.len().min(BINARY_CHECK_LEN)];
        if prefix.contains(&0) {
            debug!(path, commit, "skipping binary file");
            return Ok(None);
        }
        Ok(Some(Arc::from(String::from_utf8_lossy(&blob.data).as_ref())))
    }
}

/// Converts a gix commit into the analysis' view of it, using the author
/// (not committer) signature.
pub fn commit_info(commit: &gix::Commit<'_>) -> Result<CommitInfo> {
    let id = commit.id.to_string();
    let decode_error = |what: &str, e: Box<dyn std::error::Error + Send + Sync>| {
        ChurnError::repository(format!("decode {what} of {id}"), e)
    };
    let author = commit
        .author()
        .map_err(|e| decode_error("author", e.into()))?;
    let time = author.time().map_err(|e| decode_error("author time", e.into()))?;
    let message = commit
        .message_raw()
        .map_err(|e| decode_error("message", e.into()))?
        .to_str_lossy()
        .into_owned();
    Ok(CommitInfo {
        id: id.clone(),
        author: Author::new(
            author.name.to_str_lossy().into_owned(),
            author.email.to_str_lossy().into_owned(),
        ),
        time: CommitTime::new(time.seconds, time.offset),
        message,
        parents: commit.parent_ids().map(|p| p.detach().to_string()).collect(),
    })
}

impl HistorySource for GixRepository {
    fn resolve_head(&self, rev: Option<&str>) -> Result<CommitInfo> {
        let commit = match rev {
            None => self
                .repo
                .head_commit()
                .map_err(|e| ChurnError::repository("resolve HEAD", e))?,
            Some(rev) => {
                let id = self
                    .repo
                    .rev_parse_single(rev)
                    .map_err(|e| ChurnError::repository(format!("resolve {rev}"), e))?;
                self.repo
                    .find_commit(id.detach())
                    .map_err(|e| ChurnError::repository(format!("resolve {rev} to a commit"), e))?
            }
        };
        commit_info(&commit)
    }

    fn parents_of(&self, commit: &CommitInfo) -> Result<Vec<CommitInfo>> {
        commit
            .parents
            .iter()
            .map(|id| commit_info(&self.find_commit(id)?))
            .collect()
    }

    fn files_of(
        &mut self,
        commit: &CommitInfo,
        filter: Option<&PathFilter>,
    ) -> Result<Vec<FileSnapshot>> {
        let records = {
            let tree = self
                .find_commit(&commit.id)?
                .tree()
                .map_err(|e| ChurnError::repository(format!("read tree of {}", commit.id), e))?;
            let mut recorder = gix::traverse::tree::Recorder::default();
            tree.traverse()
                .breadthfirst(&mut recorder)
                .map_err(|e| ChurnError::repository(format!("walk tree of {}", commit.id), e))?;
            recorder.records
        };

        let mut entries: Vec<(String, ObjectId)> = records
            .into_iter()
            .filter(|entry| {
                matches!(
                    entry.mode.kind(),
                    EntryKind::Blob | EntryKind::BlobExecutable
                )
            })
            .map(|entry| (entry.filepath.to_str_lossy().into_owned(), entry.oid))
            .filter(|(path, _)| filter.is_none_or(|f| f.matches(path)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut previous = std::mem::take(&mut self.blob_cache);
        let mut files = Vec::with_capacity(entries.len());
        for (path, oid) in entries {
            let content = match previous.remove(&oid) {
                Some(cached) => cached,
                None => match self.blob_cache.get(&oid) {
                    Some(cached) => cached.clone(),
                    None => self.read_blob(oid, &path, &commit.id)?,
                },
            };
            self.blob_cache.insert(oid, content.clone());
            if let Some(content) = content {
                files.push(FileSnapshot::new(path, content));
            }
        }
        Ok(files)
    }
}
