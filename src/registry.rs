use crate::error::{Error, Result};
use crate::segment::{Segment, SegmentParams};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sessions by id, backed by a single snapshot file.
#[derive(Debug)]
pub struct SessionRegistry {
    path: PathBuf,
    sessions: BTreeMap<u32, Segment>,
    /// Set when an unreadable store could not be moved aside; `persist`
    /// then refuses to replace it.
    keep_existing: bool,
}

impl SessionRegistry {
    /// An empty registry that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionRegistry {
            path: path.into(),
            sessions: BTreeMap::new(),
            keep_existing: false,
        }
    }

    /// Loads the snapshot at `path`. A missing, empty or unreadable store
    /// gives an empty registry. An unreadable store is renamed to
    /// `<store>.corrupt` first so the next `persist` cannot destroy it.
    pub fn restore(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_restore(&path) {
            Ok(registry) => registry,
            Err(err) => {
                let mut registry = Self::new(path);
                let aside = registry.corrupt_path();
                match fs::rename(&registry.path, &aside) {
                    Ok(()) => warn!(
                        error = %err,
                        moved_to = %aside.display(),
                        "session store unreadable, moved aside; starting empty"
                    ),
                    Err(rename_err) => {
                        warn!(
                            error = %err,
                            rename_error = %rename_err,
                            "session store unreadable and could not be moved aside; it will not be overwritten"
                        );
                        registry.keep_existing = true;
                    }
                }
                registry
            }
        }
    }

    /// Like [`restore`](Self::restore), but reports unreadable or corrupt
    /// stores. A missing or empty file is still an empty registry.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn try_restore(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no session store yet");
                return Ok(Self::new(path));
            }
            Err(source) => {
                return Err(Error::StoreUnavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if bytes.is_empty() {
            return Ok(Self::new(path));
        }

        let (sessions, _): (BTreeMap<u32, Segment>, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |source| Error::StoreCorrupt {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
        debug!(sessions = sessions.len(), "restored session store");
        Ok(SessionRegistry {
            path: path.to_path_buf(),
            sessions,
            keep_existing: false,
        })
    }

    /// Writes the whole registry to a temp file next to the store, then
    /// renames it over the store.
    #[tracing::instrument(skip(self), fields(path = %self.path.display(), sessions = self.sessions.len()))]
    pub fn persist(&self) -> Result<()> {
        if self.keep_existing {
            return Err(Error::StoreUnavailable {
                path: self.path.clone(),
                source: std::io::Error::other(
                    "existing store could not be read; refusing to overwrite it",
                ),
            });
        }
        let bytes = bincode::serde::encode_to_vec(&self.sessions, bincode::config::standard())?;

        let unavailable = |source: std::io::Error| Error::StoreUnavailable {
            path: self.path.clone(),
            source,
        };
        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes).map_err(unavailable)?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(unavailable(source));
        }
        debug!(bytes = bytes.len(), "persisted session store");
        Ok(())
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling_path(".tmp")
    }

    /// Where an unreadable store is moved by [`restore`](Self::restore).
    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling_path(".corrupt")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Builds a segment and stores it, replacing any session with the same id.
    pub fn create(&mut self, params: SegmentParams) -> &mut Segment {
        let id = params.session_id;
        let segment = Segment::new(params);
        match self.sessions.entry(id) {
            Entry::Occupied(mut entry) => {
                info!(session_id = id, "replaced existing session");
                entry.insert(segment);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                info!(session_id = id, "created session");
                entry.insert(segment)
            }
        }
    }

    pub fn get(&self, session_id: u32) -> Result<&Segment> {
        self.sessions
            .get(&session_id)
            .ok_or(Error::SessionNotFound(session_id))
    }

    pub fn get_mut(&mut self, session_id: u32) -> Result<&mut Segment> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(Error::SessionNotFound(session_id))
    }

    pub fn contains(&self, session_id: u32) -> bool {
        self.sessions.contains_key(&session_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.sessions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
