//! Per-user session state
//!
//! A [`Session`] is the explicit context every interaction handler works on:
//! it owns the dataset store, the current dropdown selection and the last
//! rendered output. Sessions never share state; [`SessionManager`] keeps a
//! set of them isolated from each other.

use crate::chart::{build, ChartKind, Selection};
use crate::columns;
use crate::data::Dataset;
use crate::decode::{decode, decode_upload};
use crate::error::Result;
use crate::render::{PageContext, RenderResult, Rendered, Renderer};
use crate::store::DatasetStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing uploaded yet.
    Empty,
    /// A dataset is loaded but the selection is incomplete.
    DatasetLoaded,
    /// Axes and kind are chosen; the output reflects them.
    Rendered,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    store: DatasetStore,
    selection: Selection,
    output: Option<Rendered>,
    state: SessionState,
    renderer: Renderer,
    last_activity: Instant,
}

impl Session {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string()[..12].to_string(),
            store: DatasetStore::new(),
            selection: Selection::default(),
            output: None,
            state: SessionState::Empty,
            renderer,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.store.get()
    }

    /// Column choices for the axis dropdowns; empty before the first upload.
    pub fn columns(&self) -> Vec<String> {
        self.store
            .get()
            .map(|ds| columns::columns(&ds))
            .unwrap_or_default()
    }

    /// What the chart area currently shows.
    pub fn output(&self) -> Option<&Rendered> {
        self.output.as_ref()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Handle a file upload. On failure the previous dataset stays loaded and
    /// the error replaces whatever the chart area showed.
    pub fn upload(&mut self, bytes: &[u8], filename: &str) -> Result<Vec<String>> {
        let outcome = decode(bytes, filename);
        self.accept_upload(outcome)
    }

    /// Handle a browser-style `data:` URL upload.
    pub fn upload_contents(&mut self, contents: &str, filename: &str) -> Result<Vec<String>> {
        let outcome = decode_upload(contents, filename);
        self.accept_upload(outcome)
    }

    fn accept_upload(&mut self, outcome: Result<Dataset>) -> Result<Vec<String>> {
        self.touch();
        let dataset = match outcome {
            Ok(dataset) => dataset,
            Err(e) => {
                self.output = Some(Rendered::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let dataset = self.store.set(dataset);
        self.selection.x = columns::revalidate(self.selection.x.as_deref(), &dataset);
        self.selection.y = columns::revalidate(self.selection.y.as_deref(), &dataset);
        info!(session = %self.id, source = dataset.source(), "dataset loaded");

        self.output = None;
        self.state = SessionState::DatasetLoaded;
        self.refresh();
        Ok(columns::columns(&dataset))
    }

    pub fn select_x(&mut self, column: impl Into<String>) -> Option<&Rendered> {
        self.selection.x = Some(column.into());
        self.refresh()
    }

    pub fn select_y(&mut self, column: impl Into<String>) -> Option<&Rendered> {
        self.selection.y = Some(column.into());
        self.refresh()
    }

    pub fn select_kind(&mut self, kind: ChartKind) -> Option<&Rendered> {
        self.selection.kind = Some(kind);
        self.refresh()
    }

    /// Select a chart kind by its tag. An unknown tag clears the kind and
    /// shows the error.
    pub fn select_kind_tag(&mut self, tag: &str) -> Option<&Rendered> {
        match tag.parse::<ChartKind>() {
            Ok(kind) => self.select_kind(kind),
            Err(e) => {
                self.touch();
                self.selection.kind = None;
                self.output = Some(Rendered::Error {
                    message: e.to_string(),
                });
                if self.state == SessionState::Rendered {
                    self.state = SessionState::DatasetLoaded;
                }
                self.output.as_ref()
            }
        }
    }

    /// Re-run dispatch and render if the selection is complete.
    fn refresh(&mut self) -> Option<&Rendered> {
        self.touch();
        let Some(dataset) = self.store.get() else {
            return self.output.as_ref();
        };

        match self.selection.request() {
            Some(request) => {
                debug!(session = %self.id, ?request, "dispatching chart");
                let result = RenderResult::from(build(&dataset, &request));
                self.output = Some(self.renderer.render(&result));
                self.state = SessionState::Rendered;
            }
            None => {
                self.output = None;
                self.state = SessionState::DatasetLoaded;
            }
        }
        self.output.as_ref()
    }

    pub fn page(&self) -> String {
        let dataset = self.store.get();
        self.renderer.page(&PageContext {
            dataset: dataset.as_deref(),
            selection: Some(&self.selection),
            output: self.output.as_ref(),
        })
    }

    /// Write the current page to the renderer's output path.
    pub fn save(&self) -> Result<PathBuf> {
        let dataset = self.store.get();
        self.renderer.write_page(&PageContext {
            dataset: dataset.as_deref(),
            selection: Some(&self.selection),
            output: self.output.as_ref(),
        })
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Keeps concurrent sessions apart. The map lock is held only to look a
/// session up; handlers then run under that session's own mutex.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    renderer: Renderer,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(renderer: Renderer, timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            renderer,
            timeout,
        }
    }

    /// Start a session and return its id.
    pub fn create(&self) -> String {
        let session = Session::new(self.renderer.clone());
        let id = session.id.clone();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(session = %id, "session created");
        id
    }

    /// Run `f` against one session, if it exists. Other sessions stay usable
    /// while `f` runs.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut session))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Drop sessions idle for longer than the timeout; returns how many went.
    pub fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        // a session busy in a handler is not idle
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => !s.is_expired(self.timeout),
            Err(TryLockError::Poisoned(p)) => !p.into_inner().is_expired(self.timeout),
            Err(TryLockError::WouldBlock) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, "expired idle sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
