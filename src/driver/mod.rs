//! Drives the variables tree from a recorded session: transcript replay,
//! the interactive console and a plain-text view.

mod console;
mod render;

pub use console::{run_console, Command};
pub use render::render;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, InspectorConfig};
use crate::error::TreeError;
use crate::session::{DebugSession, ScriptedSession, Transcript};
use crate::tree::{ModelEvent, ModelIndex, NodeId, RecordingSink};
use crate::variables::{Format, VariableCollection};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid transcript: {0}")]
    Transcript(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("{0}")]
    Command(String),
}

/// What one stop did to the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub stop: usize,
    pub inserted: usize,
    pub removed: usize,
    pub changed: usize,
}

impl StepReport {
    fn count(&mut self, events: &[ModelEvent]) {
        for event in events {
            match event {
                ModelEvent::BeginInsertRows { first, last, .. } => {
                    self.inserted += last - first + 1;
                }
                ModelEvent::BeginRemoveRows { first, last, .. } => {
                    self.removed += last - first + 1;
                }
                ModelEvent::DataChanged { .. } => self.changed += 1,
                _ => {}
            }
        }
    }
}

/// The variables tree bound to a transcript-backed session.
pub struct Inspector {
    collection: VariableCollection,
    session: ScriptedSession,
    events: RecordingSink,
}

impl Inspector {
    pub fn new(config: InspectorConfig, transcript: Transcript) -> Self {
        let events = RecordingSink::new();
        let page_size = config.child_page_size;
        let collection = VariableCollection::new(config).with_sink(Box::new(events.clone()));
        let session = ScriptedSession::new(transcript).with_page_size(page_size);
        Self {
            collection,
            session,
            events,
        }
    }

    /// Reads the transcript and, if given, the configuration file.
    pub fn load(transcript: &Path, config: Option<&Path>) -> Result<Self, DriverError> {
        let config = match config {
            Some(path) => InspectorConfig::load(path)?,
            None => InspectorConfig::default(),
        };
        let text = fs::read_to_string(transcript)?;
        let transcript = Transcript::from_json(&text)?;
        info!(stops = transcript.stops.len(), "transcript loaded");
        Ok(Self::new(config, transcript))
    }

    pub fn collection(&self) -> &VariableCollection {
        &self.collection
    }

    pub fn session(&self) -> &ScriptedSession {
        &self.session
    }

    pub fn events(&self) -> &RecordingSink {
        &self.events
    }

    pub fn is_running(&self) -> bool {
        self.session.is_started()
    }

    /// Starts the session, shows the tree and sets up the recorded watches.
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.session.start();
        self.collection.set_widget_visible(true, &mut self.session);
        let expressions = self.session.transcript().watches.clone();
        for expression in expressions {
            self.add_watch(&expression)?;
        }
        self.collection.reinstall(&mut self.session);
        self.pump()?;
        Ok(())
    }

    /// Moves to the next stop and brings the tree up to date. `None` once
    /// the transcript is exhausted.
    pub fn step(&mut self) -> Result<Option<StepReport>, DriverError> {
        self.events.clear();
        let Some(stop) = self.session.advance().cloned() else {
            return Ok(None);
        };
        let number = self.session.stop_number().unwrap_or_default();
        debug!(stop = number, scopes = stop.scopes.len(), "applying stop");

        self.collection.reset_changed()?;
        let auto = self.session.auto_update();

        for scope in &stop.scopes {
            let created = self.collection.find_locals(&scope.name).is_none();
            let variables = self
                .collection
                .update_scope(&scope.name, &scope.variables, &mut self.session)?;
            if created {
                let locals = self.collection.locals(&scope.name)?;
                self.collection.set_expanded(locals, true, &mut self.session)?;
            }
            if auto.locals {
                self.collection.refresh(&variables, &mut self.session);
            }
            self.collection.attach(&variables, &mut self.session);
        }

        // Scopes the stop no longer lists keep their rows, out of scope.
        let reported: HashSet<&str> = stop.scopes.iter().map(|s| s.name.as_str()).collect();
        let left: Vec<NodeId> = self
            .collection
            .all_locals()
            .iter()
            .filter(|(name, _)| !reported.contains(name.as_str()))
            .map(|(_, id)| *id)
            .collect();
        for locals in left {
            self.collection.retire_locals(locals)?;
        }
        self.collection.update_auto_update(&mut self.session);

        match &stop.finish_result {
            Some(convenience) => {
                self.collection.add_finish_result(&mut self.session, convenience);
            }
            None => self.collection.remove_finish_result(),
        }

        let watches = self.collection.model().children(self.collection.watches()).to_vec();
        if auto.watches {
            self.collection.refresh(&watches, &mut self.session);
        }
        self.collection.attach(&watches, &mut self.session);

        self.pump()?;

        let mut report = StepReport {
            stop: number,
            ..StepReport::default()
        };
        let events = self.events.take();
        for event in &events {
            trace!(?event, "model event");
        }
        report.count(&events);
        Ok(Some(report))
    }

    /// Applies every pending session answer, including the ones that
    /// applying produces.
    pub fn pump(&mut self) -> Result<usize, DriverError> {
        let mut applied = 0;
        loop {
            let updates = self.session.take_updates();
            if updates.is_empty() {
                return Ok(applied);
            }
            for update in updates {
                if self.collection.apply_update(update, &mut self.session)? {
                    applied += 1;
                }
            }
        }
    }

    /// Steps through every remaining stop.
    pub fn run_to_end(&mut self) -> Result<Vec<StepReport>, DriverError> {
        let mut reports = Vec::new();
        while let Some(report) = self.step()? {
            reports.push(report);
        }
        Ok(reports)
    }

    pub fn add_watch(&mut self, expression: &str) -> Result<NodeId, DriverError> {
        let id = self
            .collection
            .add_watch(&mut self.session, expression)
            .ok_or_else(|| DriverError::Command("no active debug session".to_string()))?;
        self.pump()?;
        Ok(id)
    }

    pub fn remove_watch(&mut self, path: &[usize]) -> Result<(), DriverError> {
        let id = self.resolve(path)?;
        self.collection.remove_watch(id)?;
        Ok(())
    }

    pub fn set_expanded(&mut self, path: &[usize], expanded: bool) -> Result<(), DriverError> {
        let id = self.resolve(path)?;
        self.collection.set_expanded(id, expanded, &mut self.session)?;
        Ok(())
    }

    /// Fetches the remaining children of the row at `path`, which may be
    /// the variable or its ellipsis row.
    pub fn fetch_more(&mut self, path: &[usize]) -> Result<(), DriverError> {
        let id = self.resolve(path)?;
        let model = self.collection.model();
        let marker = if model.is_ellipsis(id) {
            Some(id)
        } else if model.has_more(id) {
            model.child(id, model.children(id).len())
        } else {
            None
        };
        let Some(marker) = marker else {
            warn!(node = %id, "nothing more to fetch");
            return Ok(());
        };
        if self.collection.activate(marker, &mut self.session) {
            self.pump()?;
        }
        Ok(())
    }

    pub fn set_format(&mut self, path: &[usize], format: Format) -> Result<(), DriverError> {
        let id = self.resolve(path)?;
        self.collection.set_format(id, format, &mut self.session)?;
        self.pump()?;
        Ok(())
    }

    pub fn render(&self, paths: bool) -> String {
        render(&self.collection, paths)
    }

    fn resolve(&self, path: &[usize]) -> Result<NodeId, DriverError> {
        let index = ModelIndex::new(path.to_vec(), 0);
        self.collection
            .model()
            .node_for_index(&index)
            .filter(|_| !path.is_empty())
            .ok_or_else(|| DriverError::Command(format!("no row at {}", index)))
    }
}

/// Replays the whole transcript and returns the rendered tree after each
/// stop.
pub fn replay(inspector: &mut Inspector) -> Result<Vec<String>, DriverError> {
    inspector.start()?;
    let mut frames = Vec::new();
    while let Some(report) = inspector.step()? {
        info!(
            stop = report.stop,
            inserted = report.inserted,
            removed = report.removed,
            changed = report.changed,
            "stop applied"
        );
        frames.push(inspector.render(false));
    }
    Ok(frames)
}
