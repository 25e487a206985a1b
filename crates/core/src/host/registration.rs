//! Generation handover bookkeeping.
//!
//! Tracks which generation controls which open context, and decides when an
//! installed generation may take over from the active one.

use std::collections::BTreeMap;

use serde::Serialize;

/// An installed generation waiting to become active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Waiting {
    pub version: String,
    pub skip_waiting: bool,
}

/// Registration state shared by every generation of the worker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    active: Option<String>,
    waiting: Option<Waiting>,
    /// Open contexts and the generation controlling each (`None` = uncontrolled).
    contexts: BTreeMap<String, Option<String>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn waiting(&self) -> Option<&Waiting> {
        self.waiting.as_ref()
    }

    pub fn controller_of(&self, context: &str) -> Option<&str> {
        self.contexts.get(context).and_then(|v| v.as_deref())
    }

    /// Record a finished install. Reinstalling the active version is a no-op.
    pub fn installed(&mut self, version: &str, skip_waiting: bool) {
        if self.active.as_deref() == Some(version) {
            return;
        }
        match &mut self.waiting {
            Some(waiting) if waiting.version == version => waiting.skip_waiting |= skip_waiting,
            _ => self.waiting = Some(Waiting { version: version.to_string(), skip_waiting }),
        }
    }

    /// Mark the waiting generation as allowed to take over immediately.
    ///
    /// Returns `false` when nothing is waiting.
    pub fn skip_waiting(&mut self) -> bool {
        match &mut self.waiting {
            Some(waiting) => {
                waiting.skip_waiting = true;
                true
            }
            None => false,
        }
    }

    /// Contexts still controlled by the active generation.
    pub fn controlled_by_active(&self) -> usize {
        match &self.active {
            Some(active) => self
                .contexts
                .values()
                .filter(|c| c.as_deref() == Some(active.as_str()))
                .count(),
            None => 0,
        }
    }

    /// Whether the waiting generation may activate now.
    pub fn ready_to_activate(&self) -> bool {
        match &self.waiting {
            Some(waiting) => waiting.skip_waiting || self.controlled_by_active() == 0,
            None => false,
        }
    }

    /// Make the waiting generation active. Returns the version it replaced.
    pub fn promote(&mut self) -> Option<String> {
        let waiting = self.waiting.take()?;
        self.active.replace(waiting.version)
    }

    /// Put every open context under the active generation.
    pub fn claim(&mut self) -> usize {
        let Some(active) = self.active.clone() else {
            return 0;
        };
        let mut claimed = 0;
        for controller in self.contexts.values_mut() {
            if controller.as_deref() != Some(active.as_str()) {
                *controller = Some(active.clone());
                claimed += 1;
            }
        }
        claimed
    }

    /// A new context starts under the active generation, if any.
    pub fn open_context(&mut self, id: &str) {
        self.contexts.insert(id.to_string(), self.active.clone());
    }

    pub fn close_context(&mut self, id: &str) -> bool {
        self.contexts.remove(id).is_some()
    }
}
