//! Event router: turns Spoolman change events into engine calls
//!
//! Two sources feed one queue:
//!   Spool     changes to spools (usage of a filament). Drives add/remove.
//!   Filament  changes to filament records. Only updates of filaments that
//!             are already materialized matter; adds and deletes are ignored.
//!
//! A single consumer owns the router and the engine, so all engine state is
//! mutated by one task. Each producer sends in arrival order, which keeps
//! per-source ordering; the two sources interleave freely.

use crate::engine::Reconciler;
use spoolsync_core::{Event, Filament, FilamentId, Result, Spool, SpoolId};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One item on the reconciliation queue, tagged with its source.
#[derive(Clone, Debug)]
pub enum Inbound {
    Spool(Event<Spool>),
    Filament(Event<Filament>),
}

pub struct EventRouter {
    engine: Reconciler,
    /// Filament each known spool points at, as last reported.
    spools: HashMap<SpoolId, Filament>,
    /// Spools using each filament.
    users: HashMap<FilamentId, HashSet<SpoolId>>,
}

impl EventRouter {
    pub fn new(engine: Reconciler) -> Self {
        Self {
            engine,
            spools: HashMap::new(),
            users: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &Reconciler {
        &self.engine
    }

    /// Number of known spools using `filament`.
    pub fn usage(&self, filament: FilamentId) -> usize {
        self.users.get(&filament).map_or(0, HashSet::len)
    }

    /// Initial load: every spool in the inventory counts as added.
    pub async fn load_inventory(&mut self, spools: &[Spool]) -> Result<()> {
        info!("Loading {} spools", spools.len());
        for spool in spools {
            self.spool_added(spool).await?;
        }
        Ok(())
    }

    pub async fn dispatch(&mut self, inbound: Inbound) -> Result<()> {
        match inbound {
            Inbound::Spool(event) => self.on_spool_event(event).await,
            Inbound::Filament(event) => self.on_filament_event(event).await,
        }
    }

    /// Consume the queue until every producer is gone. Per-event errors are
    /// logged and skipped; fatal ones (missing default template, bad suffix)
    /// end the loop.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Inbound>) -> Result<Self> {
        info!("Waiting for updates...");
        while let Some(inbound) = rx.recv().await {
            if let Err(e) = self.dispatch(inbound).await {
                if e.is_fatal() {
                    return Err(e);
                }
                error!("Failed to apply update: {}", e);
            }
        }
        info!("Update queue closed");
        Ok(self)
    }

    async fn on_spool_event(&mut self, event: Event<Spool>) -> Result<()> {
        match event {
            Event::Added(spool) => self.spool_added(&spool).await,
            Event::Updated(spool) => self.spool_updated(&spool).await,
            Event::Deleted(spool) => self.spool_deleted(&spool).await,
            Event::Unknown { kind } => {
                warn!("Got unknown spool update msg: {}", kind);
                Ok(())
            }
        }
    }

    async fn on_filament_event(&mut self, event: Event<Filament>) -> Result<()> {
        match event {
            Event::Updated(filament) => {
                if !self.engine.is_tracked(filament.id) {
                    debug!("Ignoring update of unused {}", filament.label());
                    return Ok(());
                }
                self.refresh(&filament);
                self.engine.reconcile_all(&filament).await
            }
            // Usage comes from spool events only.
            Event::Added(filament) => {
                debug!("Ignoring new {}", filament.label());
                Ok(())
            }
            Event::Deleted(filament) => {
                debug!("Ignoring deletion of {}", filament.label());
                Ok(())
            }
            Event::Unknown { kind } => {
                warn!("Got unknown filament update msg: {}", kind);
                Ok(())
            }
        }
    }

    async fn spool_added(&mut self, spool: &Spool) -> Result<()> {
        self.leave_previous_filament(spool).await?;
        self.track(spool);
        self.engine.materialize_all(&spool.filament).await
    }

    async fn spool_updated(&mut self, spool: &Spool) -> Result<()> {
        let moved = self.leave_previous_filament(spool).await?;
        self.track(spool);
        if moved {
            self.engine.materialize_all(&spool.filament).await
        } else {
            self.engine.reconcile_all(&spool.filament).await
        }
    }

    /// Drop the usage of a spool that now points at a different filament,
    /// retiring the old filament once nothing uses it. True if it moved.
    async fn leave_previous_filament(&mut self, spool: &Spool) -> Result<bool> {
        let Some(old) = self
            .spools
            .get(&spool.id)
            .filter(|f| f.id != spool.filament.id)
            .cloned()
        else {
            return Ok(false);
        };
        info!(
            "Spool {} moved from {} to {}",
            spool.id,
            old.label(),
            spool.filament.label()
        );
        if self.untrack(spool.id, old.id) {
            self.engine.retire_all(&old).await?;
        }
        Ok(true)
    }

    async fn spool_deleted(&mut self, spool: &Spool) -> Result<()> {
        let filament = self
            .spools
            .get(&spool.id)
            .cloned()
            .unwrap_or_else(|| spool.filament.clone());
        if self.untrack(spool.id, filament.id) {
            self.engine.retire_all(&filament).await
        } else {
            debug!(
                "{} still used by {} spool(s)",
                filament.label(),
                self.usage(filament.id)
            );
            Ok(())
        }
    }

    fn track(&mut self, spool: &Spool) {
        self.spools.insert(spool.id, spool.filament.clone());
        self.users
            .entry(spool.filament.id)
            .or_default()
            .insert(spool.id);
    }

    /// Forget that `spool` uses `filament`. True when nothing uses it anymore.
    fn untrack(&mut self, spool: SpoolId, filament: FilamentId) -> bool {
        self.spools.remove(&spool);
        let Some(users) = self.users.get_mut(&filament) else {
            return true;
        };
        users.remove(&spool);
        if users.is_empty() {
            self.users.remove(&filament);
            true
        } else {
            false
        }
    }

    fn refresh(&mut self, filament: &Filament) {
        if let Some(users) = self.users.get(&filament.id) {
            for spool in users {
                self.spools.insert(*spool, filament.clone());
            }
        }
    }
}
