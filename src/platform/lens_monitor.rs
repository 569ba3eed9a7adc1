//! Lens hot-plug detection.
//!
//! Diffs successive lens listings from the host and turns a change into the
//! `LensAvailabilityChanged` notification the session rebuilds its catalog on.

use super::PlatformEvent;
use crate::types::{LensDirection, LensSelector};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LensChange {
    Connected(LensSelector),
    Disconnected(LensSelector),
}

#[derive(Debug, Default)]
pub struct LensMonitor {
    active: HashMap<String, LensSelector>,
}

impl LensMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known lens set, returning what connected and disconnected.
    pub fn update(&mut self, lenses: Vec<LensSelector>) -> Vec<LensChange> {
        let mut changes = Vec::new();

        let new_ids: Vec<&str> = lenses.iter().map(|l| l.id.as_str()).collect();
        for (id, lens) in &self.active {
            if !new_ids.contains(&id.as_str()) {
                log::info!("Lens disconnected: {} ({})", id, lens.direction);
                changes.push(LensChange::Disconnected(lens.clone()));
            }
        }

        let mut next = HashMap::with_capacity(lenses.len());
        for lens in lenses {
            if !self.active.contains_key(&lens.id) {
                log::info!("Lens connected: {} ({})", lens.id, lens.direction);
                changes.push(LensChange::Connected(lens.clone()));
            }
            next.insert(lens.id.clone(), lens);
        }
        self.active = next;

        changes
    }

    /// Directions currently available, in catalog order.
    pub fn directions(&self) -> Vec<LensDirection> {
        let present: BTreeSet<LensDirection> =
            self.active.values().map(|l| l.direction).collect();
        LensDirection::ALL
            .into_iter()
            .filter(|d| present.contains(d))
            .collect()
    }

    /// Update and build the notification to deliver, if anything changed.
    pub fn poll(&mut self, lenses: Vec<LensSelector>) -> Option<PlatformEvent> {
        if self.update(lenses).is_empty() {
            None
        } else {
            Some(PlatformEvent::LensAvailabilityChanged(self.directions()))
        }
    }
}
