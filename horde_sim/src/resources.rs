use bevy::prelude::*;

use crate::horde_map::HordeNode;

/// Tracks total simulation ticks elapsed.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTick(pub u64);

/// Horde entities that walked off the local overmap and await hand-off.
#[derive(Resource, Default, Debug)]
pub struct HordeMigrationQueue {
    nodes: Vec<HordeNode>,
}

impl HordeMigrationQueue {
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = HordeNode>) {
        self.nodes.extend(nodes);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HordeNode> {
        self.nodes.iter()
    }

    /// Takes every queued node, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<HordeNode> {
        std::mem::take(&mut self.nodes)
    }
}
