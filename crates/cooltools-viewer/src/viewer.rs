// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Viewer model — an ordered list of layers plus the current selection.
//
// `Viewer` is a cheap handle around shared state so workers can add their
// results from another thread. The lock is only held for lookups and
// mutations, never while an operation computes.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{ImageData, Layer, LayerId, ToolsConfig};
use tracing::{debug, info};

use crate::notify::Notifications;

#[derive(Debug, Default)]
struct ViewerState {
    layers: Vec<Layer>,
    selection: BTreeSet<LayerId>,
}

impl ViewerState {
    fn position(&self, id: LayerId) -> Result<usize> {
        self.layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| CoolToolsError::LayerNotFound(id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Viewer {
    state: Arc<Mutex<ViewerState>>,
    notifications: Notifications,
    config: ToolsConfig,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(ToolsConfig::default())
    }
}

impl Viewer {
    pub fn new(config: ToolsConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewerState::default())),
            notifications: Notifications::new(config.notifications),
            config,
        }
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    fn lock(&self) -> MutexGuard<'_, ViewerState> {
        self.state.lock().expect("viewer lock poisoned")
    }

    // -- Layers ---------------------------------------------------------------

    /// Append a layer on top of the stack and return its id.
    pub fn add_layer(&self, layer: Layer) -> LayerId {
        let id = layer.id;
        info!(layer = %layer.name, shape = ?layer.data.shape(), "layer added");
        self.lock().layers.push(layer);
        id
    }

    /// Copy of the layer with `id`.
    pub fn layer(&self, id: LayerId) -> Result<Layer> {
        let state = self.lock();
        let index = state.position(id)?;
        Ok(state.layers[index].clone())
    }

    /// Copy of the topmost layer called `name`.
    pub fn layer_by_name(&self, name: &str) -> Result<Layer> {
        self.lock()
            .layers
            .iter()
            .rev()
            .find(|layer| layer.name == name)
            .cloned()
            .ok_or_else(|| CoolToolsError::LayerNotFound(name.to_string()))
    }

    /// Snapshot of every layer, bottom first.
    pub fn layers(&self) -> Vec<Layer> {
        self.lock().layers.clone()
    }

    pub fn rename_layer(&self, id: LayerId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let mut state = self.lock();
        let index = state.position(id)?;
        debug!(from = %state.layers[index].name, to = %name, "layer renamed");
        state.layers[index].name = name;
        Ok(())
    }

    /// Replace a layer's buffer in place.
    pub fn set_layer_data(&self, id: LayerId, data: ImageData) -> Result<()> {
        let mut state = self.lock();
        let index = state.position(id)?;
        debug!(layer = %state.layers[index].name, shape = ?data.shape(), "layer data replaced");
        state.layers[index].data = data;
        Ok(())
    }

    pub fn remove_layer(&self, id: LayerId) -> Result<Layer> {
        let mut state = self.lock();
        let index = state.position(id)?;
        state.selection.remove(&id);
        Ok(state.layers.remove(index))
    }

    pub fn len(&self) -> usize {
        self.lock().layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().layers.is_empty()
    }

    // -- Selection ------------------------------------------------------------

    pub fn select(&self, id: LayerId) -> Result<()> {
        let mut state = self.lock();
        state.position(id)?;
        state.selection.insert(id);
        Ok(())
    }

    pub fn deselect(&self, id: LayerId) {
        self.lock().selection.remove(&id);
    }

    pub fn clear_selection(&self) {
        self.lock().selection.clear();
    }

    /// Ids of the selected layers, in layer order.
    pub fn selected(&self) -> Vec<LayerId> {
        let state = self.lock();
        state
            .layers
            .iter()
            .map(|layer| layer.id)
            .filter(|id| state.selection.contains(id))
            .collect()
    }
}
