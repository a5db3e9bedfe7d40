//! The map session: one layer store, one map handle, one render loop.
//!
//! Every mutation is followed by a full render pass. Render passes emit
//! `LayerRendered`, which is what fires a pending auto-zoom.

use catalog::{Query, RecordStore, SortOrder};
use foundation::color::Color;
use foundation::time::Timestamp;
use formats::{ExportFile, FieldSelection, FileFormat, export_file, parse_file};
use layers::query::{FeatureFilter, visible_features};
use layers::system::{COMPANIES_LAYER_ID, system_layers};
use layers::{Layer, LayerId, LayerStore, LayerSummary};
use runtime::{Event, EventBus, EventKind, FrameCounter};
use scene::picking::{PickOptions, pick_screen};
use scene::{
    ClickButton, DrawList, FeatureRef, InteractionState, MapCamera, MapHandle, MapView, MenuAction,
    ViewportController, render,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ViewerSettings;
use crate::error::ViewerError;

pub const PROCESSES_COLLECTION: &str = "license_processes";
pub const COMPANIES_COLLECTION: &str = COMPANIES_LAYER_ID;

/// Events kept on the bus between render passes.
pub const EVENT_HISTORY: usize = 256;

pub struct GeoViewer<M: MapHandle = MapView> {
    settings: ViewerSettings,
    store: LayerStore,
    map: M,
    viewport: ViewportController,
    bus: EventBus,
    frames: FrameCounter,
    interaction: InteractionState,
    filter: FeatureFilter,
    pick: PickOptions,
    draw: DrawList,
}

impl GeoViewer<MapView> {
    pub fn new(settings: ViewerSettings) -> Self {
        let map = MapView::new(settings.initial_camera(), settings.viewport_px());
        Self::with_map(settings, map)
    }
}

impl<M: MapHandle> GeoViewer<M> {
    pub fn with_map(settings: ViewerSettings, map: M) -> Self {
        let viewport = ViewportController::new(
            settings.layer_fit,
            settings.feature_fit,
            settings.point_fit_half_extent_deg,
        );
        let pick = PickOptions {
            marker_radius_px: settings.marker_hit_radius_px,
        };
        let mut viewer = Self {
            settings,
            store: LayerStore::new(),
            map,
            viewport,
            bus: EventBus::new(),
            frames: FrameCounter::new(),
            interaction: InteractionState::new(),
            filter: FeatureFilter::all(),
            pick,
            draw: DrawList::default(),
        };
        viewer.render();
        viewer
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn layers(&self) -> &[Layer] {
        self.store.layers()
    }

    pub fn summaries(&self) -> Vec<LayerSummary> {
        self.store.summaries()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn camera(&self) -> MapCamera {
        self.map.camera()
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn events(&self) -> &[Event] {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.bus.drain()
    }

    /// Parses an uploaded file into a new top layer and arms auto-zoom.
    ///
    /// Nothing is created when the file fails to parse or yields no features.
    pub fn import_file(
        &mut self,
        file_name: &str,
        raw: &str,
        uploaded_at: Timestamp,
    ) -> Result<LayerId, ViewerError> {
        let frame = self.frames.last().unwrap_or_default();
        let features = match parse_file(file_name, raw) {
            Ok(features) => features,
            Err(e) => {
                warn!(file = file_name, error = %e, "import failed");
                self.bus
                    .emit(frame, EventKind::ImportFailed, None, format!("{file_name}: {e}"));
                return Err(e.into());
            }
        };
        let id = self.store.add_imported_layer(features, file_name, uploaded_at)?;
        self.bus
            .emit(frame, EventKind::LayerAdded, Some(id.as_str()), file_name);
        self.viewport.request_auto_zoom(id.clone());
        self.render();
        Ok(id)
    }

    /// Rebuilds system layers from host records.
    pub fn refresh_system_layers(&mut self, processes: &[Value], companies: &[Value]) {
        let defs = system_layers(processes, companies);
        info!(layers = defs.len(), "refreshing system layers");
        self.store.replace_system_layers(defs);
        self.interaction.retain_existing(&self.store);
        self.render();
    }

    /// Reads processes and companies through the persistence seam.
    pub fn load_system_layers(&mut self, records: &dyn RecordStore) -> Result<usize, ViewerError> {
        let processes = records.select(
            PROCESSES_COLLECTION,
            &Query::new()
                .embed(COMPANIES_COLLECTION, "company_id")
                .order("created_at", SortOrder::Desc),
        )?;
        let companies = records.select(COMPANIES_COLLECTION, &Query::new())?;
        let processes: Vec<Value> = processes.into_iter().map(Value::Object).collect();
        let companies: Vec<Value> = companies.into_iter().map(Value::Object).collect();
        self.refresh_system_layers(&processes, &companies);
        Ok(self
            .store
            .layers()
            .iter()
            .filter(|l| l.source == layers::LayerSource::System)
            .count())
    }

    pub fn toggle_visibility(&mut self, id: &LayerId) -> bool {
        let changed = self.store.toggle_visibility(id);
        self.after_change(changed, id)
    }

    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> bool {
        let changed = self.store.set_visibility(id, visible);
        self.after_change(changed, id)
    }

    pub fn set_color(&mut self, id: &LayerId, color: Color) -> bool {
        let changed = self.store.set_color(id, color);
        self.after_change(changed, id)
    }

    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> bool {
        let changed = self.store.set_opacity(id, opacity);
        self.after_change(changed, id)
    }

    pub fn reorder(&mut self, dragged: &LayerId, target: &LayerId) -> bool {
        let changed = self.store.reorder(dragged, target);
        self.after_change(changed, dragged)
    }

    /// Deletes an imported layer; system layers are refused.
    pub fn delete_layer(&mut self, id: &LayerId) -> Result<bool, ViewerError> {
        if !self.store.delete_layer(id)? {
            return Ok(false);
        }
        let frame = self.frames.last().unwrap_or_default();
        self.bus
            .emit(frame, EventKind::LayerRemoved, Some(id.as_str()), "deleted");
        if self.viewport.pending_auto_zoom() == Some(id) {
            self.viewport.cancel_auto_zoom();
        }
        self.interaction.retain_existing(&self.store);
        self.render();
        Ok(true)
    }

    pub fn zoom_to_layer(&mut self, id: &LayerId) -> Option<MapCamera> {
        let layer = self.store.get(id)?;
        let camera = self.viewport.zoom_to_layer(&mut self.map, layer)?;
        self.camera_moved(id.as_str());
        Some(camera)
    }

    pub fn zoom_to_feature(&mut self, target: &FeatureRef) -> Option<MapCamera> {
        let feature = self.store.get(&target.layer_id)?.feature(&target.feature_id)?;
        let camera = self.viewport.zoom_to_feature(&mut self.map, feature)?;
        self.camera_moved(&target.feature_id);
        Some(camera)
    }

    /// Sets the map search text; blank clears it.
    pub fn set_search(&mut self, text: &str) {
        let filter = FeatureFilter::name_contains(text);
        if filter != self.filter {
            self.filter = filter;
            self.render();
        }
    }

    /// Handles a click at viewport pixel `screen`; returns the hit, if any.
    pub fn click(&mut self, button: ClickButton, screen: [f64; 2]) -> Option<FeatureRef> {
        let hit = pick_screen(&self.draw, &self.map, screen, self.pick);
        self.interaction.click(button, screen, hit);
        hit.map(|item| FeatureRef::new(item.layer_id.clone(), item.feature_id.clone()))
    }

    /// Runs a context-menu action against the menu's target.
    pub fn choose_menu_action(&mut self, action: MenuAction) -> Option<MapCamera> {
        let (action, target) = self.interaction.choose(action)?;
        match action {
            MenuAction::ZoomToFeature => self.zoom_to_feature(&target),
            MenuAction::ShowFeatureInfo => None,
        }
    }

    /// Encodes the currently visible (and searched) features.
    pub fn export(
        &self,
        format: FileFormat,
        fields: &FieldSelection,
    ) -> Result<ExportFile, ViewerError> {
        let features = visible_features(&self.store, &self.filter).map(|v| v.feature);
        let file = export_file(features, format, fields)?;
        info!(file = %file.file_name, bytes = file.contents.len(), "export generated");
        Ok(file)
    }

    /// Full render pass followed by any armed auto-zoom.
    pub fn render(&mut self) -> &DrawList {
        self.bus.retain_latest(EVENT_HISTORY);
        let frame = self.frames.begin();
        let start = self.bus.events().len();
        self.draw = render(&self.store, &self.filter, frame, &mut self.bus);
        let zoomed = self
            .viewport
            .on_events(&mut self.map, &self.store, &self.bus.events()[start..]);
        if zoomed.is_some() {
            self.bus
                .emit(frame, EventKind::ViewportChanged, None, "auto-zoom");
        }
        &self.draw
    }

    fn after_change(&mut self, changed: bool, id: &LayerId) -> bool {
        if changed {
            let frame = self.frames.last().unwrap_or_default();
            self.bus
                .emit(frame, EventKind::LayerChanged, Some(id.as_str()), "");
            self.render();
        }
        changed
    }

    fn camera_moved(&mut self, subject: &str) {
        let frame = self.frames.last().unwrap_or_default();
        self.bus
            .emit(frame, EventKind::ViewportChanged, Some(subject), "");
    }
}
