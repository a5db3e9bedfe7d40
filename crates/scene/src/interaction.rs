//! Click handling for the map: one context menu, one info popup, one
//! feature-info panel at a time.

use layers::{LayerId, LayerStore};
use serde::Serialize;
use tracing::debug;

use crate::render::{DrawItem, Popup};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    ZoomToFeature,
    ShowFeatureInfo,
}

impl MenuAction {
    pub const ALL: [MenuAction; 2] = [MenuAction::ZoomToFeature, MenuAction::ShowFeatureInfo];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::ZoomToFeature => "Zoom to feature",
            MenuAction::ShowFeatureInfo => "Show feature info",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClickButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureRef {
    pub layer_id: LayerId,
    pub feature_id: String,
}

impl FeatureRef {
    pub fn new(layer_id: LayerId, feature_id: impl Into<String>) -> Self {
        Self {
            layer_id,
            feature_id: feature_id.into(),
        }
    }

    fn of(item: &DrawItem) -> Self {
        Self::new(item.layer_id.clone(), item.feature_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMenu {
    pub target: FeatureRef,
    pub screen: [f64; 2],
    pub actions: [MenuAction; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPopup {
    pub target: FeatureRef,
    pub popup: Popup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    menu: Option<ContextMenu>,
    popup: Option<OpenPopup>,
    info_panel: Option<FeatureRef>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn popup(&self) -> Option<&OpenPopup> {
        self.popup.as_ref()
    }

    pub fn info_panel(&self) -> Option<&FeatureRef> {
        self.info_panel.as_ref()
    }

    /// Applies a click; `hit` is the picked item under the cursor, if any.
    pub fn click(&mut self, button: ClickButton, screen: [f64; 2], hit: Option<&DrawItem>) {
        match (button, hit) {
            (ClickButton::Primary, Some(item)) => {
                self.menu = None;
                self.popup = Some(OpenPopup {
                    target: FeatureRef::of(item),
                    popup: item.popup.clone(),
                });
            }
            (ClickButton::Secondary, Some(item)) => {
                debug!(layer = %item.layer_id, feature = %item.feature_id, "context menu opened");
                self.menu = Some(ContextMenu {
                    target: FeatureRef::of(item),
                    screen,
                    actions: MenuAction::ALL,
                });
            }
            (_, None) => {
                self.menu = None;
            }
        }
    }

    /// Picks an entry of the open menu and closes it.
    pub fn choose(&mut self, action: MenuAction) -> Option<(MenuAction, FeatureRef)> {
        let menu = self.menu.take()?;
        if action == MenuAction::ShowFeatureInfo {
            self.info_panel = Some(menu.target.clone());
        }
        Some((action, menu.target))
    }

    pub fn dismiss_menu(&mut self) {
        self.menu = None;
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn close_info_panel(&mut self) {
        self.info_panel = None;
    }

    /// Drops anything pointing at a layer that no longer exists.
    pub fn retain_existing(&mut self, store: &LayerStore) {
        let alive = |r: &FeatureRef| store.get(&r.layer_id).is_some();
        if self.menu.as_ref().is_some_and(|m| !alive(&m.target)) {
            self.menu = None;
        }
        if self.popup.as_ref().is_some_and(|p| !alive(&p.target)) {
            self.popup = None;
        }
        if self.info_panel.as_ref().is_some_and(|r| !alive(r)) {
            self.info_panel = None;
        }
    }
}
