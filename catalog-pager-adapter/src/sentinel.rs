use crate::{ObservationId, SentinelObserver};

/// Where the sentinel sits relative to the scroll container, in pixels along the main axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SentinelGeometry {
    /// Offset of the sentinel from the start of the scrollable content.
    pub sentinel_offset: u64,
    pub scroll_offset: u64,
    pub viewport: u32,
}

/// Whether the sentinel lies within the viewport grown by `margin_px` on both ends.
pub fn sentinel_in_range(geometry: SentinelGeometry, margin_px: u32) -> bool {
    let margin = u64::from(margin_px);
    let top = geometry.scroll_offset.saturating_sub(margin);
    let bottom = geometry
        .scroll_offset
        .saturating_add(u64::from(geometry.viewport))
        .saturating_add(margin);
    (top..=bottom).contains(&geometry.sentinel_offset)
}

/// An observer event: the sentinel entered or left the margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntersectionEvent {
    pub observation: ObservationId,
    pub is_intersecting: bool,
}

/// A [`SentinelObserver`] for adapters that know their scroll geometry but have no native
/// intersection observer (TUIs, immediate-mode GUIs).
///
/// Feed it the current geometry on every scroll/resize with [`Self::update`]; it reports an
/// event the first time after each `observe` and whenever the intersecting state flips.
#[derive(Clone, Debug, Default)]
pub struct GeometryObserver {
    next_id: u64,
    active: Option<(ObservationId, u32)>,
    last: Option<bool>,
}

impl GeometryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ObservationId> {
        self.active.map(|(id, _)| id)
    }

    pub fn update(&mut self, geometry: SentinelGeometry) -> Option<IntersectionEvent> {
        let (observation, margin) = self.active?;
        let is_intersecting = sentinel_in_range(geometry, margin);
        if self.last == Some(is_intersecting) {
            return None;
        }
        self.last = Some(is_intersecting);
        atrace!(observation = observation.0, is_intersecting, "sentinel intersection");
        Some(IntersectionEvent {
            observation,
            is_intersecting,
        })
    }
}

impl SentinelObserver for GeometryObserver {
    fn observe(&mut self, root_margin_px: u32) -> ObservationId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = ObservationId(self.next_id);
        self.active = Some((id, root_margin_px));
        self.last = None;
        id
    }

    fn unobserve(&mut self, id: ObservationId) {
        if self.active().is_some_and(|active| active == id) {
            self.active = None;
            self.last = None;
        }
    }
}
