//! Identity slots and the state carried between frames.

use nalgebra::Point2;

/// Observation state of an identity slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// No detection has been assigned to the slot yet
    #[default]
    Unobserved,
    /// At least one detection has been assigned
    Observed,
}

/// A single stable identity.
#[derive(Debug, Clone)]
pub struct IdentitySlot {
    /// Identity label in `1..=num_objects`
    pub stable_id: u32,
    /// Current slot state
    pub state: SlotState,
    /// Most recent observed centroid, never an interpolated one
    pub last_known_position: Option<Point2<f64>>,
    /// Frame of the most recent observation
    pub last_observed_frame: Option<u64>,
    /// Number of frames in which the slot received a detection
    pub observations: u32,
}

impl IdentitySlot {
    pub fn new(stable_id: u32) -> Self {
        Self {
            stable_id,
            state: SlotState::Unobserved,
            last_known_position: None,
            last_observed_frame: None,
            observations: 0,
        }
    }

    pub fn is_observed(&self) -> bool {
        self.state == SlotState::Observed
    }

    /// Record an accepted match for `frame_id`.
    pub fn observe(&mut self, position: Point2<f64>, frame_id: u64) {
        self.last_known_position = Some(position);
        self.last_observed_frame = Some(frame_id);
        self.observations += 1;
        self.state = SlotState::Observed;
    }
}

/// State of every identity for one stabilization run.
///
/// Owned by the assignment loop and dropped once all frames are assigned.
#[derive(Debug, Clone)]
pub struct IdentityState {
    slots: Vec<IdentitySlot>,
}

impl IdentityState {
    /// Create `num_objects` unobserved slots labelled `1..=num_objects`.
    pub fn new(num_objects: u32) -> Self {
        Self {
            slots: (1..=num_objects).map(IdentitySlot::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[IdentitySlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&IdentitySlot> {
        self.slots.get(index)
    }

    pub fn any_observed(&self) -> bool {
        self.slots.iter().any(IdentitySlot::is_observed)
    }

    /// Indices of observed slots, ascending.
    pub fn observed_indices(&self) -> Vec<usize> {
        self.indices_where(true)
    }

    /// Indices of unobserved slots, ascending.
    pub fn unobserved_indices(&self) -> Vec<usize> {
        self.indices_where(false)
    }

    /// Last known positions of the given slots. Unobserved slots are skipped.
    pub fn positions(&self, indices: &[usize]) -> Vec<Point2<f64>> {
        indices
            .iter()
            .filter_map(|&i| self.slots[i].last_known_position)
            .collect()
    }

    pub fn record(&mut self, index: usize, position: Point2<f64>, frame_id: u64) {
        self.slots[index].observe(position, frame_id);
    }

    fn indices_where(&self, observed: bool) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| (s.is_observed() == observed).then_some(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_unobserved() {
        let state = IdentityState::new(3);
        assert_eq!(state.len(), 3);
        assert!(!state.any_observed());
        assert_eq!(state.unobserved_indices(), vec![0, 1, 2]);
        let ids: Vec<u32> = state.slots().iter().map(|s| s.stable_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_record_updates_slot() {
        let mut state = IdentityState::new(2);
        state.record(1, Point2::new(4.0, 5.0), 7);
        state.record(1, Point2::new(6.0, 5.0), 9);

        let slot = state.slot(1).unwrap();
        assert_eq!(slot.state, SlotState::Observed);
        assert_eq!(slot.last_known_position, Some(Point2::new(6.0, 5.0)));
        assert_eq!(slot.last_observed_frame, Some(9));
        assert_eq!(slot.observations, 2);
        assert_eq!(state.observed_indices(), vec![1]);
        assert_eq!(state.unobserved_indices(), vec![0]);
    }
}
