//! # Cycle State
//!
//! The transient state machine value owned by the generation cycle
//! controller. All flags that together describe "where are we in the
//! reasoning/response hand-off" live in one struct so they can only be
//! changed together, under one lock.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a profile swap goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    ToReasoning,
    ToResponse,
}

impl SwapDirection {
    /// Phase held while the swap is in flight
    pub fn in_flight_phase(self) -> SwapPhase {
        match self {
            SwapDirection::ToReasoning => SwapPhase::SwappingToReasoning,
            SwapDirection::ToResponse => SwapPhase::SwappingToResponse,
        }
    }

    /// Phase reached once the swap is confirmed
    pub fn settled_phase(self) -> SwapPhase {
        match self {
            SwapDirection::ToReasoning => SwapPhase::ReasoningActive,
            SwapDirection::ToResponse => SwapPhase::Idle,
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::ToReasoning => f.write_str("to_reasoning"),
            SwapDirection::ToResponse => f.write_str("to_response"),
        }
    }
}

/// Profile swap phase; exactly one holds at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwapPhase {
    #[default]
    Idle,
    SwappingToReasoning,
    ReasoningActive,
    SwappingToResponse,
}

impl SwapPhase {
    pub fn is_swapping(self) -> bool {
        matches!(
            self,
            SwapPhase::SwappingToReasoning | SwapPhase::SwappingToResponse
        )
    }

    /// Reasoning stays marked active until a revert is confirmed.
    pub fn is_reasoning_active(self) -> bool {
        matches!(
            self,
            SwapPhase::ReasoningActive | SwapPhase::SwappingToResponse
        )
    }
}

/// Generation cycle state machine value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    pub phase: SwapPhase,
    /// From generation start until the whole turn (including auto-continue) ends
    pub mid_generation_cycle: bool,
    /// Only during the auto-continue sub-step of a cycle
    pub auto_continuing: bool,
    /// Captured when a swap to reasoning begins; the revert target
    pub saved_response_profile: Option<String>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_profile_swapping(&self) -> bool {
        self.phase.is_swapping()
    }

    pub fn is_reasoning_active(&self) -> bool {
        self.phase.is_reasoning_active()
    }

    /// Nothing in flight and no cycle open
    pub fn is_idle(&self) -> bool {
        self.phase == SwapPhase::Idle && !self.mid_generation_cycle && !self.auto_continuing
    }

    /// Latch the in-flight phase for `direction`.
    ///
    /// Returns the phase to restore if the swap fails, or the in-flight
    /// phase that blocked the request.
    pub fn begin_swap(&mut self, direction: SwapDirection) -> Result<SwapPhase, SwapPhase> {
        if self.phase.is_swapping() {
            return Err(self.phase);
        }
        let previous = self.phase;
        self.phase = direction.in_flight_phase();
        Ok(previous)
    }

    /// Mark a confirmed swap
    pub fn complete_swap(&mut self, direction: SwapDirection) {
        self.phase = direction.settled_phase();
        if direction == SwapDirection::ToResponse {
            self.saved_response_profile = None;
        }
    }

    /// Roll back to the phase held before a failed swap
    pub fn abort_swap(&mut self, previous: SwapPhase) {
        self.phase = previous;
    }

    /// Close the current generation cycle
    pub fn finish_cycle(&mut self) {
        self.mid_generation_cycle = false;
        self.auto_continuing = false;
    }

    /// Back to the load-time state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Cross-flag invariants of the state machine
    pub fn is_consistent(&self) -> bool {
        let auto_implies_mid = !self.auto_continuing || self.mid_generation_cycle;
        let active_has_target =
            self.phase != SwapPhase::ReasoningActive || self.saved_response_profile.is_some();
        auto_implies_mid && active_has_target
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phase={:?} mid_cycle={} auto_continuing={} saved_response={}",
            self.phase,
            self.mid_generation_cycle,
            self.auto_continuing,
            self.saved_response_profile.as_deref().unwrap_or("-")
        )
    }
}
