//! Trace aggregation: folds the three independently-arriving event kinds
//! into an ordered sequence of steps.
//!
//! The channel gives no cross-kind ordering guarantee (a thought for
//! iteration 3 may arrive after an action for iteration 4), and no kind is
//! guaranteed to arrive in iteration order. Ingestion is therefore a plain
//! append, and `materialize` is a pure recomputation over the three
//! sequences.

use serde_json::Value;

use crate::api::types::{Action, Observation, Thought};

/// The reconstructed view of one iteration of the agent loop.
///
/// Partial steps are valid: any of the three records may still be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub iteration: u32,
    pub thought: Option<Thought>,
    pub action: Option<Action>,
    pub observation: Option<Observation>,
}

impl Step {
    /// A step is complete once all three records are present.
    pub fn is_complete(&self) -> bool {
        self.thought.is_some() && self.action.is_some() && self.observation.is_some()
    }
}

/// Builds steps from the three kind-homogeneous sequences.
///
/// Step count is the maximum of the three sequence lengths (by count, not by
/// max iteration value - this mirrors the deployed producer, which emits
/// contiguous zero-based iterations). Step `i` picks the record of each kind
/// whose `iteration` field equals `i`, if any.
pub fn materialize_steps(
    thoughts: &[Thought],
    actions: &[Action],
    observations: &[Observation],
) -> Vec<Step> {
    let count = thoughts.len().max(actions.len()).max(observations.len());
    (0..count as u32)
        .map(|i| Step {
            iteration: i,
            thought: thoughts.iter().find(|t| t.iteration == i).cloned(),
            action: actions.iter().find(|a| a.iteration == i).cloned(),
            observation: observations.iter().find(|o| o.iteration == i).cloned(),
        })
        .collect()
}

/// Append-only store for the current query's streamed events.
#[derive(Debug, Default)]
pub struct TraceAggregator {
    thoughts: Vec<Thought>,
    actions: Vec<Action>,
    observations: Vec<Observation>,
}

impl TraceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) append; iteration gaps and out-of-order arrival are tolerated.
    pub fn push_thought(&mut self, thought: Thought) {
        self.thoughts.push(thought);
    }

    pub fn push_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn push_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Recomputes the ordered step sequence from scratch.
    ///
    /// Pure function of the ingested events: safe to call after every push,
    /// idempotent, no hidden counters.
    pub fn materialize(&self) -> Vec<Step> {
        materialize_steps(&self.thoughts, &self.actions, &self.observations)
    }

    /// Clears all three sequences. Called when a new query begins or when the
    /// authoritative response supersedes partial state.
    pub fn reset(&mut self) {
        self.thoughts.clear();
        self.actions.clear();
        self.observations.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.thoughts.is_empty() && self.actions.is_empty() && self.observations.is_empty()
    }

    pub fn thoughts(&self) -> &[Thought] {
        &self.thoughts
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The three partial arrays as JSON, for the raw data view.
    pub fn as_raw_json(&self) -> Value {
        serde_json::json!({
            "thoughts": self.thoughts,
            "actions": self.actions,
            "observations": self.observations,
        })
    }
}
