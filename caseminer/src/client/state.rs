//! The retry/fallback policy as a pure state machine.
//!
//! The escalation rules live here, away from any I/O, so they can be
//! exercised exhaustively without a network. The client feeds each HTTP
//! outcome in as a [`CallEvent`] and performs whatever [`CallAction`] comes
//! back.

/// Where a call currently stands: which model in the priority list is being
/// tried, and how many attempts it has consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallState {
    /// Index into the fallback model priority list.
    pub model_index: usize,
    /// Attempts consumed on the current model.
    pub attempt: u32,
}

impl CallState {
    /// The initial state: first model, no attempts spent.
    #[inline]
    pub const fn start() -> Self {
        Self {
            model_index: 0,
            attempt: 0,
        }
    }
}

/// The outcome of one HTTP round trip, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// HTTP 200 with a body.
    Success,
    /// HTTP 429.
    RateLimited,
    /// Connection error or read timeout.
    TransientFailure,
    /// The provider rejected this model: context length exceeded, model not
    /// found, or model otherwise unavailable.
    ModelRejected,
    /// Any other failed response.
    RequestFailed,
}

/// What the client must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    /// The response is in hand; stop.
    Done,
    /// Sleep the fixed retry delay, then retry the same model.
    RetryAfterDelay,
    /// Advance to the next untried model; the attempt counter has been
    /// reset.
    SwitchModel,
    /// The fallback list is exhausted; the call yields nothing.
    GiveUp,
}

/// Advances the policy by one observed event.
///
/// Rate limits, transient failures, and unclassified request failures all
/// consume the retry budget before escalating to a model switch. A model
/// rejection escalates immediately: retrying the same model cannot
/// succeed when the prompt does not fit its context or the model does not
/// exist.
pub fn step(
    state: CallState,
    event: CallEvent,
    max_attempts: u32,
    model_count: usize,
) -> (CallState, CallAction) {
    match event {
        CallEvent::Success => (state, CallAction::Done),
        CallEvent::ModelRejected => advance_model(state, model_count),
        CallEvent::RateLimited | CallEvent::TransientFailure | CallEvent::RequestFailed => {
            let next_attempt = state.attempt + 1;
            if next_attempt < max_attempts {
                (
                    CallState {
                        model_index: state.model_index,
                        attempt: next_attempt,
                    },
                    CallAction::RetryAfterDelay,
                )
            } else {
                advance_model(state, model_count)
            }
        }
    }
}

fn advance_model(state: CallState, model_count: usize) -> (CallState, CallAction) {
    let next_index = state.model_index + 1;
    if next_index < model_count {
        (
            CallState {
                model_index: next_index,
                attempt: 0,
            },
            CallAction::SwitchModel,
        )
    } else {
        (state, CallAction::GiveUp)
    }
}
