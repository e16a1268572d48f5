use std::any;

/// Propagation flags shared by every event kind.
///
/// Both flags start out `false` and are monotonic: once set they stay set
/// for the lifetime of the event instance.
#[derive(Debug, Default, Clone)]
pub struct EventState {
    propagation_stopped: bool,
    default_prevented: bool,
}

impl EventState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops any further propagation of the event. Idempotent.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Flags that the event's default follow-up behavior should be
    /// skipped. Idempotent.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A named, mutable signal passed through the dispatcher to listeners.
///
/// Concrete event kinds define their own payload fields and embed an
/// [`EventState`] for the propagation flags; the flag methods and the kind
/// name are provided on top of the two accessors:
///
/// ```
/// use crier::{Event, EventState};
///
/// struct PlayerJoined {
///     player: String,
///     state: EventState,
/// }
///
/// impl Event for PlayerJoined {
///     fn state(&self) -> &EventState {
///         &self.state
///     }
///
///     fn state_mut(&mut self) -> &mut EventState {
///         &mut self.state
///     }
/// }
/// ```
pub trait Event: 'static {
    /// Identifies the event *kind*, not the instance: every instance of
    /// the same kind reports the same name, and the dispatcher keys its
    /// registry by it. Defaults to the type's own path; override it when a
    /// hand-picked name is wanted.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        any::type_name::<Self>()
    }

    fn state(&self) -> &EventState;

    fn state_mut(&mut self) -> &mut EventState;

    /// Stops the further propagation of this event: no listener after the
    /// current one runs for the in-flight trigger.
    fn stop_propagation(&mut self) {
        self.state_mut().stop_propagation();
    }

    /// Prevents the default behavior of this event, making the trigger
    /// call return `false` to its caller.
    fn prevent_default(&mut self) {
        self.state_mut().prevent_default();
    }

    fn is_propagation_stopped(&self) -> bool {
        self.state().is_propagation_stopped()
    }

    fn is_default_prevented(&self) -> bool {
        self.state().is_default_prevented()
    }
}
