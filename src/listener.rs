use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::event::Event;

/// Errors a listener callback can hand back to the dispatcher
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("{0}")]
    Message(String),

    /// The registered callback expects a different event payload than the
    /// one being dispatched under this name. Only reachable when two event
    /// kinds override [`Event::name`] to the same string.
    #[error("listener expects a different event payload")]
    PayloadMismatch,

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Create an error from a plain message
    pub fn message(msg: impl Into<String>) -> Self {
        ListenerError::Message(msg.into())
    }
}

/// What a listener decided about the event's default behavior.
///
/// `Continue` is the implicit result of a listener returning `()`;
/// `PreventDefault` marks the event so the trigger caller skips its
/// follow-up behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    PreventDefault,
}

/// Conversion from whatever a listener closure returns into the
/// dispatcher's [`Outcome`].
///
/// Implemented for `()`, [`Outcome`] and their `Result` forms, so a
/// listener can be a plain `Fn(&mut E)` closure, explicitly signal
/// [`Outcome::PreventDefault`], or fail with a [`ListenerError`].
/// Deliberately not implemented for `bool`: "returned false" and "returned
/// nothing" must stay distinguishable.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, ListenerError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Outcome, ListenerError> {
        Ok(Outcome::Continue)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, ListenerError> {
        Ok(self)
    }
}

impl IntoOutcome for Result<(), ListenerError> {
    fn into_outcome(self) -> Result<Outcome, ListenerError> {
        self.map(|()| Outcome::Continue)
    }
}

impl IntoOutcome for Result<Outcome, ListenerError> {
    fn into_outcome(self) -> Result<Outcome, ListenerError> {
        self
    }
}

type Callback<E> = Arc<dyn Fn(&mut E) -> Result<Outcome, ListenerError> + Send + Sync>;

/// Type-erased listener callback, as stored in the dispatcher registry
pub type RegisteredCallback =
    Arc<dyn Fn(&mut dyn Any) -> Result<Outcome, ListenerError> + Send + Sync>;

/// A registerable callback for events of kind `E`.
///
/// A `Listener` is a cheap handle over a shared callback: clones refer to
/// the same underlying callback, which is also what unsubscription matches
/// on. Two listeners built from identical code by separate
/// [`Listener::new`] calls are distinct callbacks.
pub struct Listener<E: Event> {
    callback: Callback<E>,
    label: Arc<str>,
}

impl<E: Event> Listener<E> {
    /// Wraps a closure, labeling it with the closure's type path for log
    /// output.
    pub fn new<F, R>(callback: F) -> Self
    where
        F: Fn(&mut E) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self::named(any::type_name::<F>(), callback)
    }

    /// Wraps a closure with an explicit human-readable label
    pub fn named<F, R>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut E) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        Self {
            callback: Arc::new(move |event| callback(event).into_outcome()),
            label: label.into().into(),
        }
    }

    /// Human-readable identifier used in dispatch logs and errors
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Identity of the underlying callback; clones of one listener share it
    pub(crate) fn token(&self) -> usize {
        Arc::as_ptr(&self.callback) as *const () as usize
    }

    pub(crate) fn label_arc(&self) -> Arc<str> {
        Arc::clone(&self.label)
    }

    /// Erases the payload type so the callback can live in the registry
    /// next to listeners for other kinds. The wrapper downcasts back to
    /// `E` at dispatch time.
    pub(crate) fn erased(&self) -> RegisteredCallback {
        let callback = Arc::clone(&self.callback);
        Arc::new(move |event: &mut dyn Any| match event.downcast_mut::<E>() {
            Some(event) => callback(event),
            None => Err(ListenerError::PayloadMismatch),
        })
    }
}

impl<E: Event> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            label: Arc::clone(&self.label),
        }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("label", &self.label)
            .finish()
    }
}
