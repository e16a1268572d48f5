use std::any::Any;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::event::Event;
use crate::listener::{Listener, ListenerError, Outcome, RegisteredCallback};

/// Errors surfaced by [`Dispatcher::trigger`]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener failed mid-dispatch. The remaining listeners for this
    /// trigger were not invoked.
    #[error("listener #{index} \"{listener}\" failed while handling \"{name}\": {source}")]
    Listener {
        name: &'static str,
        index: usize,
        listener: String,
        #[source]
        source: ListenerError,
    },
}

/// One registry entry: an erased callback plus its ordering key
#[derive(Clone)]
struct Registration {
    callback: RegisteredCallback,
    priority: i32,
    token: usize,
    label: Arc<str>,
}

/// Read view of one registry entry, as handed out by
/// [`Dispatcher::listeners`]
#[derive(Clone)]
pub struct RegistrationView {
    pub callback: RegisteredCallback,
    pub priority: i32,
    pub label: Arc<str>,
}

impl fmt::Debug for RegistrationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationView")
            .field("label", &self.label)
            .field("priority", &self.priority)
            .finish()
    }
}

type Registry = HashMap<String, Vec<Registration>>;

/// Synchronous publish/subscribe dispatcher.
///
/// The dispatcher owns a registry mapping event names to prioritized
/// listener lists. Triggering an event invokes the listeners registered
/// under the event kind's name, on the caller's stack, highest priority
/// first. Any listener can stop propagation or prevent the event's default
/// follow-up behavior.
///
/// Cloning a `Dispatcher` is cheap and shares the registry, which is how a
/// listener gets a handle to unsubscribe itself or subscribe others.
/// Independently constructed dispatchers are fully independent.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<RwLock<Registry>>,
}

// Manual impl: the erased callbacks are not Debug, so show the registered
// names with their listener counts
impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        let listeners: HashMap<&str, usize> = registry
            .iter()
            .map(|(name, registrations)| (name.as_str(), registrations.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("listeners", &listeners)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for events of kind `E` at the default
    /// priority of 0.
    pub fn subscribe<E: Event>(&self, listener: &Listener<E>) {
        self.subscribe_with_priority(listener, 0);
    }

    /// Registers a listener for events of kind `E`.
    ///
    /// The higher the priority, the sooner the listener runs. Listeners
    /// sharing a priority run in registration order. The same listener may
    /// be registered more than once and will run once per registration.
    pub fn subscribe_with_priority<E: Event>(&self, listener: &Listener<E>, priority: i32) {
        let name = E::name();
        let mut registry = self.registry.write();
        let registrations = registry.entry(name.to_string()).or_default();
        registrations.push(Registration {
            callback: listener.erased(),
            priority,
            token: listener.token(),
            label: listener.label_arc(),
        });
        // Sort right after adding so trigger iterates as-is. sort_by_key is
        // stable: equal priorities keep registration order.
        registrations.sort_by_key(|registration| Reverse(registration.priority));

        debug!(
            name,
            priority,
            listener = listener.label(),
            "Subscribed listener"
        );
    }

    /// Removes the first registration for `E` whose callback is the same
    /// shared callback as `listener` (a clone of it, or the original).
    ///
    /// Unknown event names and unmatched callbacks are no-ops. Other
    /// registrations under the same name, including further registrations
    /// of the same callback, are left in place.
    pub fn unsubscribe<E: Event>(&self, listener: &Listener<E>) {
        let name = E::name();
        let mut registry = self.registry.write();
        let Some(registrations) = registry.get_mut(name) else {
            return;
        };
        let Some(position) = registrations
            .iter()
            .position(|registration| registration.token == listener.token())
        else {
            return;
        };
        registrations.remove(position);

        debug!(name, listener = listener.label(), "Unsubscribed listener");
    }

    /// Triggers `event`, invoking its listeners in priority order.
    ///
    /// Returns `Ok(true)` when the caller should continue with the event's
    /// default behavior and `Ok(false)` when a listener prevented it:
    ///
    /// ```
    /// # use crier::{Dispatcher, DispatchError, Event, EventState};
    /// # #[derive(Default)]
    /// # struct PageSaved { state: EventState }
    /// # impl Event for PageSaved {
    /// #     fn state(&self) -> &EventState { &self.state }
    /// #     fn state_mut(&mut self) -> &mut EventState { &mut self.state }
    /// # }
    /// # fn save() -> Result<(), DispatchError> {
    /// # let dispatcher = Dispatcher::new();
    /// if !dispatcher.trigger(&mut PageSaved::default())? {
    ///     // a listener prevented the default follow-up
    ///     return Ok(());
    /// }
    /// // continue with default behavior
    /// # Ok(())
    /// # }
    /// # save().unwrap();
    /// ```
    ///
    /// Listeners run one after another on the caller's stack, over a
    /// snapshot of the registrations taken when the call starts:
    /// subscribing or unsubscribing from inside a listener only affects
    /// later triggers. A listener returning
    /// [`Outcome::PreventDefault`](crate::Outcome::PreventDefault) marks
    /// the event default-prevented; a listener stopping propagation ends
    /// the dispatch before the remaining listeners run; a listener error
    /// aborts the remaining listeners and is returned with its dispatch
    /// position attached.
    pub fn trigger<E: Event>(&self, event: &mut E) -> Result<bool, DispatchError> {
        let name = E::name();
        let snapshot = self.snapshot(name);

        info!(name, count = snapshot.len(), "Triggered event");

        for (i, registration) in snapshot.iter().enumerate() {
            let outcome =
                (registration.callback)(&mut *event as &mut dyn Any).map_err(|source| {
                    DispatchError::Listener {
                        name,
                        index: i,
                        listener: registration.label.to_string(),
                        source,
                    }
                })?;

            if outcome == Outcome::PreventDefault {
                event.prevent_default();
                info!(name, i, listener = %registration.label, "Default prevented");
            }

            if event.is_propagation_stopped() {
                info!(name, i, listener = %registration.label, "Propagation stopped");
                break;
            }
        }

        Ok(!event.is_default_prevented())
    }

    /// Copies out the registrations for `name`, creating the empty entry
    /// if this is the first time the name is seen
    fn snapshot(&self, name: &'static str) -> Vec<Registration> {
        let registry = self.registry.read();
        if let Some(registrations) = registry.get(name) {
            return registrations.clone();
        }
        drop(registry);

        self.registry
            .write()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// A copy of the whole name -> registrations registry, in current
    /// priority order per name, with each entry's callback, priority and
    /// label. Mutating the copy does not touch the dispatcher.
    pub fn listeners(&self) -> HashMap<String, Vec<RegistrationView>> {
        self.registry
            .read()
            .iter()
            .map(|(name, registrations)| {
                (
                    name.clone(),
                    registrations
                        .iter()
                        .map(|registration| RegistrationView {
                            callback: Arc::clone(&registration.callback),
                            priority: registration.priority,
                            label: Arc::clone(&registration.label),
                        })
                        .collect(),
                )
            })
            .collect()
    }

    /// Callbacks registered under `name`, in current priority order.
    /// Empty for a name nothing has subscribed to.
    pub fn listeners_for_event(&self, name: &str) -> Vec<RegisteredCallback> {
        self.registry
            .read()
            .get(name)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| Arc::clone(&registration.callback))
                    .collect()
            })
            .unwrap_or_default()
    }
}
