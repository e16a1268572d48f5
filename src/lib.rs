// Synchronous in-process event dispatching
//
// Producers trigger named events, consumers register prioritized listener
// callbacks against event names, and the dispatcher invokes matching
// listeners in priority order until the list is exhausted or a listener
// stops propagation.

// Public API - what host applications use
pub use dispatcher::{DispatchError, Dispatcher, RegistrationView};
pub use event::{Event, EventState};
pub use listener::{IntoOutcome, Listener, ListenerError, Outcome, RegisteredCallback};

// Internal modules
mod dispatcher;
mod event;
mod listener;
