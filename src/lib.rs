//! The `coawait` crate lets a sequence of asynchronous steps be written as
//! one straight-line computation, while actually running across many turns
//! of an event loop.
//!
//! It has two halves:
//!
//!   * **Awaitables**: values that settle exactly once, either resolving with
//!     a `T` or failing with an `E`, and notify their observers when they do.
//!     `Resolution` is the general-purpose one a producer settles by hand;
//!     `Success` and `Failure` are born settled; `Coroutine` is driven by a
//!     computation.
//!   * **The coroutine driver**: `Coroutine` takes a suspendable computation
//!     that yields awaitables, and resumes it with each awaitable's outcome
//!     until it finishes.
//!
//! The core trait for awaitables looks like:
//!
//! ```rust
//! pub type Observer<T, E> = Box<dyn FnOnce(Result<T, E>)>;
//!
//! pub trait Awaitable<T, E> {
//!     fn when(&self, observer: Observer<T, E>);
//! }
//! ```
//!
//! and the computations are stackless, by-value coroutines:
//!
//! ```rust
//! pub enum Suspend<Y, R, N> {
//!     Yield(Y, N),
//!     Return(R),
//! }
//!
//! pub trait Coro<I, Y, R>: Sized {
//!     type Next: Coro<I, Y, R>;
//!     fn resume(self, input: I) -> Suspend<Y, R, Self::Next>;
//! }
//! ```
//!
//! A computation driven by a `Coroutine` has the shape
//! `Coro<Resumption<T, E>, Y, Result<T, E>>`. It is started with
//! `Resumption::Start`, suspends by yielding an awaitable, and is resumed with
//! `Resumption::Value` or `Resumption::Error` once that awaitable settles.
//! It finishes by returning `Ok` with the coroutine's value or `Err` with its
//! error.
//!
//! # Examples
//!
//! ## Waiting on two awaitables
//!
//! Here is a computation, written as a hand-rolled state machine, that waits
//! for a user id and then for that user's name:
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::rc::Rc;
//!
//! use coawait::{
//!     Awaitable, Coro, Coroutine, EventLoop, Failure, InvalidYield, Resolution, Resumption,
//!     Return, Suspend, Yield, scheduler,
//! };
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum LookupError {
//!     UnknownUser(u32),
//!     Engine(InvalidYield),
//! }
//! impl From<InvalidYield> for LookupError {
//!     fn from(fault: InvalidYield) -> Self {
//!         LookupError::Engine(fault)
//!     }
//! }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Value {
//!     Id(u32),
//!     Name(String),
//! }
//!
//! type Step = Rc<dyn Awaitable<Value, LookupError>>;
//!
//! enum Lookup {
//!     Start(Resolution<Value, LookupError>, HashMap<u32, String>),
//!     WaitingForId(HashMap<u32, String>),
//!     WaitingForName,
//! }
//!
//! impl Coro<Resumption<Value, LookupError>, Step, Result<Value, LookupError>> for Lookup {
//!     type Next = Self;
//!     fn resume(
//!         self,
//!         input: Resumption<Value, LookupError>,
//!     ) -> Suspend<Step, Result<Value, LookupError>, Self> {
//!         match (self, input) {
//!             (Lookup::Start(id, names), Resumption::Start) => {
//!                 Yield(Rc::new(id), Lookup::WaitingForId(names))
//!             }
//!             (Lookup::WaitingForId(names), Resumption::Value(Value::Id(id))) => {
//!                 let step: Step = match names.get(&id) {
//!                     Some(name) => {
//!                         // Resolved on a later turn, like a real lookup.
//!                         let name_lookup = Resolution::new();
//!                         let producer = name_lookup.clone();
//!                         let name = name.clone();
//!                         scheduler::defer(move || {
//!                             producer.resolve(Value::Name(name)).unwrap();
//!                         });
//!                         Rc::new(name_lookup)
//!                     }
//!                     None => Rc::new(Failure::new(LookupError::UnknownUser(id))),
//!                 };
//!                 Yield(step, Lookup::WaitingForName)
//!             }
//!             (_, Resumption::Error(error)) => Return(Err(error)),
//!             (_, Resumption::Value(value)) => Return(Ok(value)),
//!             (_, Resumption::Start) => unreachable!("started twice"),
//!         }
//!     }
//! }
//!
//! let event_loop = EventLoop::new();
//! let names = HashMap::from([(7, "ada".to_string())]);
//!
//! let id = Resolution::new();
//! let lookup = event_loop.enter(|| {
//!     let lookup = Coroutine::new(Lookup::Start(id.clone(), names.clone()));
//!     id.resolve(Value::Id(7)).unwrap();
//!     lookup
//! });
//! assert!(lookup.outcome().is_none());
//! assert_eq!(event_loop.wait(&lookup), Ok(Ok(Value::Name("ada".to_string()))));
//!
//! let unknown = Resolution::new();
//! let missing = Coroutine::new(Lookup::Start(unknown.clone(), names));
//! unknown.resolve(Value::Id(3)).unwrap();
//! assert_eq!(missing.outcome(), Some(Err(LookupError::UnknownUser(3))));
//! ```
//!
//! The first lookup is still pending after the id resolves, because the name
//! is only produced on a later turn of the event loop; `wait()` runs turns
//! until it arrives. The second lookup fails synchronously: the failed name
//! lookup is raised into the computation, which returns it as its own error.
//! There is no cancellation: a coroutine runs until the awaitables it waits
//! on settle, and nobody else can resume its computation.
//!
//! ## Closures as computations
//!
//! `from_control_flow()` turns a closure into a computation; `Continue(y)`
//! suspends on `y` and `Break(r)` finishes with `r`. See its documentation
//! for an example.
//!
//! # Guarantees
//!
//!   * **Once-only settlement.** Settling a `Resolution` twice returns
//!     `Err(Error::AlreadySettled)` and leaves the first outcome and its
//!     observers alone.
//!   * **Ordering.** Observers run in registration order, exactly once. An
//!     observer registered after settlement runs immediately.
//!   * **Isolation.** A panicking observer neither stops the observers after
//!     it nor escapes into the code that settled the awaitable. Its panic is
//!     re-raised on the next turn of the current scheduler, where the event
//!     loop reports it.
//!   * **Bounded stack.** A coroutine resumed synchronously by already
//!     settled awaitables defers to the scheduler after
//!     `DEFAULT_MAX_CONTINUATION_DEPTH` nested resumptions (configurable with
//!     `CoroutineBuilder`).
//!   * **Disposal.** A computation that yields a non-awaitable is driven to
//!     completion by raising the fault into it before the coroutine fails, so
//!     its cleanup always runs. An error returned by that cleanup replaces the
//!     fault.
//!
//! # Scheduling
//!
//! Awaitables need one thing from their host: a way to run a callback on a
//! later turn. That is the [`Scheduler`] trait. The host makes itself current
//! with [`scheduler::enter`]; the crate's own [`EventLoop`] does so whenever
//! it runs. Everything is single-threaded: awaitables are `Rc`-based and are
//! neither `Send` nor `Sync`.
//!
//! # FAQ
//!
//! ## Why `Result<T, E>` instead of an `(error, value)` pair?
//!
//! Because exactly one of the two is ever present, and `Result` says so in
//! the type. Observers receive an owned `Result`, which is why values and
//! errors are `Clone`: every observer gets its own copy.
//!
//! ## Why does `resume()` consume the computation?
//!
//! So that a finished computation cannot be resumed. `Return` hands back no
//! computation, so the driver has nothing to resume by mistake, and the
//! question of what a computation does when resumed after finishing never
//! comes up.
//!
//! ## How can a computation yield something that is not an awaitable?
//!
//! The yield type only has to implement [`Suspension`], which may classify a
//! value as invalid: `None` in an `Option`, or anything on the right of an
//! `Either`. A computation that picks its yield type that way gets the
//! invalid-suspension fault instead of a type error, and the coroutine fails
//! with an `InvalidYield` converted into its error type.

mod awaitable;
mod coro;
mod coro_assertions;
mod coroutine;
mod error;
mod event_loop;
mod failure;
mod fixed_point;
mod from_control_flow;
mod queue;
mod resolution;
mod resumption;
pub mod scheduler;
mod success;
mod suspend;

pub use awaitable::{Awaitable, Observer, Suspension};
pub use coro::Coro;
pub use coro_assertions::CoroAssertions;
pub use coroutine::{Coroutine, CoroutineBuilder, DEFAULT_MAX_CONTINUATION_DEPTH};
pub use error::{Error, InvalidYield};
pub use event_loop::{EventLoop, Unhandled};
pub use failure::Failure;
pub use fixed_point::FixedPointCoro;
pub use from_control_flow::{FromControlFlow, from_control_flow};
pub use queue::ContinuationQueue;
pub use resolution::{Resolution, Status};
pub use resumption::Resumption;
pub use scheduler::Scheduler;
pub use success::Success;
pub use suspend::Suspend;

/// `Yield` and `Return` are imported into the crate root namespace because
/// computations use them constantly.
pub use Suspend::{Return, Yield};

#[cfg(test)]
mod test;
