//! The contract between awaitables and whatever event loop hosts them.
//!
//! Awaitables need exactly one thing from the host: a way to run a callback
//! on a later turn. It is used to defer coroutine continuations once too
//! many have nested on the native stack, and to re-raise observer panics
//! where they cannot disturb the settlement in progress.
//!
//! A scheduler is made current for a thread with [`enter`]. [`defer`] uses
//! the current one, or the thread's default [`EventLoop`] if none was
//! entered.

use std::cell::RefCell;
use std::rc::Rc;

use crate::event_loop::EventLoop;

/// A callback to run on a later turn.
pub type Callback = Box<dyn FnOnce()>;

/// Something that can run callbacks on a later turn of an event loop.
pub trait Scheduler {
    /// Queues `callback` to run on a later turn. Implementations must never
    /// run it before returning.
    fn schedule_later(&self, callback: Callback);
}

thread_local! {
    /// The scheduler installed by the innermost active [`enter`] call.
    static CURRENT: RefCell<Option<Rc<dyn Scheduler>>> = const { RefCell::new(None) };
}

// Restores the previously current scheduler, even if the entered closure
// unwinds.
struct Restore(Option<Rc<dyn Scheduler>>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Makes `scheduler` the current scheduler of this thread while `function`
/// runs. The previous one is restored on exit.
pub fn enter<F, R>(scheduler: Rc<dyn Scheduler>, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT.with(|current| current.borrow_mut().replace(scheduler));
    let _restore = Restore(previous);
    function()
}

/// The scheduler [`defer`] would use right now.
pub fn current() -> Rc<dyn Scheduler> {
    CURRENT
        .with(|current| current.borrow().clone())
        .unwrap_or_else(|| Rc::new(EventLoop::thread_default()))
}

/// Runs `callback` on a later turn of the current scheduler.
pub fn defer(callback: impl FnOnce() + 'static) {
    current().schedule_later(Box::new(callback));
}
