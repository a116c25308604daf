use core::ops::ControlFlow::{Break, Continue};
use std::cell::RefCell;
use std::rc::Rc;

use either::Either;
use thiserror::Error;

use crate::*;

#[derive(Debug, Clone, PartialEq, Error)]
enum TestError {
    #[error("boom: {0}")]
    Boom(&'static str),
    #[error(transparent)]
    Invalid(#[from] InvalidYield),
}

type Step = Rc<dyn Awaitable<i32, TestError>>;
type Inputs = Rc<RefCell<Vec<Resumption<i32, TestError>>>>;

fn success(value: i32) -> Step {
    Rc::new(Success::new(value))
}

fn failure(error: TestError) -> Step {
    Rc::new(Failure::new(error))
}

// Suspends on each step in turn, recording every input, and returns the sum
// of the values it was resumed with. Errors are re-raised.
fn script(
    steps: Vec<Step>,
    inputs: Inputs,
) -> impl FixedPointCoro<Resumption<i32, TestError>, Step, Result<i32, TestError>> {
    let mut steps = steps.into_iter();
    let mut sum = 0;
    from_control_flow(move |input: Resumption<i32, TestError>| {
        inputs.borrow_mut().push(input.clone());
        match input.into_outcome() {
            Some(Err(error)) => return Break(Err(error)),
            Some(Ok(value)) => sum += value,
            None => {}
        }
        match steps.next() {
            Some(step) => Continue(step),
            None => Break(Ok(sum)),
        }
    })
}

fn values(inputs: &Inputs) -> usize {
    inputs
        .borrow()
        .iter()
        .filter(|input| matches!(input, Resumption::Value(_)))
        .count()
}

#[test]
fn finishes_without_suspending() {
    let inputs = Inputs::default();
    let coroutine = Coroutine::new(script(vec![], inputs.clone()));
    assert_eq!(coroutine.outcome(), Some(Ok(0)));
    assert_eq!(*inputs.borrow(), vec![Resumption::Start]);
}

#[test]
fn raising_before_first_suspension_fails() {
    let coroutine = Coroutine::new(from_control_flow(
        |_: Resumption<i32, TestError>| Break::<_, Step>(Err(TestError::Boom("early"))),
    ));
    assert_eq!(coroutine.status(), Status::Failed);
    assert_eq!(coroutine.outcome(), Some(Err(TestError::Boom("early"))));
}

#[test]
fn resolved_value_is_sent_back_in() {
    let inputs = Inputs::default();
    let coroutine = Coroutine::new(script(vec![success(5), success(6)], inputs.clone()));
    assert_eq!(coroutine.outcome(), Some(Ok(11)));
    assert_eq!(
        *inputs.borrow(),
        vec![Resumption::Start, Resumption::Value(5), Resumption::Value(6)]
    );
}

#[test]
fn failure_is_raised_inside_and_can_be_recovered() {
    let coroutine = Coroutine::new(from_control_flow(
        |input: Resumption<i32, TestError>| match input {
            Resumption::Start => Continue(failure(TestError::Boom("flaky"))),
            Resumption::Error(TestError::Boom(_)) => Break(Ok(-1)),
            other => panic!("unexpected {other:?}"),
        },
    ));
    assert_eq!(coroutine.outcome(), Some(Ok(-1)));
}

#[test]
fn uncaught_failure_fails_the_coroutine() {
    let inputs = Inputs::default();
    let coroutine = Coroutine::new(script(
        vec![success(1), failure(TestError::Boom("y")), success(2)],
        inputs.clone(),
    ));
    assert_eq!(coroutine.outcome(), Some(Err(TestError::Boom("y"))));
    assert_eq!(
        *inputs.borrow(),
        vec![
            Resumption::Start,
            Resumption::Value(1),
            Resumption::Error(TestError::Boom("y")),
        ]
    );
}

#[test]
fn waits_for_pending_awaitable() {
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let pending = Resolution::new();
    let coroutine = event_loop.enter(|| {
        Coroutine::new(script(vec![Rc::new(pending.clone()), success(2)], inputs.clone()))
    });
    assert_eq!(coroutine.status(), Status::Pending);
    assert_eq!(*inputs.borrow(), vec![Resumption::Start]);

    event_loop.enter(|| pending.resolve(40)).unwrap();
    assert_eq!(coroutine.outcome(), Some(Ok(42)));
}

#[test]
fn end_to_end_value_then_uncaught_error() {
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let a = Resolution::new();
    let b = Resolution::new();
    let coroutine = event_loop.enter(|| {
        Coroutine::new(script(vec![Rc::new(a.clone()), Rc::new(b.clone())], inputs.clone()))
    });

    let producer_a = a.clone();
    let producer_b = b.clone();
    event_loop.enter(|| {
        scheduler::defer(move || producer_a.resolve(7).unwrap());
        scheduler::defer(move || producer_b.fail(TestError::Boom("Y")).unwrap());
    });

    assert_eq!(
        event_loop.wait(&coroutine),
        Ok(Err(TestError::Boom("Y")))
    );
    assert_eq!(
        *inputs.borrow(),
        vec![
            Resumption::Start,
            Resumption::Value(7),
            Resumption::Error(TestError::Boom("Y")),
        ]
    );
}

#[test]
fn depth_bound_defers_to_the_next_turn() {
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let coroutine = event_loop.enter(|| {
        Coroutine::new(script((0..10).map(|_| success(1)).collect(), inputs.clone()))
    });

    // Three nested resumptions, then the fourth waits for a turn.
    assert_eq!(values(&inputs), DEFAULT_MAX_CONTINUATION_DEPTH);
    assert_eq!(coroutine.status(), Status::Pending);
    assert_eq!(event_loop.pending(), 1);

    assert_eq!(event_loop.run_turn(), 1);
    assert_eq!(values(&inputs), 7);

    event_loop.run();
    assert_eq!(values(&inputs), 10);
    assert_eq!(coroutine.outcome(), Some(Ok(10)));
}

#[test]
fn zero_depth_defers_every_synchronous_continuation() {
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let coroutine = event_loop.enter(|| {
        CoroutineBuilder::new()
            .max_continuation_depth(0)
            .spawn(script(vec![success(1), success(2)], inputs.clone()))
    });
    assert_eq!(values(&inputs), 0);
    assert_eq!(event_loop.run_turn(), 1);
    assert_eq!(values(&inputs), 1);
    assert_eq!(event_loop.wait(&coroutine), Ok(Ok(3)));
}

#[test]
fn asynchronous_settlement_resumes_inline_even_with_zero_depth() {
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let pending = Resolution::new();
    let coroutine = event_loop.enter(|| {
        CoroutineBuilder::new()
            .max_continuation_depth(0)
            .spawn(script(vec![Rc::new(pending.clone())], inputs.clone()))
    });
    pending.resolve(3).unwrap();
    assert_eq!(coroutine.outcome(), Some(Ok(3)));
    assert_eq!(event_loop.pending(), 0);
}

#[test]
fn long_synchronous_chain_runs_in_bounded_stack() {
    const STEPS: i32 = 100_000;
    let event_loop = EventLoop::new();
    let inputs = Inputs::default();
    let coroutine = event_loop.enter(|| {
        Coroutine::new(script((0..STEPS).map(|_| success(1)).collect(), inputs.clone()))
    });
    assert_eq!(event_loop.wait(&coroutine), Ok(Ok(STEPS)));
}

#[test]
fn coroutine_awaits_coroutine() {
    let event_loop = EventLoop::new();
    let inner_inputs = Inputs::default();
    let outer_inputs = Inputs::default();
    let pending = Resolution::new();
    let outer = event_loop.enter(|| {
        let inner = Coroutine::new(script(
            vec![Rc::new(pending.clone()), success(1)],
            inner_inputs.clone(),
        ));
        Coroutine::new(script(vec![Rc::new(inner), success(100)], outer_inputs.clone()))
    });
    assert_eq!(outer.status(), Status::Pending);
    event_loop.enter(|| pending.resolve(10)).unwrap();
    assert_eq!(outer.outcome(), Some(Ok(111)));
}

#[test]
fn observers_of_a_coroutine_run_in_order_and_late_ones_immediately() {
    let pending = Resolution::new();
    let inputs = Inputs::default();
    let coroutine = Coroutine::new(script(vec![Rc::new(pending.clone())], inputs.clone()));
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let log = log.clone();
        coroutine.when(Box::new(move |outcome| {
            log.borrow_mut().push(format!("{name}:{outcome:?}"))
        }));
    }
    pending.resolve(8).unwrap();
    let late = log.clone();
    coroutine.when(Box::new(move |outcome| {
        late.borrow_mut().push(format!("late:{outcome:?}"))
    }));
    assert_eq!(
        *log.borrow(),
        vec!["first:Ok(8)", "second:Ok(8)", "third:Ok(8)", "late:Ok(8)"]
    );
}

#[test]
fn invalid_yield_fails_with_fault() {
    let inputs = Inputs::default();
    let recorded = inputs.clone();
    let coroutine = Coroutine::new(from_control_flow(
        move |input: Resumption<i32, TestError>| {
            recorded.borrow_mut().push(input.clone());
            match input {
                Resumption::Start => Continue(Either::<Step, _>::Right("bogus")),
                Resumption::Error(error) => Break(Err(error)),
                Resumption::Value(_) => Continue(Either::Right("resumed again")),
            }
        },
    ));
    let fault = TestError::Invalid(InvalidYield::new("\"bogus\""));
    assert_eq!(coroutine.outcome(), Some(Err(fault.clone())));
    assert_eq!(
        *inputs.borrow(),
        vec![Resumption::Start, Resumption::Error(fault)]
    );
}

#[test]
fn yielding_none_is_an_invalid_yield() {
    let coroutine = Coroutine::new(from_control_flow(
        |input: Resumption<i32, TestError>| match input {
            Resumption::Start => Continue(None::<Step>),
            Resumption::Error(error) => Break(Err(error)),
            Resumption::Value(value) => Break(Ok(value)),
        },
    ));
    assert_eq!(
        coroutine.outcome(),
        Some(Err(TestError::Invalid(InvalidYield::new("None"))))
    );
}

struct Guard(Rc<RefCell<Vec<String>>>);

impl Drop for Guard {
    fn drop(&mut self) {
        self.0.borrow_mut().push("guard dropped".to_string());
    }
}

// Waits on `first`, then yields a non-awaitable. When the fault is raised
// into it, it runs `cleanup` once per raise until `cleanup` breaks.
fn faulty(
    first: Step,
    log: Rc<RefCell<Vec<String>>>,
    mut cleanup: impl FnMut(TestError) -> Option<Result<i32, TestError>> + 'static,
) -> impl FixedPointCoro<
    Resumption<i32, TestError>,
    Either<Step, &'static str>,
    Result<i32, TestError>,
> {
    let guard = Guard(log);
    let mut first = Some(first);
    from_control_flow(move |input: Resumption<i32, TestError>| {
        let log = &guard.0;
        match input {
            Resumption::Start => match first.take() {
                Some(step) => Continue(Either::Left(step)),
                None => Break(Ok(0)),
            },
            Resumption::Value(_) => Continue(Either::Right("not an awaitable")),
            Resumption::Error(error) => {
                log.borrow_mut().push("cleanup".to_string());
                match cleanup(error) {
                    Some(result) => Break(result),
                    // Suspending during cleanup; the driver raises again.
                    None => Continue(Either::Left(success(0))),
                }
            }
        }
    })
}

#[test]
fn disposal_runs_cleanup_before_failure_is_reported() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let pending = Resolution::new();
    let mut raises = 0;
    let coroutine = Coroutine::new(faulty(Rc::new(pending.clone()), log.clone(), move |error| {
        raises += 1;
        (raises == 2).then_some(Err(error))
    }));
    let observed = log.clone();
    coroutine.when(Box::new(move |outcome| {
        observed.borrow_mut().push(format!("observer:{}", outcome.is_err()))
    }));

    pending.resolve(1).unwrap();
    assert_eq!(
        *log.borrow(),
        vec!["cleanup", "cleanup", "guard dropped", "observer:true"]
    );
    assert_eq!(
        coroutine.outcome(),
        Some(Err(TestError::Invalid(InvalidYield::new("\"not an awaitable\""))))
    );
}

#[test]
fn error_raised_by_cleanup_supersedes_the_fault() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let coroutine = Coroutine::new(faulty(success(1), log.clone(), |_| {
        Some(Err(TestError::Boom("cleanup failed")))
    }));
    assert_eq!(coroutine.outcome(), Some(Err(TestError::Boom("cleanup failed"))));
    assert_eq!(*log.borrow(), vec!["cleanup", "guard dropped"]);
}

#[test]
fn cleanup_that_swallows_the_fault_still_fails() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let coroutine = Coroutine::new(faulty(success(1), log.clone(), |_| Some(Ok(99))));
    assert_eq!(coroutine.status(), Status::Failed);
    assert!(matches!(
        coroutine.outcome(),
        Some(Err(TestError::Invalid(_)))
    ));
}

#[test]
fn panic_while_resumed_by_a_settlement_leaves_the_coroutine_pending() {
    let event_loop = EventLoop::new();
    let caught = Rc::new(RefCell::new(Vec::new()));
    let sink = caught.clone();
    event_loop.set_error_handler(move |payload| {
        sink.borrow_mut().push(crate::event_loop::panic_message(payload.as_ref()).to_string())
    });

    let pending = Resolution::new();
    let awaited: Step = Rc::new(pending.clone());
    let mut awaited = Some(awaited);
    let coroutine = Coroutine::new(from_control_flow(
        move |input: Resumption<i32, TestError>| match input {
            Resumption::Start => match awaited.take() {
                Some(step) => Continue(step),
                None => Break(Ok(0)),
            },
            _ => panic!("computation failed"),
        },
    ));
    let notified = Rc::new(RefCell::new(false));
    let flag = notified.clone();
    coroutine.when(Box::new(move |_| *flag.borrow_mut() = true));

    event_loop.enter(|| pending.resolve(1)).unwrap();
    event_loop.run();
    assert_eq!(*caught.borrow(), vec!["computation failed".to_string()]);
    assert_eq!(coroutine.status(), Status::Pending);
    assert!(!*notified.borrow());
}

#[test]
fn panicking_observer_does_not_disturb_the_coroutine() {
    let event_loop = EventLoop::new();
    let caught = Rc::new(RefCell::new(0));
    let sink = caught.clone();
    event_loop.set_error_handler(move |_| *sink.borrow_mut() += 1);

    let inputs = Inputs::default();
    let pending = Resolution::new();
    let coroutine = Coroutine::new(script(vec![Rc::new(pending.clone())], inputs.clone()));
    coroutine.when(Box::new(|_| panic!("observer failed")));
    let seen = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    coroutine.when(Box::new(move |outcome| *sink.borrow_mut() = Some(outcome)));

    event_loop.enter(|| pending.resolve(4)).unwrap();
    assert_eq!(*seen.borrow(), Some(Ok(4)));
    assert_eq!(coroutine.outcome(), Some(Ok(4)));
    event_loop.run();
    assert_eq!(*caught.borrow(), 1);
}

#[test]
fn stepping_a_script_by_hand() {
    let inputs = Inputs::default();
    script(vec![success(1), success(2)], inputs.clone())
        .assert_suspends(Resumption::Start)
        .assert_suspends(Resumption::Value(1))
        .assert_returns(Resumption::Value(2), Ok(3));
}
