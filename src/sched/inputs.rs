//! Tuple plumbing shared by the combinators.
//!
//! A combinator accepts its input futures as one tuple `(Future<A>, Future<B>, ...)`
//! of arity 1..=8. [`AwaitInputs`] produces the type-erased list the readiness
//! predicate polls; [`Continuation`] and [`DeferredContinuation`] apply a closure
//! to the typed futures once the task runs.
//!
//! Closures passed to the combinators need their parameter types spelled out,
//! e.g. `|a: Future<i32>, b: Future<i32>| ...`.

use crate::core::TaskScheduler;
use crate::future::{Future, FutureAny};

/// A tuple of typed futures a task waits on.
pub trait AwaitInputs: Send + 'static {
    /// Type-erased shares of every future, in tuple order.
    fn erase_all(&self) -> Vec<FutureAny>;
}

/// A worker-side continuation over a tuple of futures.
pub trait Continuation<I>: Send + 'static {
    /// Value the continuation produces.
    type Output: Send + Sync + 'static;

    /// Applies the continuation to the moved-in futures.
    fn call(self, inputs: I) -> Self::Output;
}

/// A dispatch-thread continuation; receives the scheduler ahead of the futures.
pub trait DeferredContinuation<I>: Send + 'static {
    /// Value the continuation produces.
    type Output: Send + Sync + 'static;

    /// Applies the continuation to the scheduler and the moved-in futures.
    fn call(self, scheduler: &mut TaskScheduler, inputs: I) -> Self::Output;
}

macro_rules! impl_inputs {
    ($($arg:ident: $ty:ident),+) => {
        impl<$($ty: Send + Sync + 'static),+> AwaitInputs for ($(Future<$ty>,)+) {
            fn erase_all(&self) -> Vec<FutureAny> {
                let ($($arg,)+) = self;
                vec![$($arg.erase()),+]
            }
        }

        impl<Func, Out, $($ty: Send + Sync + 'static),+> Continuation<($(Future<$ty>,)+)> for Func
        where
            Func: FnOnce($(Future<$ty>),+) -> Out + Send + 'static,
            Out: Send + Sync + 'static,
        {
            type Output = Out;

            fn call(self, inputs: ($(Future<$ty>,)+)) -> Out {
                let ($($arg,)+) = inputs;
                self($($arg),+)
            }
        }

        impl<Func, Out, $($ty: Send + Sync + 'static),+> DeferredContinuation<($(Future<$ty>,)+)> for Func
        where
            Func: FnOnce(&mut TaskScheduler, $(Future<$ty>),+) -> Out + Send + 'static,
            Out: Send + Sync + 'static,
        {
            type Output = Out;

            fn call(self, scheduler: &mut TaskScheduler, inputs: ($(Future<$ty>,)+)) -> Out {
                let ($($arg,)+) = inputs;
                self(scheduler, $($arg),+)
            }
        }
    };
}

impl_inputs!(a: A);
impl_inputs!(a: A, b: B);
impl_inputs!(a: A, b: B, c: C);
impl_inputs!(a: A, b: B, c: C, d: D);
impl_inputs!(a: A, b: B, c: C, d: D, e: E);
impl_inputs!(a: A, b: B, c: C, d: D, e: E, f: F);
impl_inputs!(a: A, b: B, c: C, d: D, e: E, f: F, g: G);
impl_inputs!(a: A, b: B, c: C, d: D, e: E, f: F, g: G, h: H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Allocator;
    use crate::future::make_promise;

    #[test]
    fn erase_all_keeps_tuple_order() {
        let alloc = Allocator::unbounded();
        let pa = make_promise::<u8>(&alloc).unwrap();
        let pb = make_promise::<String>(&alloc).unwrap();
        let inputs = (pa.get_future(), pb.get_future());

        let erased = inputs.erase_all();
        assert_eq!(erased.len(), 2);
        pb.notify_completed("b".into());
        assert!(!erased[0].is_done());
        assert!(erased[1].is_done());
    }

    #[test]
    fn continuation_receives_every_future() {
        let alloc = Allocator::unbounded();
        let pa = make_promise::<i32>(&alloc).unwrap();
        let pb = make_promise::<i32>(&alloc).unwrap();
        let pc = make_promise::<i32>(&alloc).unwrap();
        pa.notify_completed(1);
        pb.notify_completed(2);
        pc.notify_completed(3);

        let sum = |a: Future<i32>, b: Future<i32>, c: Future<i32>| {
            a.copy().unwrap() + b.copy().unwrap() + c.copy().unwrap()
        };
        let out = Continuation::call(sum, (pa.get_future(), pb.get_future(), pc.get_future()));
        assert_eq!(out, 6);
    }
}
