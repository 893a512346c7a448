/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::WakerRegistration;
use embassy_time::{Duration, Timer};

use log::debug;

struct State<T> {
    pending: Option<(Duration, T)>,
    // Bumped on every schedule and cancel, so that a running timer can tell
    // whether the callback it sleeps for is still the pending one
    generation: u32,
    waker: WakerRegistration,
}

impl<T> State<T> {
    const fn new() -> Self {
        Self {
            pending: None,
            generation: 0,
            waker: WakerRegistration::new(),
        }
    }

    fn replace(&mut self, pending: Option<(Duration, T)>) -> Option<(Duration, T)> {
        self.generation = self.generation.wrapping_add(1);
        self.waker.wake();

        core::mem::replace(&mut self.pending, pending)
    }
}

/// A one-shot callback fired after a delay, with at most one callback pending.
///
/// Scheduling replaces whatever was pending: the latest delay and context win.
/// The callback itself is executed by whoever drives `run`.
pub struct DelayedCallback<M, T>
where
    M: RawMutex,
{
    state: Mutex<M, RefCell<State<T>>>,
}

impl<M, T> Default for DelayedCallback<M, T>
where
    M: RawMutex,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, T> DelayedCallback<M, T>
where
    M: RawMutex,
{
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State::new())),
        }
    }

    /// Schedule `ctx` to be delivered once `delay` elapses, replacing any pending callback.
    pub fn schedule(&self, delay: Duration, ctx: T) {
        let replaced = self.with(|state| state.replace(Some((delay, ctx))).is_some());

        if replaced {
            debug!("Replaced the pending callback, new delay {}ms", delay.as_millis());
        } else {
            debug!("Scheduled a callback in {}ms", delay.as_millis());
        }
    }

    /// Drop the pending callback, if any. Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        let cancelled = self.with(|state| state.pending.is_some() && state.replace(None).is_some());

        if cancelled {
            debug!("Cancelled the pending callback");
        }

        cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.with(|state| state.pending.is_some())
    }

    /// Deliver every scheduled context to `f` once its delay elapses.
    ///
    /// A callback rescheduled or cancelled while its timer runs is never delivered;
    /// the timer restarts for the replacement instead. Only one task may run this at a time.
    pub async fn run<F>(&self, mut f: F)
    where
        F: FnMut(T),
    {
        loop {
            let (generation, delay) = self
                .wait(|state| {
                    state
                        .pending
                        .as_ref()
                        .map(|(delay, _)| (state.generation, *delay))
                })
                .await;

            let expired = select(
                Timer::after(delay),
                self.wait(|state| (state.generation != generation).then_some(())),
            )
            .await;

            if let Either::First(_) = expired {
                let ctx = self.with(|state| {
                    if state.generation == generation {
                        state.pending.take().map(|(_, ctx)| ctx)
                    } else {
                        None
                    }
                });

                if let Some(ctx) = ctx {
                    debug!("Delivering the callback after {}ms", delay.as_millis());
                    f(ctx);
                }
            }
        }
    }

    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut State<T>) -> R,
    {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    async fn wait<F, R>(&self, mut f: F) -> R
    where
        F: FnMut(&State<T>) -> Option<R>,
    {
        poll_fn(|ctx| {
            self.with(|state| match f(state) {
                Some(result) => Poll::Ready(result),
                None => {
                    state.waker.register(ctx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }
}
