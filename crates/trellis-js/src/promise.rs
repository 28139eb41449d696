//! Promises and the synchronous bridge over them
//!
//! [`await_promise`] turns a `then(onResolve, onReject)` registration into a
//! single blocking receive, so synchronous call sites can drive asynchronous
//! operations:
//!
//! ```rust,ignore
//! let (promise, resolver) = Promise::new();
//! std::thread::spawn(move || resolver.resolve(Value::from(42)));
//! let value = await_promise(promise).wait()?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use smol::Timer;
use smol::channel::{Receiver, Sender};

use crate::func::WeakFunc;
use crate::{Func, Value};

/// What a settled bridge delivers
pub type Settlement = Result<Value, PromiseError>;

/// Promise bridge errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromiseError {
    /// Rejected with a reason
    #[error("promise rejected: {0}")]
    Rejected(String),

    /// Rejected without a payload
    #[error("unknown rejection")]
    UnknownRejection,

    /// `wait_timeout` gave up
    #[error("promise did not settle within {0:?}")]
    TimedOut(Duration),

    /// The operation dropped both callbacks without calling either
    #[error("promise was abandoned without settling")]
    Abandoned,
}

impl PromiseError {
    /// Map a rejection payload: an error-like object gives its `message`,
    /// anything else its string form
    pub fn from_rejection(reason: Option<&Value>) -> Self {
        match reason {
            None | Some(Value::Undefined) => PromiseError::UnknownRejection,
            Some(reason) => {
                let message = reason.get("message");
                if message.is_undefined() {
                    PromiseError::Rejected(reason.string())
                } else {
                    PromiseError::Rejected(message.string())
                }
            }
        }
    }
}

/// Anything exposing `then(onResolve, onReject)`
pub trait Thenable: Send + 'static {
    fn then(&self, on_resolve: Func, on_reject: Func);
}

/// Promise state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

struct PromiseInner {
    state: PromiseState,
    value: Value,
    reactions: Vec<(Func, Func)>,
}

/// In-process promise. Settles once; later resolve/reject calls are ignored
/// and callbacks registered after settlement fire immediately.
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Mutex<PromiseInner>>,
}

impl Promise {
    /// A pending promise and the resolver that settles it
    pub fn new() -> (Promise, Resolver) {
        let promise = Promise {
            inner: Arc::new(Mutex::new(PromiseInner {
                state: PromiseState::Pending,
                value: Value::Undefined,
                reactions: Vec::new(),
            })),
        };
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    pub fn resolved(value: Value) -> Promise {
        let (promise, resolver) = Promise::new();
        resolver.resolve(value);
        promise
    }

    pub fn rejected(reason: Value) -> Promise {
        let (promise, resolver) = Promise::new();
        resolver.reject(reason);
        promise
    }

    pub fn state(&self) -> PromiseState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PromiseInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, state: PromiseState, value: Value) -> bool {
        let reactions = {
            let mut inner = self.lock();
            if inner.state != PromiseState::Pending {
                return false;
            }
            inner.state = state;
            inner.value = value.clone();
            std::mem::take(&mut inner.reactions)
        };
        // Callbacks run without the lock held
        for (on_resolve, on_reject) in reactions {
            react(state, &value, &on_resolve, &on_reject);
        }
        true
    }
}

fn react(state: PromiseState, value: &Value, on_resolve: &Func, on_reject: &Func) {
    let args = std::slice::from_ref(value);
    match state {
        PromiseState::Fulfilled => {
            on_resolve.call(&Value::Undefined, args);
        }
        PromiseState::Rejected => {
            on_reject.call(&Value::Undefined, args);
        }
        PromiseState::Pending => {}
    }
}

impl Thenable for Promise {
    fn then(&self, on_resolve: Func, on_reject: Func) {
        let settled = {
            let mut inner = self.lock();
            if inner.state == PromiseState::Pending {
                inner.reactions.push((on_resolve.clone(), on_reject.clone()));
                None
            } else {
                Some((inner.state, inner.value.clone()))
            }
        };
        if let Some((state, value)) = settled {
            react(state, &value, &on_resolve, &on_reject);
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("state", &self.state()).finish()
    }
}

/// Settles a [`Promise`]
#[derive(Clone, Debug)]
pub struct Resolver {
    promise: Promise,
}

impl Resolver {
    /// Fulfil the promise. Returns false if it was already settled.
    pub fn resolve(&self, value: Value) -> bool {
        self.promise.settle(PromiseState::Fulfilled, value)
    }

    /// Reject the promise. Returns false if it was already settled.
    pub fn reject(&self, reason: Value) -> bool {
        self.promise.settle(PromiseState::Rejected, reason)
    }
}

/// Register with `thenable` and return a handle that receives its
/// settlement exactly once.
///
/// Registration happens on a dedicated thread, so this never blocks. The
/// first callback to fire sends on a capacity-1 channel and releases both
/// callbacks; any later settlement is a no-op.
pub fn await_promise<T: Thenable>(thenable: T) -> PendingPromise {
    let (sender, receiver) = smol::channel::bounded(1);
    let (on_resolve, on_reject) = settlement_callbacks(sender);

    let registered = std::thread::Builder::new()
        .name("trellis-promise".to_string())
        .spawn(move || thenable.then(on_resolve, on_reject));
    if let Err(err) = registered {
        // The closure (and the thenable) were dropped with the failed spawn,
        // so the receiver reports `Abandoned`.
        tracing::warn!(%err, "failed to spawn promise registration thread");
    }

    PendingPromise { receiver }
}

fn settlement_callbacks(sender: Sender<Settlement>) -> (Func, Func) {
    let pair: Arc<OnceLock<[WeakFunc; 2]>> = Arc::new(OnceLock::new());
    let fired = Arc::new(AtomicBool::new(false));

    let deliver = {
        let pair = pair.clone();
        move |settlement: Settlement| {
            if fired.swap(true, Ordering::SeqCst) {
                tracing::trace!("ignoring repeated settlement");
                return;
            }
            if sender.try_send(settlement).is_err() {
                tracing::debug!("promise settled after its receiver was dropped");
            }
            sender.close();
            if let Some(funcs) = pair.get() {
                for f in funcs {
                    f.release();
                }
            }
        }
    };
    let deliver = Arc::new(deliver);

    let on_resolve = {
        let deliver = deliver.clone();
        Func::new(move |_, args| {
            deliver(Ok(args.first().cloned().unwrap_or_default()));
            Value::Undefined
        })
    };
    let on_reject = Func::new(move |_, args| {
        deliver(Err(PromiseError::from_rejection(args.first())));
        Value::Undefined
    });

    let _ = pair.set([on_resolve.downgrade(), on_reject.downgrade()]);
    (on_resolve, on_reject)
}

/// A settlement not yet received
#[derive(Debug)]
pub struct PendingPromise {
    receiver: Receiver<Settlement>,
}

impl PendingPromise {
    /// Block until the operation settles. Blocks forever if it never does;
    /// use [`PendingPromise::wait_timeout`] to bound the wait.
    pub fn wait(self) -> Settlement {
        self.receiver
            .recv_blocking()
            .unwrap_or(Err(PromiseError::Abandoned))
    }

    /// Block for at most `timeout`
    pub fn wait_timeout(self, timeout: Duration) -> Settlement {
        smol::block_on(smol::future::or(self.settled(), async move {
            Timer::after(timeout).await;
            Err(PromiseError::TimedOut(timeout))
        }))
    }

    /// Wait asynchronously
    pub async fn settled(self) -> Settlement {
        self.receiver
            .recv()
            .await
            .unwrap_or(Err(PromiseError::Abandoned))
    }

    /// The underlying channel; it yields at most one settlement
    pub fn into_receiver(self) -> Receiver<Settlement> {
        self.receiver
    }
}
