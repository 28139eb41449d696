//! Host-callable closures

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::{Interface, Value};

type Callback = dyn Fn(&Value, &[Value]) -> Value + Send + Sync;

static NEXT_FUNC_ID: AtomicU64 = AtomicU64::new(1);

/// A closure callable as `f(this, args)`.
///
/// Cloning shares the closure. Equality is by id.
#[derive(Clone)]
pub struct Func {
    inner: Arc<FuncInner>,
}

struct FuncInner {
    id: u64,
    callback: Mutex<Option<Arc<Callback>>>,
    interface: Option<Interface>,
}

impl Func {
    /// Wrap a closure (`FuncOf`)
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self::build(Arc::new(f), None)
    }

    /// Constructor object for a DOM interface; calling it does nothing
    pub(crate) fn interface(interface: Interface) -> Self {
        Self::build(Arc::new(|_: &Value, _: &[Value]| Value::Undefined), Some(interface))
    }

    fn build(callback: Arc<Callback>, interface: Option<Interface>) -> Self {
        Self {
            inner: Arc::new(FuncInner {
                id: NEXT_FUNC_ID.fetch_add(1, Ordering::Relaxed),
                callback: Mutex::new(Some(callback)),
                interface,
            }),
        }
    }

    /// Process-unique id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The DOM interface this function constructs, if it is one
    pub fn as_interface(&self) -> Option<Interface> {
        self.inner.interface
    }

    /// Run the closure. A released function returns `Undefined`.
    pub fn call(&self, this: &Value, args: &[Value]) -> Value {
        // Clone out so the closure may release itself while running
        let callback = self.inner.callback().clone();
        match callback {
            Some(callback) => callback(this, args),
            None => Value::Undefined,
        }
    }

    /// Drop the closure and everything it captured. Idempotent.
    pub fn release(&self) {
        self.inner.release();
    }

    pub fn is_released(&self) -> bool {
        self.inner.callback().is_none()
    }

    pub(crate) fn downgrade(&self) -> WeakFunc {
        WeakFunc(Arc::downgrade(&self.inner))
    }
}

impl FuncInner {
    fn callback(&self) -> std::sync::MutexGuard<'_, Option<Arc<Callback>>> {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let dropped = self.callback().take();
        drop(dropped);
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Func {}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("id", &self.id())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Non-owning reference used by callbacks that release each other
#[derive(Clone)]
pub(crate) struct WeakFunc(Weak<FuncInner>);

impl WeakFunc {
    pub(crate) fn release(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_call_passes_this_and_args() {
        let f = Func::new(|this, args| {
            Value::Number(this.float() + args.iter().map(Value::float).sum::<f64>())
        });
        let out = f.call(&Value::Number(1.0), &[Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(out.float(), 6.0);
    }

    #[test]
    fn test_release_is_idempotent_and_inert() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let f = Func::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Bool(true)
        });

        assert!(f.call(&Value::Undefined, &[]).truthy());
        f.release();
        f.release();
        assert!(f.is_released());
        assert!(f.call(&Value::Undefined, &[]).is_undefined());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_drops_captures() {
        let captured = Arc::new(());
        let held = captured.clone();
        let f = Func::new(move |_, _| {
            let _ = &held;
            Value::Undefined
        });
        assert_eq!(Arc::strong_count(&captured), 2);
        f.release();
        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[test]
    fn test_equality_by_id() {
        let a = Func::new(|_, _| Value::Undefined);
        let b = Func::new(|_, _| Value::Undefined);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
