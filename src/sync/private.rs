//! A per-thread slot, the `Arc`-free complement to [`super::Mutex`] for data
//! that should never be shared across threads at all.

use std::cell::RefCell;
use std::thread::LocalKey;

/// A handle onto a `thread_local!`-declared slot, giving it a
/// `get`/`set`/`take` API independent of the macro-generated `LocalKey`
/// underneath. Declare one with [`thread_private!`](crate::thread_private).
pub struct Private<T: 'static> {
    key: &'static LocalKey<RefCell<Option<T>>>,
}

impl<T: 'static> Private<T> {
    #[doc(hidden)]
    pub const fn new(key: &'static LocalKey<RefCell<Option<T>>>) -> Private<T> {
        Private { key }
    }

    pub fn set(&self, value: T) {
        self.key.with(|slot| *slot.borrow_mut() = Some(value));
    }

    pub fn take(&self) -> Option<T> {
        self.key.with(|slot| slot.borrow_mut().take())
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.key.with(|slot| f(slot.borrow().as_ref()))
    }
}

impl<T: Clone + 'static> Private<T> {
    pub fn get(&self) -> Option<T> {
        self.key.with(|slot| slot.borrow().clone())
    }
}

/// Declares a [`Private<T>`] slot backed by a fresh `thread_local!`.
///
/// ```
/// use evloop::thread_private;
/// use evloop::sync::Private;
///
/// thread_private!(static CURRENT_DEPTH: Private<u32>);
/// CURRENT_DEPTH.set(3);
/// assert_eq!(CURRENT_DEPTH.get(), Some(3));
/// ```
#[macro_export]
macro_rules! thread_private {
    ($vis:vis static $name:ident: Private<$ty:ty>) => {
        $vis static $name: $crate::sync::Private<$ty> = {
            std::thread_local! {
                static SLOT: std::cell::RefCell<Option<$ty>> = const { std::cell::RefCell::new(None) };
            }
            $crate::sync::Private::new(&SLOT)
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    thread_private!(static SCRATCH: Private<String>);

    #[test]
    fn slot_is_per_thread_and_round_trips() {
        assert_eq!(SCRATCH.get(), None);
        SCRATCH.set("hello".to_string());
        assert_eq!(SCRATCH.get().as_deref(), Some("hello"));
        assert_eq!(SCRATCH.take().as_deref(), Some("hello"));
        assert_eq!(SCRATCH.get(), None);
    }
}
