//! A mutex a thread already holding it may re-lock without deadlocking.

/// A recursive mutex, tracking owner identity and depth internally.
pub struct RecMutex<T: ?Sized> {
    inner: parking_lot::ReentrantMutex<std::cell::RefCell<T>>,
}

pub struct RecMutexGuard<'a, T> {
    guard: parking_lot::ReentrantMutexGuard<'a, std::cell::RefCell<T>>,
}

impl<T> RecMutex<T> {
    pub fn new(value: T) -> RecMutex<T> {
        RecMutex {
            inner: parking_lot::ReentrantMutex::new(std::cell::RefCell::new(value)),
        }
    }
}

impl<T> RecMutex<T> {
    pub fn lock(&self) -> RecMutexGuard<'_, T> {
        RecMutexGuard {
            guard: self.inner.lock(),
        }
    }
}

impl<'a, T> RecMutexGuard<'a, T> {
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.guard.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.guard.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_can_relock() {
        let m = RecMutex::new(0);
        let outer = m.lock();
        {
            let inner = m.lock();
            *inner.borrow_mut() += 1;
        }
        assert_eq!(*outer.borrow(), 1);
    }
}
