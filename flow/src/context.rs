// flow/src/context.rs

//! Shared, lockable context handed to every step handler.

use crate::control::Control;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Shared ownership of a flow context behind a `parking_lot::RwLock`.
///
/// Guards are blocking and not `Send`. Take what you need inside a block and
/// drop the guard before the next `.await`.
#[derive(Debug)]
pub struct Shared<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> Shared<T> {
  pub fn new(data: T) -> Self {
    Shared(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Clones a value out of the context under a short read lock.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }
}

impl<T: Send + Sync + 'static> Clone for Shared<T> {
  fn clone(&self) -> Self {
    Shared(Arc::clone(&self.0))
  }
}

/// A boxed async step handler over context `T` failing with `E`.
pub type Handler<T, E> =
  Box<dyn Fn(Shared<T>) -> Pin<Box<dyn Future<Output = Result<Control, E>> + Send>> + Send + Sync>;
