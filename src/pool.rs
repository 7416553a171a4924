//! Free-list object pool.
//!
//! The caller acquires an instance, owns it while reading it, and hands it
//! back with [`Pool::put`]. Moving the value into the pool ends the
//! caller's access to it.

/// A free list of reusable values.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    free: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self { free: Vec::new() }
    }
}

impl<T: Default> Pool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an instance from the pool, or create one if it is empty.
    ///
    /// The returned value holds whatever state it had when it was put back.
    pub fn get(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    /// Return an instance to the pool.
    pub fn put(&mut self, value: T) {
        self.free.push(value);
    }

    /// Return every instance yielded by `values`.
    pub fn put_all(&mut self, values: impl IntoIterator<Item = T>) {
        self.free.extend(values);
    }

    /// Number of idle instances.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Whether the pool holds no idle instance.
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}
