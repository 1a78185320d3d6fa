/// Listener registry for one event type
///
/// Any number of listeners may be registered; each is invoked once per
/// event, in registration order.
pub struct Observers<T> {
    listeners: Vec<Box<dyn FnMut(&T) + Send>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn register<F>(&mut self, listener: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn notify(&mut self, event: &T) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
