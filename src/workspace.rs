use std::any::Any;

/// Type-erased scratch buffers owned by an evaluation context.
///
/// Queries gather local coefficients of arbitrary number types into buffers kept here, so that
/// repeated queries with the same coefficient type do not allocate. Lookup is optimized for the
/// case where the same type is requested many times in a row.
#[derive(Debug, Default)]
pub struct Workspace {
    buffers: Vec<Box<dyn Any + Send>>,
}

impl Workspace {
    pub fn get_or_insert_with<W, F>(&mut self, create: F) -> &mut W
    where
        W: 'static + Send,
        F: FnOnce() -> W,
    {
        // The most recently used buffer is kept last
        let idx = match self.buffers.iter().rposition(|b| b.is::<W>()) {
            Some(idx) => idx,
            None => {
                self.buffers.push(Box::new(create()));
                self.buffers.len() - 1
            }
        };

        let last = self.buffers.len() - 1;
        self.buffers.swap(idx, last);
        self.buffers[last]
            .downcast_mut()
            .expect("Internal error: Downcasting can by definition not fail")
    }

    pub fn get_or_default<W>(&mut self) -> &mut W
    where
        W: 'static + Send + Default,
    {
        self.get_or_insert_with(Default::default)
    }

    /// Takes a buffer out of the workspace, leaving a default one behind.
    ///
    /// Used when the buffer must be held while the context is borrowed again.
    pub fn take<W>(&mut self) -> W
    where
        W: 'static + Send + Default,
    {
        std::mem::take(self.get_or_default::<W>())
    }

    /// Returns a buffer previously obtained with [`Workspace::take`].
    pub fn restore<W>(&mut self, buffer: W)
    where
        W: 'static + Send + Default,
    {
        *self.get_or_default::<W>() = buffer;
    }
}
