//! Cancellable serve delay, advanced by the simulation tick.

/// Handle to a scheduled serve. Each schedule gets a fresh handle, so a
/// superseded serve can never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeHandle(u64);

#[derive(Debug)]
struct Pending {
    handle: ServeHandle,
    remaining: f32,
}

#[derive(Debug, Default)]
pub struct ServeTimer {
    generation: u64,
    pending: Option<Pending>,
}

impl ServeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a serve `delay` seconds from now, replacing any pending one.
    pub fn schedule(&mut self, delay: f32) -> ServeHandle {
        self.generation += 1;
        let handle = ServeHandle(self.generation);
        if let Some(old) = self.pending.replace(Pending {
            handle,
            remaining: delay.max(0.0),
        }) {
            tracing::debug!(superseded = ?old.handle, "superseding pending serve");
        }
        handle
    }

    /// Cancel the pending serve, returning its handle.
    pub fn cancel(&mut self) -> Option<ServeHandle> {
        self.pending.take().map(|p| p.handle)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance by `dt`. Returns the handle exactly once, on the tick the delay expires.
    pub fn advance(&mut self, dt: f32) -> Option<ServeHandle> {
        let pending = self.pending.as_mut()?;
        pending.remaining -= dt;
        if pending.remaining > 0.0 {
            return None;
        }
        self.pending.take().map(|p| p.handle)
    }
}
