use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Single-writer observable value; `None` is the explicit absent state.
pub(crate) struct Slot<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Slot<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn publish(&self, value: Option<T>) {
        // send_replace succeeds even with no live receivers
        self.tx.send_replace(value);
    }

    pub(crate) fn reader(&self) -> SlotReader<T> {
        SlotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of a slot.
#[derive(Clone)]
pub struct SlotReader<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> SlotReader<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Receiver whose `changed()` fires on the next publish after this call.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        let mut rx = self.rx.clone();
        rx.borrow_and_update();
        rx
    }

    /// Stream of values published after this call.
    pub fn changes(&self) -> WatchStream<Option<T>> {
        WatchStream::from_changes(self.subscribe())
    }
}
