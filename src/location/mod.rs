//! Observer location source.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::model::Coordinate;
use crate::{Error, Result};

/// Live stream of the observer's position.
///
/// `subscribe` hands out a latest-value receiver: `None` until the first
/// fix. A closed sender means "no further updates"; consumers keep the
/// last value they saw.
#[async_trait]
pub trait LocationSource: Send + Sync + 'static {
    fn subscribe(&self) -> watch::Receiver<Option<Coordinate>>;

    /// Override the current position. Observable through `subscribe`.
    async fn set(&self, coordinate: Coordinate) -> Result<()>;
}

/// A location source driven entirely by `set` calls.
pub struct ManualLocationSource {
    tx: RwLock<Option<watch::Sender<Option<Coordinate>>>>,
    /// Handed out after `close` so late subscribers still see the last fix.
    last: watch::Receiver<Option<Coordinate>>,
}

impl ManualLocationSource {
    /// No fix until the first `set`.
    pub fn new() -> Self {
        Self::with_initial(None)
    }

    pub fn starting_at(coordinate: Coordinate) -> Self {
        Self::with_initial(Some(coordinate))
    }

    fn with_initial(initial: Option<Coordinate>) -> Self {
        let (tx, last) = watch::channel(initial);
        Self { tx: RwLock::new(Some(tx)), last }
    }

    pub fn current(&self) -> Option<Coordinate> {
        *self.last.borrow()
    }

    /// End the stream. Subscribers observe termination; later `set` calls fail.
    pub fn close(&self) {
        self.tx.write().take();
    }
}

impl Default for ManualLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationSource for ManualLocationSource {
    fn subscribe(&self) -> watch::Receiver<Option<Coordinate>> {
        match &*self.tx.read() {
            Some(tx) => tx.subscribe(),
            None => self.last.clone(),
        }
    }

    async fn set(&self, coordinate: Coordinate) -> Result<()> {
        match &*self.tx.read() {
            Some(tx) => {
                tx.send_replace(Some(coordinate));
                Ok(())
            }
            None => Err(Error::Location("location stream is closed".into())),
        }
    }
}
