use std::sync::mpsc::{Receiver, Sender};
use tracing::{debug, trace};

/// Index of a worker in the pool, starting at 0.
pub type Rank = usize;

/// Rank-local state driven by a [`Controller`](super::Controller).
///
/// A worker sees every request exactly once, in the order the controller issued them.
pub trait Worker: Send + 'static {
    type Request: Clone + Send + 'static;
    type Response: Send + 'static;
    type Error: std::error::Error + Send + 'static;

    fn handle(&mut self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

pub(crate) enum Envelope<R> {
    Request(R),
    Shutdown,
}

pub(crate) type Reply<W> = Result<<W as Worker>::Response, <W as Worker>::Error>;

/// Request loop of one rank. Returns when told to shut down or when the controller hangs up.
pub(crate) fn serve<W: Worker>(
    rank: Rank,
    mut worker: W,
    requests: Receiver<Envelope<W::Request>>,
    replies: Sender<Reply<W>>,
) {
    debug!(rank, "Worker started.");
    let mut handled: u64 = 0;
    while let Ok(envelope) = requests.recv() {
        match envelope {
            Envelope::Request(request) => {
                let reply = worker.handle(request);
                handled += 1;
                trace!(rank, handled, ok = reply.is_ok(), "Request handled.");
                if replies.send(reply).is_err() {
                    break;
                }
            }
            Envelope::Shutdown => break,
        }
    }
    debug!(rank, handled, "Worker stopped.");
}
