use super::error::PmiError;
use super::worker::{Envelope, Rank, Reply, Worker, serve};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, instrument, warn};

struct Link<W: Worker> {
    requests: Sender<Envelope<W::Request>>,
    replies: Receiver<Reply<W>>,
    thread: Option<JoinHandle<()>>,
}

/// Owner of a pool of worker ranks.
///
/// All operations take `&self`; concurrent callers are serialized so that request/reply
/// cycles never interleave.
pub struct Controller<W: Worker> {
    links: Mutex<Vec<Link<W>>>,
    size: usize,
}

impl<W: Worker> Controller<W> {
    /// Starts `size` workers, building each rank's state with `factory`.
    pub fn spawn<F>(size: usize, mut factory: F) -> Result<Self, PmiError<W::Error>>
    where
        F: FnMut(Rank) -> W,
    {
        if size == 0 {
            return Err(PmiError::EmptyPool);
        }

        let mut links = Vec::with_capacity(size);
        for rank in 0..size {
            let (request_tx, request_rx) = mpsc::channel();
            let (reply_tx, reply_rx) = mpsc::channel();
            let worker = factory(rank);
            let thread = thread::Builder::new()
                .name(format!("pmi-worker-{}", rank))
                .spawn(move || serve(rank, worker, request_rx, reply_tx))
                .map_err(|source| PmiError::Spawn { rank, source })?;
            links.push(Link {
                requests: request_tx,
                replies: reply_rx,
                thread: Some(thread),
            });
        }

        info!(size, "PMI worker pool started.");
        Ok(Self {
            links: Mutex::new(links),
            size,
        })
    }

    /// Number of worker ranks.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Broadcasts `request` to every rank and gathers the replies in rank order.
    ///
    /// If any rank fails, the remaining replies are still collected before the first
    /// failure is returned, so the next request starts from a consistent state.
    #[instrument(level = "trace", skip_all)]
    pub fn invoke(&self, request: W::Request) -> Result<Vec<W::Response>, PmiError<W::Error>> {
        let links = self.links.lock().unwrap_or_else(PoisonError::into_inner);

        let mut failure = None;
        let mut delivered = Vec::with_capacity(links.len());
        for (rank, link) in links.iter().enumerate() {
            let sent = link
                .requests
                .send(Envelope::Request(request.clone()))
                .is_ok();
            if !sent && failure.is_none() {
                failure = Some(PmiError::Disconnected { rank });
            }
            delivered.push(sent);
        }

        let mut responses = Vec::with_capacity(links.len());
        for (rank, link) in links.iter().enumerate() {
            if !delivered[rank] {
                continue;
            }
            match link.replies.recv() {
                Ok(Ok(response)) => responses.push(response),
                Ok(Err(source)) => {
                    warn!(rank, error = %source, "Worker reported a failure.");
                    if failure.is_none() {
                        failure = Some(PmiError::Remote { rank, source });
                    }
                }
                Err(_) => {
                    if failure.is_none() {
                        failure = Some(PmiError::Disconnected { rank });
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(responses),
        }
    }

    /// Broadcasts `request` and discards the replies.
    pub fn call(&self, request: W::Request) -> Result<(), PmiError<W::Error>> {
        self.invoke(request).map(|_| ())
    }

    /// Broadcasts `request` and folds the replies, in rank order, into a single value.
    pub fn reduce<T, F>(
        &self,
        request: W::Request,
        init: T,
        fold: F,
    ) -> Result<T, PmiError<W::Error>>
    where
        F: FnMut(T, W::Response) -> T,
    {
        Ok(self.invoke(request)?.into_iter().fold(init, fold))
    }

    /// Stops every worker and waits for its thread to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let links = self.links.get_mut().unwrap_or_else(PoisonError::into_inner);
        if links.is_empty() {
            return;
        }
        for link in links.iter() {
            let _ = link.requests.send(Envelope::Shutdown);
        }
        for (rank, link) in links.iter_mut().enumerate() {
            if let Some(handle) = link.thread.take() {
                if handle.join().is_err() {
                    warn!(rank, "Worker thread panicked.");
                }
            }
        }
        links.clear();
        debug!(size = self.size, "PMI worker pool stopped.");
    }
}

impl<W: Worker> Drop for Controller<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq)]
    #[error("rejected {0}")]
    struct Rejected(i64);

    #[derive(Clone)]
    enum EchoRequest {
        Add(i64),
        FailOn { rank: Rank, value: i64 },
        Panic,
    }

    struct EchoWorker {
        rank: Rank,
        total: i64,
    }

    impl Worker for EchoWorker {
        type Request = EchoRequest;
        type Response = (Rank, i64);
        type Error = Rejected;

        fn handle(&mut self, request: EchoRequest) -> Result<(Rank, i64), Rejected> {
            match request {
                EchoRequest::Add(value) => {
                    self.total += value;
                    Ok((self.rank, self.total))
                }
                EchoRequest::FailOn { rank, value } if rank == self.rank => Err(Rejected(value)),
                EchoRequest::FailOn { .. } => Ok((self.rank, self.total)),
                EchoRequest::Panic => panic!("worker {} asked to panic", self.rank),
            }
        }
    }

    fn pool(size: usize) -> Controller<EchoWorker> {
        Controller::spawn(size, |rank| EchoWorker { rank, total: 0 }).unwrap()
    }

    #[test]
    fn spawn_rejects_an_empty_pool() {
        let result = Controller::spawn(0, |rank| EchoWorker { rank, total: 0 });
        assert!(matches!(result, Err(PmiError::EmptyPool)));
    }

    #[test]
    fn invoke_gathers_replies_in_rank_order() {
        let controller = pool(4);
        assert_eq!(controller.size(), 4);
        let replies = controller.invoke(EchoRequest::Add(5)).unwrap();
        assert_eq!(replies, vec![(0, 5), (1, 5), (2, 5), (3, 5)]);
    }

    #[test]
    fn every_rank_sees_requests_in_issue_order() {
        let controller = pool(3);
        for value in 1..=10 {
            controller.call(EchoRequest::Add(value)).unwrap();
        }
        let replies = controller.invoke(EchoRequest::Add(0)).unwrap();
        assert!(replies.iter().all(|&(_, total)| total == 55));
    }

    #[test]
    fn reduce_folds_all_replies() {
        let controller = pool(3);
        let sum = controller
            .reduce(EchoRequest::Add(2), 0, |acc, (_, total)| acc + total)
            .unwrap();
        assert_eq!(sum, 6);
    }

    #[test]
    fn remote_failure_carries_rank_and_keeps_pool_in_step() {
        let controller = pool(3);
        let result = controller.invoke(EchoRequest::FailOn { rank: 1, value: 9 });
        match result {
            Err(PmiError::Remote { rank, source }) => {
                assert_eq!(rank, 1);
                assert_eq!(source, Rejected(9));
            }
            _ => panic!("expected a remote failure"),
        }

        let replies = controller.invoke(EchoRequest::Add(1)).unwrap();
        assert_eq!(replies, vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn panicking_worker_is_reported_as_disconnected() {
        let controller = pool(2);
        let result = controller.invoke(EchoRequest::Panic);
        let err = result.unwrap_err();
        assert!(matches!(err, PmiError::Disconnected { .. }));
        assert!(err.rank().is_some());
    }

    #[test]
    fn shutdown_joins_all_workers() {
        let controller = pool(2);
        controller.call(EchoRequest::Add(1)).unwrap();
        controller.shutdown();
    }
}
