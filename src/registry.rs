use crate::cancel::CancellationToken;
use crate::request::RequestId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Requests in flight, by id.
///
/// The registry only needs the cancellation token of each request. The pipeline itself
/// is owned by the worker driving it.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    in_flight: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl Registry {
    pub fn contains(&self, id: RequestId) -> bool {
        self.in_flight.lock().unwrap().contains_key(&id)
    }

    /// Register a request. Returns `false` if the id is already in flight, in which
    /// case the registry is left untouched.
    pub fn register(&self, id: RequestId, token: CancellationToken) -> bool {
        let mut lock = self.in_flight.lock().unwrap();

        if lock.contains_key(&id) {
            return false;
        }

        lock.insert(id, token);
        trace!("Registered request {} ({} in flight)", id, lock.len());

        true
    }

    /// Remove a finished request.
    pub fn unregister(&self, id: RequestId, token: &CancellationToken) {
        let mut lock = self.in_flight.lock().unwrap();

        // ids are unique while in flight, but never remove an entry that isn't ours.
        let ours = lock.get(&id).map(|t| t.same_as(token)).unwrap_or(false);

        if ours {
            lock.remove(&id);
        }

        trace!("Unregistered request {} ({} in flight)", id, lock.len());
    }

    /// Cancel the request with `id`. Returns `false` if there is no such request in flight.
    pub fn cancel(&self, id: RequestId) -> bool {
        let lock = self.in_flight.lock().unwrap();

        if let Some(token) = lock.get(&id) {
            debug!("Cancel request {}", id);
            token.cancel();
            true
        } else {
            trace!("Cancel unknown request {}", id);
            false
        }
    }

    pub fn cancel_all(&self) {
        let lock = self.in_flight.lock().unwrap();

        for (id, token) in lock.iter() {
            debug!("Cancel request {}", id);
            token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}
