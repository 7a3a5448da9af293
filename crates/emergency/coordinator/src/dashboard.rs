//! Emergency dispatch dashboard state
//!
//! Holds the list the UI renders and refreshes it on a timer. Fetches may
//! overlap (a timer tick while a manual refresh is in flight); only the
//! most recently issued fetch is allowed to replace the list.

use std::sync::Arc;
use std::time::Duration;

use emergency_integrity::{aggregate, derive_metrics, EmergencyFilter, EmergencyMetrics, EmergencyRequest, EmergencyStatistics};
use idms_shared::api::Backend;
use idms_shared::polling::{Poller, ResponseSequencer};
use idms_shared::{IdmsError, IdmsResult};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::EmergencyService;

struct DashboardState {
    filter: EmergencyFilter,
    requests: Vec<EmergencyRequest>,
    last_error: Option<IdmsError>,
}

struct Shared<B: Backend> {
    service: EmergencyService<B>,
    state: RwLock<DashboardState>,
    sequencer: ResponseSequencer,
}

impl<B: Backend> Shared<B> {
    async fn refresh(&self) -> IdmsResult<()> {
        let ticket = self.sequencer.issue();
        let filter = self.state.read().filter.clone();
        let result = self.service.list(&filter).await;

        let mut state = self.state.write();
        if !self.sequencer.accept(ticket) {
            debug!(?ticket, "discarding stale emergency list response");
            return Ok(());
        }
        match result {
            Ok(requests) => {
                state.requests = requests;
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "emergency list refresh failed");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

/// Live list of emergency requests with an optional refresh timer
pub struct EmergencyDashboard<B: Backend + 'static> {
    shared: Arc<Shared<B>>,
    poller: Option<Poller>,
}

impl<B: Backend + 'static> EmergencyDashboard<B> {
    pub fn new(service: EmergencyService<B>) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                state: RwLock::new(DashboardState {
                    filter: EmergencyFilter::default(),
                    requests: Vec::new(),
                    last_error: None,
                }),
                sequencer: ResponseSequencer::new(),
            }),
            poller: None,
        }
    }

    pub fn service(&self) -> &EmergencyService<B> {
        &self.shared.service
    }

    /// Fetch the list now. A response overtaken by a later fetch is dropped.
    pub async fn refresh(&self) -> IdmsResult<()> {
        self.shared.refresh().await
    }

    /// Change the filter and refetch
    pub async fn set_filter(&self, filter: EmergencyFilter) -> IdmsResult<()> {
        self.shared.state.write().filter = filter;
        self.refresh().await
    }

    pub fn filter(&self) -> EmergencyFilter {
        self.shared.state.read().filter.clone()
    }

    pub fn requests(&self) -> Vec<EmergencyRequest> {
        self.shared.state.read().requests.clone()
    }

    pub fn last_error(&self) -> Option<IdmsError> {
        self.shared.state.read().last_error.clone()
    }

    /// Swap in a record the backend returned after a transition.
    ///
    /// Counts as the newest response, so a list fetch issued before it can
    /// no longer overwrite the record when it lands.
    pub fn replace(&self, updated: EmergencyRequest) {
        let mut state = self.shared.state.write();
        let ticket = self.shared.sequencer.issue();
        self.shared.sequencer.accept(ticket);
        match state.requests.iter_mut().find(|request| request.id == updated.id) {
            Some(slot) => *slot = updated,
            None => state.requests.insert(0, updated),
        }
    }

    pub fn stats(&self) -> EmergencyStatistics {
        aggregate(&self.shared.state.read().requests)
    }

    pub fn metrics(&self) -> EmergencyMetrics {
        derive_metrics(&self.stats())
    }

    /// Refresh every `period` until [`stop_polling`](Self::stop_polling) or drop.
    ///
    /// Must be called inside a tokio runtime. Restarting replaces the old timer.
    pub fn start_polling(&mut self, period: Duration) {
        let shared = self.shared.clone();
        self.poller = Some(Poller::start(period, move || {
            let shared = shared.clone();
            async move {
                // failures are recorded in last_error
                let _ = shared.refresh().await;
            }
        }));
    }

    pub fn stop_polling(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().map_or(false, Poller::is_running)
    }
}
