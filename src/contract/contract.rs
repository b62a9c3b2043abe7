//! Contract: a data request plus pipeline-wide execution hints.
//!
//! One contract is created per top-level update, threaded through each
//! filter's `modify_contract` on the downward pass (copy-on-forward: the
//! filter consumes the incoming value and returns its revision), and
//! discarded after the pass completes. Results are not contract-keyed at
//! this layer.

use crate::contract::request::DataRequest;

/// Whether dynamic load balancing is permitted for this pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadBalanceMode {
    #[default]
    Allowed,
    /// A filter could not predetermine the data extents it needs, so
    /// domains must be assigned statically for correctness.
    Disabled,
}

/// A data request plus cross-cutting execution hints.
#[derive(Clone, Debug, PartialEq)]
pub struct Contract {
    request: DataRequest,
    load_balance: LoadBalanceMode,
    /// Pass index, for diagnostics.
    pass: u64,
}

impl Contract {
    pub fn new(request: DataRequest) -> Self {
        Self {
            request,
            load_balance: LoadBalanceMode::Allowed,
            pass: 0,
        }
    }

    #[inline]
    pub fn request(&self) -> &DataRequest {
        &self.request
    }

    #[inline]
    pub fn request_mut(&mut self) -> &mut DataRequest {
        &mut self.request
    }

    /// Replace the request, keeping the execution hints.
    pub fn with_request(mut self, request: DataRequest) -> Self {
        self.request = request;
        self
    }

    pub fn should_use_load_balancing(&self) -> bool {
        self.load_balance == LoadBalanceMode::Allowed
    }

    /// Disable dynamic load balancing for this pass. Called by filters
    /// that must know extents before deciding per-domain work but cannot
    /// obtain them without executing first. Never re-enabled within a
    /// pass.
    pub fn no_dynamic_load_balancing(&mut self) {
        if self.load_balance == LoadBalanceMode::Allowed {
            log::debug!("dynamic load balancing disabled for this pass");
        }
        self.load_balance = LoadBalanceMode::Disabled;
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn set_pass(&mut self, pass: u64) {
        self.pass = pass;
    }
}
