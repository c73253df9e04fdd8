//! Collaborators the host lends to the server.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Evaluator;
use crate::network::Network;

/// Node resolution and expression evaluation, shared with the server thread.
#[derive(Clone)]
pub struct ServerContext {
    network: Arc<dyn Network>,
    evaluator: Arc<dyn Evaluator>,
}

impl ServerContext {
    /// Bundles the host's collaborators.
    #[must_use]
    pub fn new(network: Arc<dyn Network>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self { network, evaluator }
    }

    /// Network used for node resolution and as the evaluation environment.
    #[must_use]
    pub fn network(&self) -> &dyn Network {
        self.network.as_ref()
    }

    /// Evaluator for expression commands.
    #[must_use]
    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("nodes", &self.network.node_names())
            .finish_non_exhaustive()
    }
}
