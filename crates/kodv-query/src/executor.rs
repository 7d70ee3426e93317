//! Runs assembled queries against the graph store.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::envelope::Outcome;
use crate::error::StoreError;
use crate::namespaces::AssembledQuery;
use crate::results::SelectResults;
use crate::store::GraphStore;

#[derive(Clone)]
pub struct GraphExecutor {
    store: Arc<dyn GraphStore>,
}

impl GraphExecutor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Exactly one store round trip. Row order is the store's.
    pub async fn execute(&self, query: &AssembledQuery) -> Result<SelectResults, StoreError> {
        let started = Instant::now();
        debug!(endpoint = self.store.endpoint(), query = %query, "executing SPARQL");

        match self.store.select(query.as_str()).await {
            Ok(results) => {
                debug!(
                    rows = results.bindings().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "store returned"
                );
                Ok(results)
            }
            Err(err) => {
                warn!(endpoint = self.store.endpoint(), error = %err, "store query failed");
                Err(err)
            }
        }
    }

    /// Like [`execute`](Self::execute) for queries designed to return one
    /// record. No rows, or a single row with nothing bound (all-OPTIONAL
    /// patterns over a missing subject), is [`Outcome::Empty`].
    pub async fn lookup_one(&self, query: &AssembledQuery) -> Result<Outcome, StoreError> {
        let results = self.execute(query).await?;
        let unbound = results.bindings().iter().all(|b| b.is_empty());
        if results.is_empty() || unbound {
            return Ok(Outcome::Empty);
        }
        Ok(Outcome::Rows {
            sparql: None,
            results,
        })
    }
}
