//! Process-wide holder for the AgentKit client.
//!
//! The first caller builds the client; concurrent first callers wait on the
//! same initialization and every later call returns the same `Arc`. A failed
//! initialization leaves the cell empty so the next call tries again.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
    lib::errors::ClientError,
    server::config::{AgentKitSection, Credentials},
};

use super::{AgentKitClient, RuntimeApi};

type ClientFactory = Box<dyn Fn() -> Result<Arc<dyn RuntimeApi>, ClientError> + Send + Sync>;

pub struct ClientAccessor {
    cell: OnceCell<Arc<dyn RuntimeApi>>,
    factory: ClientFactory,
    initializations: AtomicUsize,
}

impl ClientAccessor {
    /// Build clients from the process environment and `settings`.
    pub fn from_env(settings: AgentKitSection) -> Self {
        Self::with_factory(move || {
            let credentials = Credentials::from_env()?;
            info!(
                target: "agentkit_mcp::client",
                access_key = %credentials.access_key_hint(),
                region = %credentials.region.value,
                host = %credentials.host.value,
                service = %credentials.service.value,
                "Creating AgentKit client"
            );
            let client = AgentKitClient::new(&credentials, &settings)?;
            Ok(Arc::new(client) as Arc<dyn RuntimeApi>)
        })
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RuntimeApi>, ClientError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
            initializations: AtomicUsize::new(0),
        }
    }

    /// Wrap an already-built client (tests, embedding).
    pub fn with_client(client: Arc<dyn RuntimeApi>) -> Self {
        Self::with_factory(move || Ok(client.clone()))
    }

    /// Return the shared client, creating it on first use.
    pub async fn get_client(&self) -> Result<Arc<dyn RuntimeApi>, ClientError> {
        self.cell
            .get_or_try_init(|| async {
                self.initializations.fetch_add(1, Ordering::SeqCst);
                (self.factory)().map_err(|err| {
                    warn!(
                        target: "agentkit_mcp::client",
                        reason = %err,
                        "AgentKit client initialization failed"
                    );
                    err
                })
            })
            .await
            .cloned()
    }

    /// How many times the factory ran.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
