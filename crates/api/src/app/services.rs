//! Shared handles injected into every handler via `Extension<Arc<AppServices>>`.

use std::sync::Arc;
use std::time::Duration;

use depot_auth::Hs256JwtValidator;
use depot_infra::{OpContext, Store, TransferEngine};

use crate::context::PrincipalContext;

pub struct AppServices {
    pub store: Store,
    pub engine: TransferEngine,
    pub jwt: Arc<Hs256JwtValidator>,
    /// Deadline budget for each Transfer Engine call.
    pub op_timeout: Duration,
}

impl AppServices {
    pub fn new(store: Store, jwt: Arc<Hs256JwtValidator>, op_timeout: Duration) -> Self {
        Self {
            engine: store.engine(),
            store,
            jwt,
            op_timeout,
        }
    }

    /// Engine context attributing the call to `principal`, bounded by the
    /// configured operation timeout.
    pub fn op_context(&self, principal: &PrincipalContext) -> OpContext {
        OpContext::new(Some(principal.user_id())).with_timeout(self.op_timeout)
    }
}
