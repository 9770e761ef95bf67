use std::sync::Arc;

use axum::extract::FromRef;
use empowerhub_core::Hub;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub hub: Arc<Hub>,
}
