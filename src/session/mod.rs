//! Session Authentication
//!
//! Client session admission through a challenge/response handshake gated
//! by the current leader.

mod cluster_session;
pub(crate) mod egress;
mod proxy;
mod auth;
mod table;

pub use cluster_session::{
    ClusterSession, EventCode, SessionState, MAX_ENCODED_PRINCIPAL_LENGTH, SESSION_REJECTED_MSG,
};
pub use egress::{EgressPublisher, TracingEgress};
pub use proxy::{LeaderContext, SessionProxy};
pub use auth::{Authenticator, NullAuthenticator};
pub use table::SessionTable;
