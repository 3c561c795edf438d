//! Authenticator
//!
//! Pluggable policy deciding whether sessions are challenged, accepted or
//! rejected. Credential validation lives in the implementation; the core
//! only carries its decisions to the client.

use crate::error::Result;
use super::SessionProxy;

/// Authentication policy supplied by the deployment
pub trait Authenticator: Send {
    /// A client asked to connect with `encoded_credentials`
    fn on_connect_request(&mut self, session_id: i64, encoded_credentials: &[u8], now_ms: i64);

    /// A challenged client answered with `encoded_credentials`
    fn on_challenge_response(&mut self, session_id: i64, encoded_credentials: &[u8], now_ms: i64);

    /// Polled each duty cycle for a CONNECTED session
    fn on_connected_session(&mut self, proxy: &mut SessionProxy<'_>, now_ms: i64) -> Result<()>;

    /// Polled each duty cycle for a CHALLENGED session
    fn on_challenged_session(&mut self, proxy: &mut SessionProxy<'_>, now_ms: i64) -> Result<()>;
}

/// Accepts every session with an empty principal
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuthenticator;

impl Authenticator for NullAuthenticator {
    fn on_connect_request(&mut self, _session_id: i64, _encoded_credentials: &[u8], _now_ms: i64) {}

    fn on_challenge_response(&mut self, _session_id: i64, _encoded_credentials: &[u8], _now_ms: i64) {}

    fn on_connected_session(&mut self, proxy: &mut SessionProxy<'_>, _now_ms: i64) -> Result<()> {
        proxy.authenticate(&[])
    }

    fn on_challenged_session(&mut self, proxy: &mut SessionProxy<'_>, _now_ms: i64) -> Result<()> {
        proxy.authenticate(&[])
    }
}
