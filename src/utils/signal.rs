//! Signal handling for graceful shutdown

use crate::utils::clock::CancelToken;

/// Fire the returned token on Ctrl-C
///
/// Readers sharing the token stop at their next sleep or read, and their
/// guards still put the sensor to sleep.
pub fn cancel_on_ctrl_c() -> Result<CancelToken, ctrlc::Error> {
    let token = CancelToken::new();
    let handler = token.clone();
    ctrlc::set_handler(move || {
        log::debug!("interrupted");
        handler.cancel();
    })?;
    Ok(token)
}
