use std::time::Duration;

use anyhow::{Result, anyhow};
use surf::Config;
use surf_governor::GovernorMiddleware;

pub const USER_AGENT: &str = concat!("triptrace/", env!("CARGO_PKG_VERSION"));

/// A client with a request timeout and, if given, a rate limit in requests per second.
pub fn client(timeout: Duration, per_second: Option<u32>) -> Result<surf::Client> {
  let client: surf::Client = Config::new()
    .set_timeout(Some(timeout))
    .try_into()
    .map_err(|e| anyhow!("Failed to create http client: {e}"))?;
  let Some(per_second) = per_second.filter(|n| *n > 0) else {
    return Ok(client);
  };
  match GovernorMiddleware::per_second(per_second) {
    Ok(governor) => Ok(client.with(governor)),
    Err(_) => {
      log::warn!("Invalid rate limit of {per_second} requests per second, not limiting.");
      Ok(client)
    }
  }
}
