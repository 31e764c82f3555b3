//! Redis backend
//!
//! Uses plain `GEOADD`, `GEOSEARCH ... FROMLONLAT ... BYRADIUS`, `GEOPOS`
//! and `DEL`. Search results are member names only; coordinates and
//! distances are resolved by the adapter.

use super::connection::{Admission, ConnectionMachine, ConnectionState};
use super::GeoStore;
use crate::error::{LocatorError, Result};
use async_trait::async_trait;
use geofinder_core::config::StoreConfig;
use geofinder_core::retry::ReconnectPolicy;
use geofinder_geo::Coordinate;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue, RedisError};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

struct Link {
    machine: ConnectionMachine,
    connection: Option<MultiplexedConnection>,
}

/// Redis geo store over one shared multiplexed connection
pub struct RedisGeoStore {
    client: Client,
    url: String,
    link: Mutex<Link>,
    cycle: watch::Sender<u64>,
}

#[derive(Clone, Copy)]
enum Access {
    Read,
    Write,
}

impl RedisGeoStore {
    /// Build from configuration. Nothing connects until the first call.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.url, config.reconnect_policy(), config.revive_after())
    }

    pub fn new(url: &str, policy: ReconnectPolicy, revive_after: Duration) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| LocatorError::StoreUnavailable(format!("invalid store url {url}: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            link: Mutex::new(Link {
                machine: ConnectionMachine::new(policy, revive_after),
                connection: None,
            }),
            cycle: watch::channel(0).0,
        })
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.link.lock().await.machine.state()
    }

    /// A live connection, connecting first when needed.
    ///
    /// The link lock is only held to read or move the state machine, never
    /// across a connect attempt or a backoff sleep. Callers that find an
    /// ordinary connect in flight wait for its outcome, bounded by the
    /// connect timeout. Callers that find a revival in flight fail at once.
    async fn connection(&self, probe: bool) -> Result<MultiplexedConnection> {
        loop {
            let (mut outcome, timeout) = {
                let mut link = self.link.lock().await;
                if link.machine.state() == ConnectionState::Connected {
                    if let Some(connection) = &link.connection {
                        return Ok(connection.clone());
                    }
                }

                let policy = *link.machine.policy();
                let admission = link.machine.admit(Instant::now(), probe)?;
                match admission {
                    Admission::Start => {
                        link.machine.begin();
                        drop(link);
                        return self.connect_cycle(policy).await;
                    }
                    Admission::Wait => (self.cycle.subscribe(), policy.connect_timeout),
                }
            };

            if tokio::time::timeout(timeout, outcome.changed()).await.is_err() {
                return Err(LocatorError::StoreUnavailable(format!(
                    "store connect still in progress after {}ms",
                    timeout.as_millis()
                )));
            }
        }
    }

    /// Run connect attempts until one succeeds or the policy gives up.
    async fn connect_cycle(&self, policy: ReconnectPolicy) -> Result<MultiplexedConnection> {
        let timeout = policy.connect_timeout;
        let mut attempt = 0u32;
        loop {
            debug!(url = %self.url, attempt, of = policy.total_attempts(), "Connecting to store");

            let outcome =
                tokio::time::timeout(timeout, self.client.get_multiplexed_async_connection()).await;
            let reason = match outcome {
                Ok(Ok(connection)) => {
                    let mut link = self.link.lock().await;
                    if !matches!(link.machine.state(), ConnectionState::Connecting { .. }) {
                        self.finish_cycle();
                        return Err(LocatorError::StoreUnavailable(
                            "store closed while connecting".to_string(),
                        ));
                    }
                    link.machine.connected();
                    link.connection = Some(connection.clone());
                    self.finish_cycle();
                    info!(url = %self.url, attempt, "Store connected");
                    return Ok(connection);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("connect timed out after {}ms", timeout.as_millis()),
            };

            let delay = {
                let mut link = self.link.lock().await;
                if !matches!(link.machine.state(), ConnectionState::Connecting { .. }) {
                    self.finish_cycle();
                    return Err(LocatorError::StoreUnavailable(reason));
                }
                let delay = link.machine.attempt_failed(Instant::now());
                if delay.is_none() {
                    link.connection = None;
                    self.finish_cycle();
                }
                delay
            };

            match delay {
                Some(delay) => {
                    attempt += 1;
                    warn!(
                        url = %self.url,
                        retry = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Store connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(url = %self.url, error = %reason, "Store reconnects exhausted, marking dead");
                    return Err(LocatorError::StoreUnavailable(reason));
                }
            }
        }
    }

    /// Wake callers waiting on the cycle that just ended
    fn finish_cycle(&self) {
        self.cycle.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    async fn run<T: FromRedisValue>(&self, cmd: &Cmd, access: Access, probe: bool) -> Result<T> {
        let mut connection = self.connection(probe).await?;
        match cmd.query_async(&mut connection).await {
            Ok(value) => Ok(value),
            Err(e) if is_transport_error(&e) => {
                let mut link = self.link.lock().await;
                link.machine.lost();
                link.connection = None;
                warn!(url = %self.url, error = %e, "Store connection lost");
                Err(LocatorError::StoreUnavailable(e.to_string()))
            }
            Err(e) => Err(match access {
                Access::Read => LocatorError::StoreReadFailed(e.to_string()),
                Access::Write => LocatorError::StoreWriteFailed(e.to_string()),
            }),
        }
    }
}

fn is_transport_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// Pull `redis_version` out of an `INFO server` reply
fn parse_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("redis_version:"))
        .map(str::to_string)
}

#[async_trait]
impl GeoStore for RedisGeoStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<()> {
        let reply: String = self.run(&redis::cmd("PING"), Access::Read, true).await?;
        debug!(reply = %reply, "Store ping");
        Ok(())
    }

    async fn geo_add(&self, key: &str, coordinate: Coordinate, member: &str) -> Result<()> {
        let mut cmd = redis::cmd("GEOADD");
        cmd.arg(key)
            .arg(coordinate.longitude)
            .arg(coordinate.latitude)
            .arg(member);
        let _added: i64 = self.run(&cmd, Access::Write, false).await?;
        Ok(())
    }

    async fn geo_search(&self, key: &str, center: Coordinate, radius_km: f64) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("GEOSEARCH");
        cmd.arg(key)
            .arg("FROMLONLAT")
            .arg(center.longitude)
            .arg(center.latitude)
            .arg("BYRADIUS")
            .arg(radius_km)
            .arg("km");
        self.run(&cmd, Access::Read, false).await
    }

    async fn geo_pos(&self, key: &str, member: &str) -> Result<Option<Coordinate>> {
        let mut cmd = redis::cmd("GEOPOS");
        cmd.arg(key).arg(member);
        let positions: Vec<Option<(f64, f64)>> = self.run(&cmd, Access::Read, false).await?;
        Ok(positions
            .into_iter()
            .next()
            .flatten()
            .map(|(longitude, latitude)| Coordinate::new(latitude, longitude)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let _removed: i64 = self.run(&cmd, Access::Write, false).await?;
        Ok(())
    }

    async fn server_version(&self) -> Result<String> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg("server");
        let info: String = self.run(&cmd, Access::Read, false).await?;
        parse_version(&info)
            .ok_or_else(|| LocatorError::StoreReadFailed("INFO reply has no redis_version".to_string()))
    }

    async fn close(&self) {
        let mut link = self.link.lock().await;
        if link.connection.take().is_some() {
            info!(url = %self.url, "Store connection closed");
        }
        link.machine.reset();
        drop(link);
        self.finish_cycle();
    }
}
