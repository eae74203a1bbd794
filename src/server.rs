//! Shared server descriptors maintained by the monitor
//!
//! One [`Server`] exists per configured database server and is shared between
//! the monitor (writer) and every router session (readers). The role/status
//! word and replication lag use sequentially consistent ordering so a session
//! never routes on a torn topology view; the selection gauges are advisory
//! and use relaxed ordering.

use crate::types::ServerName;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

/// Server status bits, as published by the monitor
pub mod status {
    /// Server is reachable
    pub const RUNNING: u32 = 1 << 0;
    /// Server holds the master role
    pub const MASTER: u32 = 1 << 1;
    /// Server holds a slave role
    pub const SLAVE: u32 = 1 << 2;
    /// Server relays replication downstream
    pub const RELAY: u32 = 1 << 3;
    /// Server is in maintenance and must not be chosen
    pub const MAINT: u32 = 1 << 4;
}

/// Replication lag sentinel: the monitor has not measured this server
pub const RLAG_UNKNOWN: i32 = -1;

/// Monitor-maintained descriptor of one database server
///
/// Identity fields are immutable; everything else is written by the monitor
/// and read by router sessions.
#[derive(Debug)]
pub struct Server {
    name: ServerName,
    address: String,
    port: u16,
    status: AtomicU32,
    replication_lag: AtomicI32,
    depth: AtomicI32,
    /// Global client connections to this server
    connections: AtomicU64,
    /// Connections opened by this router service
    router_connections: AtomicU64,
    /// Statements currently awaiting a reply on this server
    current_ops: AtomicU64,
    /// Smoothed response time in microseconds, fed by the codec
    response_time_us: AtomicU64,
}

impl Server {
    /// Create a descriptor for a reachable server with no role yet
    #[must_use]
    pub fn new(name: ServerName, address: String, port: u16) -> Self {
        Self {
            name,
            address,
            port,
            status: AtomicU32::new(status::RUNNING),
            replication_lag: AtomicI32::new(RLAG_UNKNOWN),
            depth: AtomicI32::new(0),
            connections: AtomicU64::new(0),
            router_connections: AtomicU64::new(0),
            current_ops: AtomicU64::new(0),
            response_time_us: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &ServerName {
        &self.name
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Raw status word
    #[must_use]
    pub fn status(&self) -> u32 {
        self.status.load(Ordering::SeqCst)
    }

    /// Monitor-side: replace the status word
    pub fn set_status(&self, status: u32) {
        self.status.store(status, Ordering::SeqCst);
    }

    /// Running, not in maintenance
    #[must_use]
    pub fn is_active(&self) -> bool {
        let s = self.status();
        s & status::RUNNING != 0 && s & status::MAINT == 0
    }

    /// Active and holding the master role
    #[must_use]
    pub fn is_master(&self) -> bool {
        let s = self.status();
        s & status::RUNNING != 0 && s & status::MAINT == 0 && s & status::MASTER != 0
    }

    /// Active and holding a slave role
    #[must_use]
    pub fn is_slave(&self) -> bool {
        let s = self.status();
        s & status::RUNNING != 0 && s & status::MAINT == 0 && s & status::SLAVE != 0
    }

    /// Active relay server
    #[must_use]
    pub fn is_relay(&self) -> bool {
        let s = self.status();
        s & status::RUNNING != 0 && s & status::MAINT == 0 && s & status::RELAY != 0
    }

    /// Human-readable status, used in routing failure messages
    #[must_use]
    pub fn describe_status(&self) -> String {
        let s = self.status();
        if s & status::RUNNING == 0 {
            return "Down".to_string();
        }
        let mut parts = Vec::new();
        if s & status::MAINT != 0 {
            parts.push("Maintenance");
        }
        if s & status::MASTER != 0 {
            parts.push("Master");
        }
        if s & status::SLAVE != 0 {
            parts.push("Slave");
        }
        if s & status::RELAY != 0 {
            parts.push("Relay");
        }
        parts.push("Running");
        parts.join(", ")
    }

    /// Replication lag in seconds, `None` while unmeasured
    #[must_use]
    pub fn replication_lag(&self) -> Option<i32> {
        match self.replication_lag.load(Ordering::SeqCst) {
            RLAG_UNKNOWN => None,
            lag => Some(lag),
        }
    }

    /// Monitor-side: publish the measured lag
    pub fn set_replication_lag(&self, seconds: i32) {
        self.replication_lag.store(seconds, Ordering::SeqCst);
    }

    /// Replication depth below the root master
    #[must_use]
    pub fn depth(&self) -> i32 {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn set_depth(&self, depth: i32) {
        self.depth.store(depth, Ordering::SeqCst);
    }

    #[must_use]
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        self.router_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
        self.router_connections.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn router_connections(&self) -> u64 {
        self.router_connections.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_ops(&self) -> u64 {
        self.current_ops.load(Ordering::Relaxed)
    }

    pub fn op_started(&self) {
        self.current_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn op_finished(&self) {
        // Saturating: a backend torn down mid-reply may ack without a start
        let _ = self
            .current_ops
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Smoothed response time in microseconds for adaptive routing
    #[must_use]
    pub fn response_time_us(&self) -> u64 {
        self.response_time_us.load(Ordering::Relaxed)
    }

    pub fn set_response_time_us(&self, us: u64) {
        self.response_time_us.store(us, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server::new(
            ServerName::new("server1".to_string()).unwrap(),
            "127.0.0.1".to_string(),
            3306,
        )
    }

    #[test]
    fn test_new_server_is_running_without_role() {
        let s = server();
        assert!(s.is_active());
        assert!(!s.is_master());
        assert!(!s.is_slave());
    }

    #[test]
    fn test_role_transitions() {
        let s = server();
        s.set_status(status::RUNNING | status::MASTER);
        assert!(s.is_master());
        assert!(!s.is_slave());

        // Monitor demotes master to slave
        s.set_status(status::RUNNING | status::SLAVE);
        assert!(!s.is_master());
        assert!(s.is_slave());
    }

    #[test]
    fn test_maintenance_masks_roles() {
        let s = server();
        s.set_status(status::RUNNING | status::MASTER | status::MAINT);
        assert!(!s.is_master());
        assert!(!s.is_active());
    }

    #[test]
    fn test_replication_lag_sentinel() {
        let s = server();
        assert_eq!(s.replication_lag(), None);
        s.set_replication_lag(12);
        assert_eq!(s.replication_lag(), Some(12));
        s.set_replication_lag(RLAG_UNKNOWN);
        assert_eq!(s.replication_lag(), None);
    }

    #[test]
    fn test_current_ops_never_underflows() {
        let s = server();
        s.op_finished();
        assert_eq!(s.current_ops(), 0);
        s.op_started();
        s.op_finished();
        assert_eq!(s.current_ops(), 0);
    }

    #[test]
    fn test_describe_status() {
        let s = server();
        s.set_status(status::RUNNING | status::SLAVE);
        assert_eq!(s.describe_status(), "Slave, Running");
        s.set_status(0);
        assert_eq!(s.describe_status(), "Down");
    }
}
