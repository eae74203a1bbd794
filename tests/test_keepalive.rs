//! Connection keepalive pings under a paused clock.


use rwsplit_proxy::config::RouterConfig;
use std::time::Duration;
use test_helpers::*;

const MASTER: usize = 0;
const SLAVE1: usize = 1;
const SLAVE2: usize = 2;

fn keepalive_config(seconds: u64) -> RouterConfig {
    RouterConfig {
        connection_keepalive: seconds,
        ..RouterConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_idle_backends_pinged_when_interval_exceeded() {
    let mut h = harness(keepalive_config(30));

    tokio::time::advance(Duration::from_secs(45)).await;

    // Dispatching one read pings every other idle backend
    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    let target = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");
    let other = if target == SLAVE1 { SLAVE2 } else { SLAVE1 };

    assert_eq!(h.backend_logs[MASTER].ping_count(), 1);
    assert_eq!(h.backend_logs[other].ping_count(), 1);
    assert_eq!(h.backend_logs[target].ping_count(), 0);

    // Pings are ignorable: they never count as expected responses
    assert_eq!(h.session.expected_responses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_pings_within_interval() {
    let mut h = harness(keepalive_config(30));

    tokio::time::advance(Duration::from_secs(10)).await;

    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    for log in &h.backend_logs {
        assert_eq!(log.ping_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_disables_keepalive() {
    let mut h = harness(keepalive_config(0));

    tokio::time::advance(Duration::from_secs(3600)).await;

    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    for log in &h.backend_logs {
        assert_eq!(log.ping_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_busy_backend_not_pinged() {
    let mut h = harness(keepalive_config(30));

    // Leave a read outstanding on one slave
    assert!(h.session.route_query(select_stmt("SELECT slow")).await);
    let busy = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");

    tokio::time::advance(Duration::from_secs(45)).await;

    // A write to the master pings only the idle slave
    assert!(h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
    let idle = if busy == SLAVE1 { SLAVE2 } else { SLAVE1 };
    assert_eq!(h.backend_logs[busy].ping_count(), 0);
    assert_eq!(h.backend_logs[idle].ping_count(), 1);
    assert_eq!(h.backend_logs[MASTER].ping_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recent_reply_resets_idle_clock() {
    let mut h = harness(keepalive_config(30));

    tokio::time::advance(Duration::from_secs(25)).await;

    // SLAVE1-or-2 answers a read, refreshing its last_read stamp
    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    let fresh = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");
    h.reply_ok(fresh).await;

    tokio::time::advance(Duration::from_secs(20)).await;

    // 45s total: master and the untouched slave are overdue, the slave that
    // replied 20s ago is not
    assert!(h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
    assert_eq!(h.backend_logs[fresh].ping_count(), 0);
    let stale = if fresh == SLAVE1 { SLAVE2 } else { SLAVE1 };
    assert_eq!(h.backend_logs[stale].ping_count(), 1);
}
