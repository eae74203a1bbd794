//! Master failover behavior and backend failure handling.


use rwsplit_proxy::config::{MasterFailureMode, RouterConfig};
use rwsplit_proxy::router::{ClientInfo, RwSplitService};
use rwsplit_proxy::server::status;
use rwsplit_proxy::sink::{BackendSink, ER_LOST_CONNECTION, ER_OPTION_PREVENTS_STATEMENT};
use rwsplit_proxy::types::BackendId;
use std::sync::Arc;
use test_helpers::*;

const MASTER: usize = 0;
const SLAVE1: usize = 1;
const SLAVE2: usize = 2;

/// Monitor demotes server1 and promotes server2 while the session is idle
fn fail_over(h: &Harness) {
    h.server(MASTER).set_status(status::RUNNING | status::SLAVE);
    h.server(SLAVE1).set_status(status::RUNNING | status::MASTER);
}

#[tokio::test]
async fn test_error_on_write_returns_read_only_error() {
    let config = RouterConfig {
        master_failure_mode: MasterFailureMode::ErrorOnWrite,
        ..quiet_config()
    };
    let mut h = harness(config);
    fail_over(&h);

    // The write is answered with a read-only error; the session survives
    assert!(h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
    assert_eq!(h.client_log.error_codes(), vec![ER_OPTION_PREVENTS_STATEMENT]);

    // The stale master connection was closed
    assert!(!h.session.backends()[MASTER].in_use());
    assert_eq!(h.backend_logs[MASTER].sent_count(), 0);

    // Reads continue on the remaining consistent slave
    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    assert_eq!(h.backend_logs[SLAVE2].sent_count(), 1);
}

#[tokio::test]
async fn test_fail_instantly_closes_session_on_write() {
    let mut h = harness(quiet_config());
    fail_over(&h);

    // "Master server changed from 'server1' to 'server2'": fatal
    assert!(!h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
    assert_eq!(h.backend_logs[MASTER].sent_count(), 0);
    assert_eq!(h.backend_logs[SLAVE1].sent_count(), 0);
}

#[tokio::test]
async fn test_fail_instantly_refuses_session_without_master() {
    let servers = master_slave_servers(2);
    servers[MASTER].set_status(status::RUNNING | status::SLAVE);

    let service = RwSplitService::new(
        "no-master".to_string(),
        quiet_config(),
        servers,
    );
    let sinks: Vec<Box<dyn BackendSink>> = (0..3)
        .map(|_| {
            Box::new(MockBackendSink {
                log: Arc::new(BackendLog::default()),
            }) as Box<dyn BackendSink>
        })
        .collect();
    let client = Box::new(MockClientSink {
        log: Arc::new(ClientLog::default()),
    });

    assert!(service.new_session(client, ClientInfo::default(), sinks).is_none());
}

#[tokio::test]
async fn test_fail_on_write_allows_read_only_session() {
    let servers = master_slave_servers(2);
    servers[MASTER].set_status(status::RUNNING | status::SLAVE);
    let config = RouterConfig {
        master_failure_mode: MasterFailureMode::FailOnWrite,
        ..quiet_config()
    };
    let mut h = harness_with_servers(config, servers);
    assert_eq!(h.session.current_master(), None);

    // Reads work without a master
    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    let read_backend = h
        .last_statement_backend(&[MASTER, SLAVE1, SLAVE2])
        .expect("read dispatched");
    h.reply_ok(read_backend).await;

    // Writes fail: "Session is in read-only mode because it was created
    // when no master was available"
    assert!(!h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
}

#[tokio::test]
async fn test_master_connection_loss_reported_on_next_write() {
    let mut h = harness(quiet_config());

    // The master connection dies while the session is idle
    assert!(
        h.session
            .handle_connection_closed(BackendId::from_index(MASTER))
            .await
    );
    assert!(!h.session.backends()[MASTER].in_use());

    // Reads still work
    assert!(h.session.route_query(select_stmt("SELECT 1")).await);
    let read_backend = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");
    h.reply_ok(read_backend).await;

    // The next write fails: the connection to the master is not available
    assert!(!h.session.route_query(insert_stmt("INSERT INTO t VALUES(1)")).await);
}

#[tokio::test]
async fn test_failed_read_retries_on_another_slave() {
    let mut h = harness(quiet_config());

    assert!(h.session.route_query(select_stmt("SELECT slow")).await);
    let busy = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");
    assert_eq!(h.session.expected_responses(), 1);

    // The slave dies mid-statement; the stored statement is retried
    assert!(
        h.session
            .handle_connection_closed(BackendId::from_index(busy))
            .await
    );
    assert!(!h.session.backends()[busy].in_use());

    let other = if busy == SLAVE1 { SLAVE2 } else { SLAVE1 };
    assert_eq!(h.backend_logs[other].sent_count(), 1);
    assert_eq!(
        h.backend_logs[other].sent_payloads()[0],
        h.backend_logs[busy].sent_payloads()[0]
    );
    assert_eq!(h.session.expected_responses(), 1);

    // The client only ever sees the retried backend's reply
    h.reply_ok(other).await;
    assert_eq!(h.client_log.reply_count(), 1);
    assert!(h.client_log.error_codes().is_empty());
}

#[tokio::test]
async fn test_failed_read_without_retry_reports_error() {
    let config = RouterConfig {
        retry_failed_reads: false,
        ..quiet_config()
    };
    let mut h = harness(config);

    assert!(h.session.route_query(select_stmt("SELECT slow")).await);
    let busy = h
        .last_statement_backend(&[SLAVE1, SLAVE2])
        .expect("read dispatched");

    assert!(
        !h.session
            .handle_connection_closed(BackendId::from_index(busy))
            .await
    );
    assert_eq!(h.client_log.error_codes(), vec![ER_LOST_CONNECTION]);
}

#[tokio::test]
async fn test_pinned_slave_loss_fails_read_only_transaction() {
    let mut h = harness(quiet_config());

    assert!(h.session.route_query(begin_read_only_stmt()).await);
    let pinned = h.session.target_node().expect("pinned").as_index();
    h.reply_ok(pinned).await;

    assert!(
        !h.session
            .handle_connection_closed(BackendId::from_index(pinned))
            .await
    );
    assert_eq!(h.client_log.error_codes(), vec![ER_LOST_CONNECTION]);
    assert_eq!(h.session.target_node(), None);
}
