//! Property tests for the route decider.

use proptest::prelude::*;
use rwsplit_proxy::classify::QueryType;
use rwsplit_proxy::config::UseSqlVariablesIn;
use rwsplit_proxy::hint::Hint;
use rwsplit_proxy::router::{RoutingContext, TrxState, get_route_target};
use rwsplit_proxy::statement::Statement;

const FLAGS: &[QueryType] = &[
    QueryType::READ,
    QueryType::WRITE,
    QueryType::MASTER_READ,
    QueryType::SESSION_WRITE,
    QueryType::USERVAR_READ,
    QueryType::USERVAR_WRITE,
    QueryType::SYSVAR_READ,
    QueryType::GSYSVAR_READ,
    QueryType::GSYSVAR_WRITE,
    QueryType::SHOW_TABLES,
    QueryType::BEGIN_TRX,
    QueryType::COMMIT,
    QueryType::ROLLBACK,
    QueryType::ENABLE_AUTOCOMMIT,
    QueryType::DISABLE_AUTOCOMMIT,
    QueryType::CREATE_TMP_TABLE,
    QueryType::READ_TMP_TABLE,
    QueryType::PREPARE_NAMED_STMT,
    QueryType::PREPARE_STMT,
    QueryType::EXEC_STMT,
];

fn query_type() -> impl Strategy<Value = QueryType> {
    prop::collection::vec(0..FLAGS.len(), 0..4).prop_map(|indexes| {
        indexes
            .into_iter()
            .fold(QueryType::empty(), |acc, i| acc | FLAGS[i])
    })
}

fn trx_state() -> impl Strategy<Value = TrxState> {
    prop_oneof![
        Just(TrxState::Inactive),
        Just(TrxState::Active { read_only: false }),
        Just(TrxState::Active { read_only: true }),
        Just(TrxState::Ending { read_only: false }),
        Just(TrxState::Ending { read_only: true }),
    ]
}

fn context() -> impl Strategy<Value = RoutingContext> {
    (trx_state(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(trx, load_data_active, vars_master, pinned_to_master)| RoutingContext {
            trx,
            load_data_active,
            use_sql_variables_in: if vars_master {
                UseSqlVariablesIn::Master
            } else {
                UseSqlVariablesIn::All
            },
            pinned_to_master,
        },
    )
}

proptest! {
    /// The decider always produces a routable target.
    #[test]
    fn decider_always_yields_a_target(qtype in query_type(), ctx in context()) {
        let target = get_route_target(&Statement::query("stmt", qtype), &ctx);
        prop_assert!(target.is_all() || target.is_slave() || target.is_master());
    }

    /// A route-to-master hint overrides any prior decision outright.
    #[test]
    fn master_hint_always_wins(qtype in query_type(), ctx in context()) {
        let stmt = Statement::query("stmt", qtype).with_hint(Hint::RouteToMaster);
        let target = get_route_target(&stmt, &ctx);
        prop_assert!(target.is_master());
        prop_assert!(!target.is_slave());
        prop_assert!(!target.is_all());
    }

    /// Without hints, a master pin decides alone.
    #[test]
    fn master_pin_decides_alone(qtype in query_type(), mut ctx in context()) {
        ctx.pinned_to_master = true;
        let target = get_route_target(&Statement::query("stmt", qtype), &ctx);
        prop_assert!(target.is_master());
        prop_assert!(!target.is_all());
        prop_assert!(!target.is_slave());
    }

    /// Non-session-write statements inside a read-only transaction stay on
    /// the slave side, whether the transaction is active or ending.
    #[test]
    fn read_only_trx_routes_to_slave(index in 0usize..6, ending in any::<bool>()) {
        let qtype = [
            QueryType::READ,
            QueryType::WRITE,
            QueryType::COMMIT,
            QueryType::ROLLBACK,
            QueryType::SHOW_TABLES,
            QueryType::UNKNOWN,
        ][index];
        let ctx = RoutingContext {
            trx: if ending {
                TrxState::Ending { read_only: true }
            } else {
                TrxState::Active { read_only: true }
            },
            load_data_active: false,
            use_sql_variables_in: UseSqlVariablesIn::Master,
            pinned_to_master: false,
        };
        let target = get_route_target(&Statement::query("stmt", qtype), &ctx);
        prop_assert!(target.is_slave());
        prop_assert!(!target.is_all());
    }

    /// The lag ceiling from a parameter hint is always recorded with its flag.
    #[test]
    fn rlag_hint_sets_flag_and_value(qtype in query_type(), ceiling in 0i32..86_400) {
        let stmt = Statement::query("stmt", qtype).with_hint(Hint::Parameter {
            name: "max_slave_replication_lag".to_string(),
            value: ceiling.to_string(),
        });
        let target = get_route_target(&stmt, &RoutingContext {
            trx: TrxState::Inactive,
            load_data_active: false,
            use_sql_variables_in: UseSqlVariablesIn::All,
            pinned_to_master: false,
        });
        prop_assert!(target.is_rlag_max());
        prop_assert_eq!(target.max_rlag(), Some(ceiling));
    }
}
