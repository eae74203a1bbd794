//! Micro-benchmarks for the hot per-statement path: route decision and
//! hint filter matching.

use rwsplit_proxy::classify::QueryType;
use rwsplit_proxy::config::{HintFilterConfig, UseSqlVariablesIn};
use rwsplit_proxy::hint::{Hint, RegexHintFilter};
use rwsplit_proxy::router::{RoutingContext, TrxState, get_route_target};
use rwsplit_proxy::statement::Statement;
use rwsplit_proxy::types::ServerName;
use std::collections::BTreeMap;

fn main() {
    divan::main();
}

fn context() -> RoutingContext {
    RoutingContext {
        trx: TrxState::Inactive,
        load_data_active: false,
        use_sql_variables_in: UseSqlVariablesIn::All,
        pinned_to_master: false,
    }
}

#[divan::bench]
fn decide_plain_read(bencher: divan::Bencher) {
    let stmt = Statement::query("SELECT id, name FROM customers WHERE id = 1", QueryType::READ);
    let ctx = context();
    bencher.bench_local(|| get_route_target(divan::black_box(&stmt), divan::black_box(&ctx)));
}

#[divan::bench]
fn decide_hinted_read(bencher: divan::Bencher) {
    let stmt = Statement::query("SELECT id FROM audit WHERE id = 1", QueryType::READ)
        .with_hint(Hint::RouteToNamed("server2".to_string()))
        .with_hint(Hint::Parameter {
            name: "max_slave_replication_lag".to_string(),
            value: "10".to_string(),
        });
    let ctx = context();
    bencher.bench_local(|| get_route_target(divan::black_box(&stmt), divan::black_box(&ctx)));
}

#[divan::bench(args = [1, 10, 50])]
fn hint_filter_match(bencher: divan::Bencher, rules: usize) {
    let mut indexed = BTreeMap::new();
    for i in 1..=rules {
        indexed.insert(format!("match{:02}", i), format!("^SELECT .*FROM table{}", i));
        indexed.insert(format!("target{:02}", i), "->master".to_string());
    }
    let config = HintFilterConfig {
        indexed,
        ..HintFilterConfig::default()
    };
    let servers = vec![ServerName::new("server1".to_string()).unwrap()];
    let filter = RegexHintFilter::from_config(&config, &servers).unwrap();

    // Matches the last rule, the worst case for the ordered walk
    let sql = format!("SELECT x FROM table{} WHERE id = 1", rules);
    bencher.bench_local(|| filter.hints_for(divan::black_box(&sql)));
}
