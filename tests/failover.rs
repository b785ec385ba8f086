//! Failure detection, fallback and reconnection.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use replica_router::config::{NodeConfig, ReplicationConfig, RouterConfig};
use replica_router::config::HealthCheckConfig;
use replica_router::observability::QueryLog;
use replica_router::{DatabaseRegistry, OperationKind, RouterError};

mod common;

#[tokio::test]
async fn test_closed_reader_load_is_absorbed() {
    let registry = common::registry(2);
    let db = registry.use_db("main").unwrap();
    let r0 = registry.use_node("main", "r", 9001).unwrap();
    let r1 = registry.use_node("main", "r", 9002).unwrap();
    r0.connection().set_reachable(false);

    let mut failures = 0;
    for _ in 0..100 {
        if db.read(|conn| async move { conn.query().await }).await.is_err() {
            failures += 1;
        }
    }

    assert!(!r0.is_online(), "closed reader taken out of rotation");
    assert!(r0.connection_error_count() >= 1);
    assert_eq!(failures, 1, "only the first read on the closed reader fails");
    assert_eq!(r0.query_count(), 1);
    assert_eq!(r0.error_count(), 1);
    assert_eq!(r1.query_count(), 99);
    assert!(r1.is_online());
    assert_eq!(registry.use_node("main", "w", 9000).unwrap().query_count(), 0);
}

#[tokio::test]
async fn test_writer_absorbs_reads_when_all_readers_fail() {
    let registry = common::registry(2);
    let db = registry.use_db("main").unwrap();
    for port in [9001, 9002] {
        registry.use_node("main", "r", port).unwrap().connection().set_reachable(false);
    }

    let mut failures = 0;
    for _ in 0..100 {
        if db.read(|conn| async move { conn.query().await }).await.is_err() {
            failures += 1;
        }
    }

    // The first failure probes every online reader, so both go offline at once.
    assert_eq!(failures, 1);
    let stats = registry.statistics();
    let main = stats.database("main").unwrap();
    assert!(!main.get("read0").unwrap().online);
    assert!(!main.get("read1").unwrap().online);
    assert_eq!(main.writer().unwrap().query_count, 99);
    assert!(main.writer().unwrap().online);

    let writer = registry.use_node("main", "w", 9000).unwrap();
    assert!(writer.connection().pings() >= 1, "writer checked once readers are gone");
}

#[tokio::test]
async fn test_reader_recovers_within_interval() {
    let registry = common::registry(2);
    let db = registry.use_db("main").unwrap();
    let set = registry.node_set("main").unwrap().clone();
    let r0 = registry.use_node("main", "r", 9001).unwrap();
    r0.connection().set_reachable(false);

    while r0.is_online() {
        let _ = db.read(|conn| async move { conn.query().await }).await;
    }
    assert!(set.reconnector_active(), "failure arms the reconnector");

    // Still down: the loop keeps probing and counting.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(!r0.is_online());
    assert!(r0.connection_error_count() >= 2);
    assert!(r0.ping_tries() >= 2);

    r0.connection().set_reachable(true);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(r0.is_online(), "reader back online after one tick");
    assert_eq!(r0.ping_tries(), 0);
    assert!(!set.reconnector_active(), "loop stops once all nodes are online");

    let before = r0.query_count();
    for _ in 0..100 {
        db.read(|conn| async move { conn.query().await }).await.unwrap();
    }
    assert!(r0.query_count() > before, "traffic resumes on the recovered reader");
}

#[tokio::test]
async fn test_only_one_reconnector_per_set() {
    let registry = common::registry(2);
    let set = registry.node_set("main").unwrap().clone();
    set.readers()[0].connection().set_reachable(false);
    set.readers()[0].mark_offline();

    assert!(registry.monitor().arm(&set));
    assert!(!registry.monitor().arm(&set));
    assert!(!registry.monitor().arm(&set));
    assert!(set.reconnector_active());

    // A racing failure while the loop runs does not start a second one.
    let db = registry.use_db("main").unwrap();
    set.readers()[1].connection().set_reachable(false);
    while set.readers()[1].is_online() {
        let _ = db.read(|conn| async move { conn.query().await }).await;
    }
    assert!(set.reconnector_active());

    set.readers()[0].connection().set_reachable(true);
    set.readers()[1].connection().set_reachable(true);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(set.all_online());
    assert!(!set.reconnector_active());
}

#[tokio::test]
async fn test_failing_writer_is_observable_but_still_routed() {
    let registry = common::registry(0);
    let db = registry.use_db("main").unwrap();
    let writer = registry.use_node("main", "w", 9000).unwrap();
    writer.connection().set_reachable(false);

    for _ in 0..3 {
        assert!(db.write(|conn| async move { conn.query().await }).await.is_err());
    }

    assert!(!writer.is_online());
    assert_eq!(writer.query_count(), 3, "writes keep targeting the writer");
    assert_eq!(writer.error_count(), 3);
    assert!(writer.connection_error_count() >= 3);

    writer.connection().set_reachable(true);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(writer.is_online());
    db.write(|conn| async move { conn.query().await }).await.unwrap();
}

#[tokio::test]
async fn test_close_stops_reconnector() {
    let registry = common::registry(1);
    let set = registry.node_set("main").unwrap().clone();
    set.readers()[0].connection().set_reachable(false);
    set.readers()[0].mark_offline();
    assert!(registry.monitor().arm(&set));

    registry.close();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!set.reconnector_active());

    let probes = set.readers()[0].connection().pings();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(set.readers()[0].connection().pings(), probes, "no probes after close");
    assert!(!registry.monitor().arm(&set), "closed registry starts no loop");
}

fn config(readers: &[u16]) -> RouterConfig {
    let mut replication = ReplicationConfig::with_writer(NodeConfig::new("w", 9000));
    for port in readers {
        replication = replication.reader(NodeConfig::new("r", *port));
    }
    let mut config = RouterConfig::default();
    config.health_check = common::fast_health();
    config.databases.insert("main".into(), replication);
    config
}

#[tokio::test]
async fn test_connect_builds_registry() {
    let connector = Arc::new(common::MockConnector::new());
    let registry = DatabaseRegistry::connect(&config(&[9001, 9002]), connector).await.unwrap();

    assert_eq!(registry.databases().collect::<Vec<_>>(), ["main"]);
    let set = registry.node_set("main").unwrap();
    assert_eq!(set.readers().len(), 2);
    assert!(set.all_online());
    assert!(!set.reconnector_active());
    assert_eq!(set.writer().connection().pings(), 1, "writer probed once at startup");
}

#[tokio::test]
async fn test_connect_without_writer_fails() {
    let mut config = config(&[9001]);
    config.databases.get_mut("main").unwrap().writer = None;

    match DatabaseRegistry::connect(&config, Arc::new(common::MockConnector::new())).await {
        Err(RouterError::Configuration { database, .. }) => assert_eq!(database, "main"),
        Err(other) => panic!("expected configuration error, got {}", other),
        Ok(_) => panic!("expected configuration error"),
    }
}

#[tokio::test]
async fn test_connect_with_unreachable_writer_fails() {
    let connector = Arc::new(common::MockConnector::new());
    connector.switch("w:9000").store(false, Ordering::SeqCst);

    match DatabaseRegistry::connect(&config(&[9001]), connector).await {
        Err(RouterError::Connection { node, .. }) => assert_eq!(node, "w:9000"),
        Err(other) => panic!("expected connection error, got {}", other),
        Ok(_) => panic!("expected connection error"),
    }
}

#[tokio::test]
async fn test_connect_with_rejected_writer_descriptor_fails() {
    let connector = Arc::new(common::MockConnector::new());
    connector.refuse("w:9000");

    let result = DatabaseRegistry::connect(&config(&[9001]), connector).await;
    assert!(matches!(result, Err(RouterError::Configuration { .. })));
}

#[tokio::test]
async fn test_rejected_reader_descriptor_is_deferred() {
    let connector = Arc::new(common::MockConnector::new());
    connector.refuse("r:9001");

    let registry = DatabaseRegistry::connect(&config(&[9001, 9002]), connector.clone()).await.unwrap();
    let set = registry.node_set("main").unwrap().clone();
    assert_eq!(set.readers().len(), 1);
    assert!(registry.use_node("main", "r", 9001).is_none(), "not opened yet");
    assert!(set.reconnector_active());

    let db = registry.use_db("main").unwrap();
    for _ in 0..20 {
        assert_eq!(db.read(|conn| async move { conn.query().await }).await.unwrap(), "r:9002");
    }

    let stats = registry.statistics();
    let main = stats.database("main").unwrap();
    assert!(!main.get("read0").unwrap().online, "deferred reader keeps its label");
    assert_eq!(main.get("read1").unwrap().query_count, 20);

    // Still refused: the loop keeps it deferred.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(registry.use_node("main", "r", 9001).is_none());

    connector.accept("r:9001");
    tokio::time::sleep(Duration::from_millis(150)).await;
    let r0 = registry.use_node("main", "r", 9001).expect("reader opened by the loop");
    assert!(r0.is_online());
    assert!(set.all_online());
    assert!(!set.reconnector_active());
    assert_eq!(set.readers()[0].name(), "r:9001", "back in registration order");

    for _ in 0..100 {
        db.read(|conn| async move { conn.query().await }).await.unwrap();
    }
    assert!(r0.query_count() > 0, "traffic reaches the late reader");
}

#[tokio::test]
async fn test_connect_rejects_invalid_health_settings() {
    let mut config = config(&[9001]);
    config.health_check.reconnect_interval_ms = 0;

    match DatabaseRegistry::connect(&config, Arc::new(common::MockConnector::new())).await {
        Err(RouterError::Configuration { reason, .. }) => {
            assert!(reason.contains("reconnect_interval_ms"), "{}", reason)
        }
        Err(other) => panic!("expected configuration error, got {}", other),
        Ok(_) => panic!("expected configuration error"),
    }
}

#[tokio::test]
async fn test_zero_interval_falls_back_to_working_loop() {
    let registry = common::registry_with_health(
        2,
        HealthCheckConfig {
            reconnect_interval_ms: 0,
            probe_timeout_ms: 0,
        },
    );
    assert!(registry.monitor().config().reconnect_interval_ms > 0);
    assert!(registry.monitor().config().probe_timeout_ms > 0);

    let set = registry.node_set("main").unwrap().clone();
    set.readers()[0].connection().set_reachable(false);
    set.readers()[0].mark_offline();
    assert!(registry.monitor().arm(&set));

    // The loop task is alive and owns the flag instead of dying on start.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(set.reconnector_active());
    assert!(!registry.monitor().arm(&set));

    registry.close();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!set.reconnector_active(), "loop exits through shutdown");
}

#[tokio::test]
async fn test_failed_transaction_checks_writer_on_finish() {
    let registry = common::registry(1);
    let db = registry.use_db("main").unwrap();
    let writer = registry.use_node("main", "w", 9000).unwrap();
    writer.connection().set_reachable(false);

    let tx = db.begin();
    for _ in 0..3 {
        assert!(tx
            .execute(OperationKind::Write, |conn| async move { conn.query().await })
            .await
            .is_err());
    }
    assert_eq!(tx.failures(), 3);
    assert_eq!(writer.error_count(), 0, "nothing reported inside the transaction");
    assert!(writer.is_online());

    tx.finish().await;
    assert_eq!(writer.error_count(), 1);
    assert!(!writer.is_online());
    assert!(writer.connection_error_count() >= 1);
}

#[tokio::test]
async fn test_clean_transaction_finish_reports_nothing() {
    let registry = common::registry(1);
    let db = registry.use_db("main").unwrap();
    let writer = registry.use_node("main", "w", 9000).unwrap();

    let tx = db.begin();
    tx.execute(OperationKind::Write, |conn| async move { conn.query().await })
        .await
        .unwrap();
    tx.finish().await;

    assert_eq!(writer.error_count(), 0);
    assert_eq!(writer.connection().pings(), 0);
}

#[tokio::test]
async fn test_unreachable_reader_starts_offline_and_recovers() {
    let connector = Arc::new(common::MockConnector::new());
    let switch = connector.switch("r:9002");
    switch.store(false, Ordering::SeqCst);

    let registry = DatabaseRegistry::connect(&config(&[9001, 9002]), connector).await.unwrap();
    let r1 = registry.use_node("main", "r", 9002).unwrap();
    assert!(!r1.is_online());
    assert_eq!(r1.connection_error_count(), 1);
    assert!(registry.node_set("main").unwrap().reconnector_active());

    let db = registry.use_db("main").unwrap();
    for _ in 0..20 {
        assert_eq!(db.read(|conn| async move { conn.query().await }).await.unwrap(), "r:9001");
    }

    switch.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(r1.is_online());
}

#[tokio::test]
async fn test_connect_carries_query_log_settings() {
    let mut config = config(&[9001]);
    let reader = &mut config.databases.get_mut("main").unwrap().readers[0];
    reader.log_query = true;
    reader.slow_query_threshold_ms = 5;

    let registry = DatabaseRegistry::connect(&config, Arc::new(common::MockConnector::new())).await.unwrap();
    let r0 = registry.use_node("main", "r", 9001).unwrap();
    let writer = registry.use_node("main", "w", 9000).unwrap();
    assert_eq!(*r0.query_log(), QueryLog::new(true, Duration::from_millis(5)));
    assert_eq!(*writer.query_log(), QueryLog::default());
}
