// SPDX-FileCopyrightText: 2026 SQL Safety Guard Contributors
// SPDX-License-Identifier: MIT

use std::{
    fmt,
    sync::{Arc, Mutex}
};

use sql_safety_guard::{
    audit::{AuditDispatcher, AuditEvent, AuditSink},
    config::GlobalConfig,
    context::{CommandKind, ExecutionLayer, PageRequest, SqlContext},
    error::GuardError,
    intercept::{
        ExecutionOutcome, Guard,
        driver::{DriverListener, ShimConfig, StatementInfo, unwrap_url},
        mapper::{MapperCommand, MapperInterceptor},
        proxy::{Connection, GuardedConnection, PreparedStatement, Statement},
        wrapper::{WrapperCall, WrapperInterceptor}
    },
    rules::RiskLevel,
    strategy::ViolationStrategy,
    validator::SqlSafetyValidator
};

#[derive(Debug)]
struct MockDbError(String);

impl fmt::Display for MockDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockDbError {}

#[derive(Default)]
struct MockConnection {
    committed:   bool,
    rolled_back: bool,
    closed:      bool
}

#[derive(Default)]
struct MockStatement {
    executed: Vec<String>,
    batch:    Vec<String>
}

struct MockPrepared {
    executions: usize
}

impl Connection for MockConnection {
    type Error = MockDbError;
    type Prepared = MockPrepared;
    type Stmt = MockStatement;

    fn create_statement(&mut self) -> Result<Self::Stmt, Self::Error> {
        Ok(MockStatement::default())
    }

    fn prepare_statement(&mut self, _sql: &str) -> Result<Self::Prepared, Self::Error> {
        Ok(MockPrepared {
            executions: 0
        })
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.committed = true;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.rolled_back = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.closed = true;
        Ok(())
    }
}

impl Statement for MockStatement {
    type Error = MockDbError;

    fn execute(&mut self, sql: &str) -> Result<i64, Self::Error> {
        self.executed.push(sql.to_string());
        Ok(1)
    }

    fn add_batch(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.batch.push(sql.to_string());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, Self::Error> {
        Ok(vec![1; self.batch.len()])
    }
}

impl PreparedStatement for MockPrepared {
    type Error = MockDbError;

    fn execute(&mut self) -> Result<i64, Self::Error> {
        self.executions += 1;
        Ok(1)
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>
}

impl AuditSink for RecordingSink {
    fn publish(&self, event: &AuditEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().expect("sink lock").push(event.clone());
        Ok(())
    }
}

fn guard_with(
    strategy: ViolationStrategy
) -> (Guard, Arc<RecordingSink>, Arc<AuditDispatcher>) {
    let mut config = GlobalConfig::standard();
    config.active_strategy = strategy;
    let validator = Arc::new(SqlSafetyValidator::new(config).unwrap());
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = Arc::new(AuditDispatcher::new(sink.clone(), 64));
    (Guard::new(validator, dispatcher.clone()), sink, dispatcher)
}

#[test]
fn blocked_delete_raises_safety_error_with_state_42000() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut stmt = conn.create_statement().unwrap();
    let err = stmt.execute("DELETE FROM user").unwrap_err();
    match err {
        GuardError::Safety(err) => {
            assert_eq!(err.sql_state(), "42000");
            assert_eq!(err.risk, RiskLevel::Critical);
            assert!(err.to_string().starts_with("SQL safety violation [datasource=-"));
        }
        GuardError::Database(_) => panic!("expected a safety rejection")
    }
    assert!(stmt.inner().executed.is_empty());
}

#[test]
fn allowed_statement_executes_and_audits() {
    let (guard, sink, dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, Some("orders_db".into()));
    let mut stmt = conn.create_statement().unwrap();
    let rows = stmt.execute("DELETE FROM user WHERE id = 1").unwrap();
    assert_eq!(rows, 1);
    dispatcher.shutdown();
    let events = sink.events.lock().expect("sink lock");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rows_affected, 1);
    assert!(!events[0].blocked);
    assert_eq!(events[0].datasource.as_deref(), Some("orders_db"));
    assert!(events[0].pre_validation.as_ref().unwrap().passed());
}

#[test]
fn blocked_execution_still_fires_an_audit_event() {
    let (guard, sink, dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut stmt = conn.create_statement().unwrap();
    assert!(stmt.execute("DELETE FROM user").is_err());
    dispatcher.shutdown();
    let events = sink.events.lock().expect("sink lock");
    assert_eq!(events.len(), 1);
    assert!(events[0].blocked);
    let pre = events[0].pre_validation.as_ref().unwrap();
    assert_eq!(pre.risk(), Some(RiskLevel::Critical));
}

#[test]
fn warn_strategy_lets_violations_through() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Warn);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut stmt = conn.create_statement().unwrap();
    assert_eq!(stmt.execute("DELETE FROM user").unwrap(), 1);
    assert_eq!(stmt.inner().executed.len(), 1);
}

#[test]
fn prepared_statement_validates_at_prepare_time() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let err = conn.prepare_statement("DELETE FROM user").unwrap_err();
    assert!(matches!(err, GuardError::Safety(_)));
}

#[test]
fn prepared_statement_executes_after_clean_prepare() {
    let (guard, sink, dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut prepared = conn
        .prepare_statement("DELETE FROM user WHERE id = ?")
        .unwrap();
    assert!(prepared.validation().unwrap().passed());
    assert_eq!(prepared.execute().unwrap(), 1);
    assert_eq!(prepared.inner().executions, 1);
    dispatcher.shutdown();
    let events = sink.events.lock().expect("sink lock");
    // one event for the execution; the clean prepare emits none
    assert_eq!(events.len(), 1);
    assert!(!events[0].blocked);
}

#[test]
fn add_batch_validates_each_sql() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut stmt = conn.create_statement().unwrap();
    stmt.add_batch("DELETE FROM user WHERE id = 1").unwrap();
    stmt.add_batch("DELETE FROM user WHERE id = 2").unwrap();
    let err = stmt.add_batch("DELETE FROM user").unwrap_err();
    assert!(matches!(err, GuardError::Safety(_)));
    // only the admitted statements reached the driver's queue
    assert_eq!(stmt.inner().batch.len(), 2);
    let rows = stmt.execute_batch().unwrap();
    assert_eq!(rows, vec![1, 1]);
}

#[test]
fn lifecycle_methods_pass_through() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    conn.commit().unwrap();
    conn.rollback().unwrap();
    conn.close().unwrap();
    assert!(conn.inner().committed);
    assert!(conn.inner().rolled_back);
    assert!(conn.inner().closed);
}

#[test]
fn disabled_jdbc_layer_skips_validation() {
    let mut config = GlobalConfig::standard();
    config.interceptors.jdbc = false;
    let validator = Arc::new(SqlSafetyValidator::new(config).unwrap());
    let guard = Guard::new(validator, Arc::new(AuditDispatcher::disabled()));
    let mut conn = GuardedConnection::new(MockConnection::default(), guard, None);
    let mut stmt = conn.create_statement().unwrap();
    assert_eq!(stmt.execute("DELETE FROM user").unwrap(), 1);
}

#[test]
fn correlation_slot_is_cleared_on_every_path() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);

    // blocked path
    let blocked = SqlContext::new("DELETE FROM user", CommandKind::Delete, ExecutionLayer::Jdbc);
    assert!(guard.before_execution(blocked).is_err());
    assert!(Guard::pending_result().is_none());

    // normal path: present while in flight, cleared after
    let allowed = SqlContext::new(
        "DELETE FROM user WHERE id = 1",
        CommandKind::Delete,
        ExecutionLayer::Jdbc
    );
    let pre = guard.before_execution(allowed).unwrap();
    assert!(Guard::pending_result().is_some());
    guard.after_execution(pre, ExecutionOutcome::rows(1));
    assert!(Guard::pending_result().is_none());
}

#[test]
fn empty_wrapper_builder_is_rejected() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let interceptor = WrapperInterceptor::new(guard);
    let err = interceptor
        .intercept(&WrapperCall {
            statement_id:  String::from("com.example.UserMapper.selectList"),
            resolved_sql:  String::from("SELECT * FROM user"),
            has_builder:   true,
            builder_empty: true,
            page:          None,
            datasource:    None
        })
        .unwrap_err();
    assert_eq!(err.risk, RiskLevel::Critical);
    assert!(err.violations.iter().any(|v| v.rule_id == "no-where-clause"));
}

#[test]
fn wrapper_with_conditions_proceeds() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let interceptor = WrapperInterceptor::new(guard);
    let pre = interceptor
        .intercept(&WrapperCall {
            statement_id:  String::from("com.example.UserMapper.selectList"),
            resolved_sql:  String::from("SELECT id, name FROM user WHERE status = 1"),
            has_builder:   true,
            builder_empty: false,
            page:          None,
            datasource:    None
        })
        .unwrap()
        .expect("wrapper layer enabled");
    assert!(pre.result().passed());
    assert_eq!(
        pre.context().statement_id(),
        "ORM-WRAPPER:com.example.UserMapper.selectList"
    );
    interceptor.after(Some(pre), ExecutionOutcome::rows(3));
}

#[test]
fn mapper_logical_pagination_is_blocked() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let interceptor = MapperInterceptor::new(guard);
    let err = interceptor
        .before_query(&MapperCommand {
            mapper_id:  String::from("com.example.UserMapper.selectByPage"),
            sql:        String::from("SELECT id, name FROM user"),
            kind:       CommandKind::Select,
            page:       Some(PageRequest {
                offset: 0,
                size:   20
            }),
            datasource: Some(String::from("user_db")),
            params:     Default::default()
        })
        .unwrap_err();
    assert_eq!(err.risk, RiskLevel::Critical);
    assert!(
        err.violations
            .iter()
            .any(|v| v.rule_id == "logical-pagination")
    );
    assert!(err.to_string().contains("datasource=user_db"));
}

#[test]
fn disabled_mapper_layer_returns_none() {
    let mut config = GlobalConfig::standard();
    config.interceptors.mapper = false;
    let validator = Arc::new(SqlSafetyValidator::new(config).unwrap());
    let guard = Guard::new(validator, Arc::new(AuditDispatcher::disabled()));
    let interceptor = MapperInterceptor::new(guard);
    let pre = interceptor
        .before_update(&MapperCommand {
            mapper_id:  String::from("com.example.UserMapper.deleteAll"),
            sql:        String::from("DELETE FROM user"),
            kind:       CommandKind::Delete,
            page:       None,
            datasource: None,
            params:     Default::default()
        })
        .unwrap();
    assert!(pre.is_none());
}

#[test]
fn driver_listener_runs_the_same_pipeline() {
    let (guard, _sink, _dispatcher) = guard_with(ViolationStrategy::Block);
    let listener = DriverListener::new(guard);
    let err = listener
        .on_before_any_execute(&StatementInfo {
            sql:        String::from("DELETE FROM user"),
            datasource: None
        })
        .unwrap_err();
    assert_eq!(err.sql_state(), "42000");

    let result = listener
        .on_before_any_execute(&StatementInfo {
            sql:        String::from("DELETE FROM user WHERE id = 1"),
            datasource: None
        })
        .unwrap()
        .expect("driver layer enabled");
    assert!(result.passed());
}

#[test]
fn disabled_driver_layer_returns_none() {
    let mut config = GlobalConfig::standard();
    config.interceptors.driver = false;
    let validator = Arc::new(SqlSafetyValidator::new(config).unwrap());
    let guard = Guard::new(validator, Arc::new(AuditDispatcher::disabled()));
    let listener = DriverListener::new(guard);
    let result = listener
        .on_before_any_execute(&StatementInfo {
            sql:        String::from("DELETE FROM user"),
            datasource: None
        })
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn shim_properties_parse_and_rewrite_urls() {
    let shim = ShimConfig::parse(
        "# registration\nmodule = sql-safety-guard\nprefixes = mysql, postgresql\n"
    )
    .unwrap();
    assert_eq!(shim.module, "sql-safety-guard");
    assert_eq!(
        shim.wrap_url("jdbc:mysql://localhost/app").as_deref(),
        Some("jdbc:guard:mysql://localhost/app")
    );
    assert_eq!(shim.wrap_url("jdbc:oracle:thin:@db"), None);
    assert_eq!(
        unwrap_url("jdbc:guard:mysql://localhost/app").as_deref(),
        Some("jdbc:mysql://localhost/app")
    );
    assert!(shim.accepts("jdbc:guard:postgresql://localhost/app"));
    assert!(!shim.accepts("jdbc:postgresql://localhost/app"));
}

#[test]
fn malformed_shim_properties_are_rejected() {
    assert!(ShimConfig::parse("module sql-safety-guard").is_err());
    assert!(ShimConfig::parse("prefixes = mysql").is_err());
    assert!(ShimConfig::parse("module = guard\nprefixes =\n").is_err());
}

#[test]
fn statement_ids_are_stable_for_audit_correlation() {
    let a = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc)
        .with_datasource("db");
    let b = SqlContext::new("SELECT 1", CommandKind::Select, ExecutionLayer::Jdbc)
        .with_datasource("db");
    assert_eq!(a.statement_id(), b.statement_id());
    assert!(a.statement_id().starts_with("JDBC:db:"));
}
