//! Batch behaviour of the backup engine against a scripted connection.

mod common;

use chrono::{TimeZone, Utc};

use backup_tables::backup::{BackupService, EntityRegistry, Outcome};
use backup_tables::drivers::{ColumnInfo, GeneratedColumn};
use backup_tables::error::BackupError;
use common::{Call, FakeConnection};

fn at(h: u32, m: u32, s: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 13, h, m, s).unwrap()
}

const SUFFIX: &str = "2024_07_13_10_02_47";

#[test]
fn empty_batch_fails_without_touching_the_database() {
    let mut conn = FakeConnection::new("sqlite");
    let targets: [&str; 0] = [];

    let report = BackupService::new(&mut conn).run_at(&targets, &at(10, 2, 47)).unwrap();

    assert!(!report.succeeded());
    assert!(report.outcomes.is_empty());
    assert!(conn.calls.is_empty());
}

#[test]
fn copies_every_existing_table() {
    let mut conn = FakeConnection::new("sqlite").with_table("fathers", 3).with_table("mothers", 2);

    let report = BackupService::new(&mut conn)
        .run_at(&["fathers", "mothers"], &at(10, 2, 47))
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.timestamp.as_deref(), Some(SUFFIX));
    assert_eq!(
        report.backup_tables(),
        vec![
            format!("fathers_backup_{}", SUFFIX).as_str(),
            format!("mothers_backup_{}", SUFFIX).as_str()
        ]
    );
    assert_eq!(conn.tables.get(&format!("fathers_backup_{}", SUFFIX)), Some(&3));
    assert_eq!(conn.tables.get(&format!("mothers_backup_{}", SUFFIX)), Some(&2));
    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::Copied {
            backup_table: format!("fathers_backup_{}", SUFFIX),
            rows: 3
        }
    );
}

#[test]
fn missing_table_does_not_block_the_rest() {
    let mut conn = FakeConnection::new("sqlite").with_table("existing_table", 1);

    let report = BackupService::new(&mut conn)
        .run_at(&["non_existent_table", "existing_table"], &at(10, 2, 47))
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::NotFound {
            table: "non_existent_table".into()
        }
    );
    assert!(report.outcomes[1].is_copied());
    assert!(!conn.tables.contains_key(&format!("non_existent_table_backup_{}", SUFFIX)));
}

#[test]
fn only_missing_tables_is_a_failure() {
    let mut conn = FakeConnection::new("sqlite");
    let report = BackupService::new(&mut conn).run_at(&["nope"], &at(10, 2, 47)).unwrap();

    assert!(!report.succeeded());
    assert!(conn.executed().is_empty());
}

#[test]
fn second_run_in_the_same_second_is_skipped() {
    let mut conn = FakeConnection::new("sqlite").with_table("test_table", 5);

    let first = BackupService::new(&mut conn).run_at(&["test_table"], &at(10, 2, 47)).unwrap();
    let executed_after_first = conn.executed().len();
    let second = BackupService::new(&mut conn).run_at(&["test_table"], &at(10, 2, 47)).unwrap();

    assert!(first.succeeded());
    assert!(!second.succeeded());
    assert_eq!(
        second.outcomes[0].outcome,
        Outcome::Skipped {
            backup_table: format!("test_table_backup_{}", SUFFIX),
            reason: "already exists".into()
        }
    );
    assert_eq!(conn.executed().len(), executed_after_first);
}

#[test]
fn separate_runs_use_their_own_timestamp() {
    let mut conn = FakeConnection::new("sqlite").with_table("fathers", 1).with_table("sons", 4);

    let parent = BackupService::new(&mut conn).run_at(&["fathers"], &at(10, 2, 47)).unwrap();
    let child = BackupService::new(&mut conn).run_at(&["sons"], &at(10, 2, 48)).unwrap();

    assert_eq!(parent.backup_tables(), vec!["fathers_backup_2024_07_13_10_02_47"]);
    assert_eq!(child.backup_tables(), vec!["sons_backup_2024_07_13_10_02_48"]);
}

#[test]
fn entity_targets_match_literal_names() {
    let mut registry = EntityRegistry::new();
    registry.insert("Father", "fathers");

    let mut by_entity = FakeConnection::new("sqlite").with_table("fathers", 2);
    let entity_report = BackupService::new(&mut by_entity)
        .with_resolver(&registry)
        .run_at(&["Father"], &at(10, 2, 47))
        .unwrap();

    let mut by_name = FakeConnection::new("sqlite").with_table("fathers", 2);
    let name_report = BackupService::new(&mut by_name)
        .with_resolver(&registry)
        .run_at(&["fathers"], &at(10, 2, 47))
        .unwrap();

    assert_eq!(entity_report.outcomes[0].outcome, name_report.outcomes[0].outcome);
    assert_eq!(entity_report.outcomes[0].target, "Father");
    assert_eq!(entity_report.outcomes[0].source_table, "fathers");
    assert_eq!(by_entity.executed(), by_name.executed());
}

#[test]
fn unsupported_driver_aborts_before_inspecting_tables() {
    let mut conn = FakeConnection::new("oracle").with_table("users", 1);

    let err = BackupService::new(&mut conn)
        .run_at(&["users", "orders"], &at(10, 2, 47))
        .unwrap_err();

    assert!(matches!(err, BackupError::UnsupportedDriver(ref d) if d == "oracle"));
    assert!(err.is_fatal_config());
    assert_eq!(conn.exists_checks(), 0);
    assert!(conn.executed().is_empty());
}

#[test]
fn invalid_format_is_rejected_before_any_io() {
    let mut conn = FakeConnection::new("sqlite").with_table("users", 1);

    let err = BackupService::new(&mut conn)
        .with_format("%Y_%Q")
        .run_at(&["users"], &at(10, 2, 47))
        .unwrap_err();

    assert!(matches!(err, BackupError::InvalidTimestampFormat(_)));
    assert!(conn.calls.is_empty());
}

#[test]
fn custom_format_is_normalised() {
    let mut conn = FakeConnection::new("pgsql").with_table("users", 1);

    let report = BackupService::new(&mut conn)
        .with_format("%Y-%m-%d %H:%M:%S")
        .run_at(&["users"], &at(10, 2, 47))
        .unwrap();

    assert_eq!(report.backup_tables(), vec!["users_backup_2024_07_13 10_02_47"]);
}

#[test]
fn foreign_keys_are_disabled_only_around_the_copy() {
    let mut conn = FakeConnection::new("sqlite").with_table("users", 2);

    BackupService::new(&mut conn).run_at(&["users"], &at(10, 2, 47)).unwrap();

    let backup = format!("users_backup_{}", SUFFIX);
    assert_eq!(
        conn.calls,
        vec![
            Call::Exists(backup.clone()),
            Call::Exists("users".into()),
            Call::ForeignKeys(false),
            Call::Execute(format!("CREATE TABLE \"{}\" AS SELECT * FROM \"users\" WHERE 1 = 0", backup)),
            Call::Execute(format!("INSERT INTO \"{}\" SELECT * FROM \"users\"", backup)),
            Call::ForeignKeys(true),
            Call::RowCount(backup.clone()),
        ]
    );
    assert!(conn.foreign_keys_enabled);
}

#[test]
fn failed_copy_restores_foreign_keys_and_propagates() {
    let mut conn = FakeConnection::new("sqlite")
        .with_table("users", 2)
        .with_table("orders", 1)
        .failing_on("INSERT INTO");

    let err = BackupService::new(&mut conn)
        .run_at(&["users", "orders"], &at(10, 2, 47))
        .unwrap_err();

    assert!(matches!(err, BackupError::Config(ref m) if m.contains("rejected statement")));
    assert!(conn.foreign_keys_enabled);
    assert_eq!(conn.calls.last(), Some(&Call::ForeignKeys(true)));
    // the batch stops at the failing task
    assert!(!conn.calls.contains(&Call::Exists("orders".into())));
}

#[test]
fn sql_server_uses_select_into() {
    let mut conn = FakeConnection::new("sqlsrv").with_table("dbo.users", 7);

    let report = BackupService::new(&mut conn).run_at(&["dbo.users"], &at(10, 2, 47)).unwrap();

    assert_eq!(
        conn.executed(),
        vec![format!("SELECT * INTO [dbo].[users_backup_{}] FROM [dbo].[users]", SUFFIX).as_str()]
    );
    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::Copied {
            backup_table: format!("dbo.users_backup_{}", SUFFIX),
            rows: 7
        }
    );
}

#[test]
fn postgres_and_mariadb_create_as_select() {
    let mut pg = FakeConnection::new("pgsql").with_table("users", 1);
    BackupService::new(&mut pg).run_at(&["users"], &at(10, 2, 47)).unwrap();
    assert_eq!(
        pg.executed(),
        vec![format!("CREATE TABLE \"users_backup_{}\" AS SELECT * FROM \"users\"", SUFFIX).as_str()]
    );
    assert!(!pg.calls.contains(&Call::Version));

    let mut maria = FakeConnection::new("mariadb").with_table("users", 1);
    BackupService::new(&mut maria).run_at(&["users"], &at(10, 2, 47)).unwrap();
    assert_eq!(
        maria.executed(),
        vec![format!("CREATE TABLE `users_backup_{}` AS SELECT * FROM `users`", SUFFIX).as_str()]
    );
}

#[test]
fn modern_mysql_is_one_statement() {
    let mut conn = FakeConnection::new("mysql").with_version("8.0.36").with_table("users", 4);

    let report = BackupService::new(&mut conn).run_at(&["users"], &at(10, 2, 47)).unwrap();

    assert!(report.succeeded());
    assert_eq!(
        conn.executed(),
        vec![format!("CREATE TABLE `users_backup_{}` AS SELECT * FROM `users`", SUFFIX).as_str()]
    );
    assert!(!conn.calls.iter().any(|c| matches!(c, Call::Columns(_))));
}

#[test]
fn legacy_mysql_copies_data_and_readds_generated_columns() {
    let columns = vec![
        ColumnInfo::concrete("id", "int(10) unsigned"),
        ColumnInfo::concrete("price", "int(11)"),
        ColumnInfo::concrete("quantity", "int(11)"),
        ColumnInfo {
            name: "total".into(),
            column_type: "int(11)".into(),
            generated: Some(GeneratedColumn {
                expression: "(`price` * `quantity`)".into(),
                stored: true,
            }),
        },
    ];
    let mut conn = FakeConnection::new("mysql")
        .with_version("5.7.44-log")
        .with_table("orders", 12)
        .with_columns("orders", columns);

    let report = BackupService::new(&mut conn).run_at(&["orders"], &at(10, 2, 47)).unwrap();

    let backup = format!("orders_backup_{}", SUFFIX);
    assert_eq!(
        conn.executed(),
        vec![
            format!("CREATE TABLE `{}` AS SELECT `id`, `price`, `quantity` FROM `orders`", backup),
            format!(
                "ALTER TABLE `{}` ADD COLUMN `total` int(11) GENERATED ALWAYS AS ((`price` * `quantity`)) STORED",
                backup
            ),
        ]
    );
    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::Copied {
            backup_table: backup,
            rows: 12
        }
    );
}

#[test]
fn legacy_mysql_without_readable_columns_fails_loudly() {
    let mut conn = FakeConnection::new("mysql").with_version("5.7.44").with_table("orders", 1);

    let err = BackupService::new(&mut conn).run_at(&["orders"], &at(10, 2, 47)).unwrap_err();

    assert!(matches!(err, BackupError::Introspection { ref table, .. } if table == "orders"));
    assert!(conn.foreign_keys_enabled);
    assert!(conn.executed().is_empty());
}

#[test]
fn blank_targets_are_not_found() {
    let mut conn = FakeConnection::new("sqlite").with_table("users", 1);

    let report = BackupService::new(&mut conn).run_at(&["  ", "users"], &at(10, 2, 47)).unwrap();

    assert!(matches!(report.outcomes[0].outcome, Outcome::NotFound { .. }));
    assert!(report.outcomes[1].is_copied());
}

#[test]
fn overlong_backup_name_is_rejected_per_target() {
    let long = "customer_subscription_billing_events_x";
    let mut conn = FakeConnection::new("pgsql").with_table(long, 9).with_table("users", 2);

    let report = BackupService::new(&mut conn).run_at(&[long, "users"], &at(10, 2, 47)).unwrap();

    assert!(report.succeeded());
    match &report.outcomes[0].outcome {
        Outcome::InvalidName { backup_table, reason } => {
            assert_eq!(backup_table, &format!("{}_backup_{}", long, SUFFIX));
            assert!(reason.contains("63 bytes"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(report.outcomes[1].is_copied());
    // the rejected name never reaches the database
    assert!(!conn.calls.contains(&Call::Exists(long.into())));
    assert_eq!(conn.calls.iter().filter(|c| matches!(c, Call::ForeignKeys(_))).count(), 2);
}

#[test]
fn dotted_timestamp_keeps_the_source_schema() {
    let mut conn = FakeConnection::new("sqlsrv").with_table("dbo.users", 3);

    let report = BackupService::new(&mut conn)
        .with_format("%Y.%m.%d")
        .run_at(&["dbo.users"], &at(10, 2, 47))
        .unwrap();

    assert_eq!(report.backup_tables(), vec!["dbo.users_backup_2024_07_13"]);
    assert_eq!(
        conn.executed(),
        vec!["SELECT * INTO [dbo].[users_backup_2024_07_13] FROM [dbo].[users]"]
    );
}
