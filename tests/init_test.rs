// Process-wide initialization gets its own test binary since it can only
// happen once per process.
use docvec::{config, init, GlobalConfig, LogConfig, LogLevel, StatusCode};

#[test]
fn test_init_is_idempotent_for_identical_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let log = match LogConfig::file(LogLevel::Info) {
        LogConfig::File {
            level,
            basename,
            file_size_mb,
            overdue_days,
            ..
        } => LogConfig::File {
            level,
            dir: dir.path().join("logs"),
            basename,
            file_size_mb,
            overdue_days,
        },
        other => other,
    };
    let cfg = GlobalConfig::default()
        .with_memory_limit_mb(64)
        .with_query_threads(2)
        .with_log(log);

    let mut bad = cfg.clone();
    bad.brute_force_by_keys_ratio = Some(2.0);
    assert_eq!(init(bad).unwrap_err().code(), StatusCode::InvalidArgument);
    assert!(!config::is_installed());

    init(cfg.clone()).unwrap();
    assert!(config::is_installed());
    assert_eq!(config::global(), cfg);
    assert!(dir.path().join("logs").join("docvec.log").exists());

    init(cfg.clone()).unwrap();

    let other = cfg.with_optimize_threads(4);
    assert_eq!(init(other).unwrap_err().code(), StatusCode::FailedPrecondition);
}
