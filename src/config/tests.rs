use std::io::Write;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.database.url, DEFAULT_DATABASE_URL);
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.index_ttl, Duration::from_secs(20));
    assert_eq!(settings.cache.max_entries.get(), DEFAULT_CACHE_MAX_ENTRIES);
    assert_eq!(
        settings.auth.session_ttl,
        Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600)
    );
    assert_eq!(settings.site.title, "Yatube");
}

#[test]
fn cache_overrides_apply() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_enabled: Some(false),
        cache_index_ttl_seconds: Some(5),
        cache_max_entries: Some(3),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.index_ttl, Duration::from_secs(5));
    assert_eq!(settings.cache.max_entries.get(), 3);
}

#[test]
fn zero_cache_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.index_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.index_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn non_sqlite_database_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://example".to_string());
    let err = Settings::from_raw(raw).expect_err("postgres url must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.url",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn config_file_values_are_loaded_and_cli_wins() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        "[server]\nport = 8100\n\n[site]\ntitle = \"Test Blog\"\n\n[cache]\nindex_ttl_seconds = 7"
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let args = CliArgs::parse_from([
        "yatube",
        "--config-file",
        path.as_str(),
        "serve",
        "--server-port",
        "8200",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.server.addr.port(), 8200);
    assert_eq!(settings.site.title, "Test Blog");
    assert_eq!(settings.cache.index_ttl, Duration::from_secs(7));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["yatube", "migrate", "--database-url", "sqlite::memory:"]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("sqlite::memory:")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_create_group_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "create-group",
        "--title",
        "Cats",
        "--description",
        "All about cats",
    ]);

    match args.command.expect("create-group command") {
        Command::CreateGroup(group) => {
            assert_eq!(group.title, "Cats");
            assert!(group.slug.is_none());
            assert_eq!(group.description, "All about cats");
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "sqlite://override.db",
        "--cache-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("sqlite://override.db")
            );
            assert_eq!(serve.overrides.cache_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}
