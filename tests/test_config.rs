use docroot::config::{Config, ConfigError, ServerDefaults};

// Environment variables are process-wide, so every env-touching assertion
// lives in this one test.
#[test]
fn test_config_load_from_environment() {
    unsafe {
        std::env::remove_var("DOCROOT_CONFIG");
        std::env::remove_var("LISTEN");
        std::env::remove_var("DOCROOT_DIR");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.defaults.default_dir(), "");

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
        std::env::set_var("DOCROOT_DIR", "/srv/www");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.defaults.default_dir(), "/srv/www");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docroot.yaml");
    std::fs::write(&path, "defaults:\n  default_page: home.htm\n").unwrap();
    unsafe {
        std::env::set_var("DOCROOT_CONFIG", &path);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.defaults.default_page(), "home.htm");
    assert_eq!(cfg.defaults.default_dir(), "/srv/www");

    unsafe {
        std::env::remove_var("DOCROOT_CONFIG");
        std::env::remove_var("LISTEN");
        std::env::remove_var("DOCROOT_DIR");
    }
}

#[test]
fn test_server_defaults_initial_values() {
    let defaults = ServerDefaults::new();

    assert_eq!(defaults.default_page(), "index.html");
    assert_eq!(defaults.default_dir(), "");
}

#[test]
fn test_server_defaults_setters_reject_empty() {
    let mut defaults = ServerDefaults::new();

    assert_eq!(
        defaults.set_default_page(""),
        Err(ConfigError::Empty("default_page"))
    );
    assert_eq!(
        defaults.set_default_dir(""),
        Err(ConfigError::Empty("default_dir"))
    );
    assert_eq!(defaults.default_page(), "index.html");

    defaults.set_default_page("default.asp").unwrap();
    defaults.set_default_dir("/var/www").unwrap();
    assert_eq!(defaults.default_page(), "default.asp");
    assert_eq!(defaults.default_dir(), "/var/www");
}

#[test]
fn test_config_from_yaml() {
    let cfg = Config::from_yaml(
        r#"
server:
  listen_addr: "0.0.0.0:8000"
  idle_timeout_secs: 5
defaults:
  default_page: main.html
  default_dir: /var/www
handler:
  reject_reserved_names: true
  dynamic_extensions: [asp, esp]
  read_buffer_size: 512
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:8000");
    assert_eq!(cfg.server.idle_timeout_secs, 5);
    assert_eq!(cfg.defaults.default_page(), "main.html");
    assert_eq!(cfg.defaults.default_dir(), "/var/www");
    assert!(cfg.handler.reject_reserved_names);
    assert_eq!(cfg.handler.dynamic_extensions, vec!["asp", "esp"]);
    assert_eq!(cfg.handler.read_buffer_size, 512);
    assert!(!cfg.handler.home_page_redirect);
}

#[test]
fn test_config_from_yaml_fills_defaults() {
    let cfg = Config::from_yaml("server:\n  listen_addr: \"127.0.0.1:9000\"\n").unwrap();

    assert_eq!(cfg.server.idle_timeout_secs, 60);
    assert_eq!(cfg.defaults.default_page(), "index.html");
    assert_eq!(cfg.handler.read_buffer_size, 8192);
    assert_eq!(cfg.handler.dynamic_extensions, vec!["asp"]);
}

#[test]
fn test_config_rejects_invalid_values() {
    assert!(Config::from_yaml("handler:\n  read_buffer_size: 0\n").is_err());
    assert!(Config::from_yaml("defaults:\n  default_page: \"\"\n").is_err());
    assert!(Config::from_yaml("server: [not, a, map]\n").is_err());
}
