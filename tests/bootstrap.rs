use oidc_config::{Config, ConfigError};
use oidc_keystore::Keystore;

fn required_vars() -> Vec<(&'static str, String)> {
    vec![
        ("HEROKU_APP_NAME", "oidc-demo".to_string()),
        ("PORT", "3000".to_string()),
        ("SECURE_KEY", "first,second".to_string()),
        ("REDIS_URL", "memory://".to_string()),
    ]
}

#[actix_rt::test]
async fn missing_port_fails_before_listening() {
    let vars: Vec<_> = required_vars()
        .into_iter()
        .filter(|(k, _)| *k != "PORT")
        .collect();

    let err = Config::from_vars(vars).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("PORT")));
}

#[actix_rt::test]
async fn malformed_secure_key_fails() {
    let mut vars = required_vars();
    vars.retain(|(k, _)| *k != "SECURE_KEY");
    vars.push(("SECURE_KEY", "just-one".to_string()));

    let err = Config::from_vars(vars).unwrap_err();
    assert_eq!(
        err.to_string(),
        "SECURE_KEY format invalid: expected exactly 2 comma-separated keys, got 1"
    );
}

#[actix_rt::test]
async fn generated_keystore_boots_the_provider() {
    let dir = tempfile::tempdir().unwrap();
    let keystore_path = dir.path().join("keystore.json");
    Keystore::generate_rsa(1024)
        .unwrap()
        .save(&keystore_path)
        .unwrap();

    let mut vars = required_vars();
    vars.push(("KEYSTORE_PATH", keystore_path.display().to_string()));
    vars.push((
        "PROVIDER_CONFIG",
        dir.path().join("absent.conf").display().to_string(),
    ));

    let config = Config::from_vars(vars).unwrap();
    let app = oidc_server::bootstrap(config).await.unwrap();

    assert_eq!(app.config.server.port, 3000);
    assert!(app.provider.client("foo").is_some());
    assert_eq!(
        app.provider.jwks().keys[0].kid,
        Keystore::load(&keystore_path).unwrap().kids()[0]
    );
}
