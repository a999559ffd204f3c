#![allow(dead_code)]

use std::time::Duration;

use oidc_core::{Model, Payload};
use oidc_ports::Adapter;

fn fail(msg: &str) -> std::io::Error {
    std::io::Error::other(msg.to_string())
}

fn adapter_err(e: oidc_core::OidcError) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

/// A contract test suite that every `Adapter` backend must satisfy.
///
/// `prefix` keeps ids unique so the suite can run against a shared Redis.
pub async fn run_adapter_contract(
    adapter: &dyn Adapter,
    prefix: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = |s: &str| format!("{prefix}-{s}");

    // Roundtrip without TTL
    let session = Payload::new()
        .with("accountId", "user1")
        .with("loginTs", 1_700_000_000);
    adapter
        .upsert(Model::Session, &id("s1"), &session, None)
        .await
        .map_err(adapter_err)?;
    let found = adapter
        .find(Model::Session, &id("s1"))
        .await
        .map_err(adapter_err)?
        .ok_or_else(|| fail("session should exist"))?;
    assert_eq!(found, session);

    // Models are separate namespaces.
    assert!(adapter
        .find(Model::AccessToken, &id("s1"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // Upsert replaces.
    let replaced = Payload::new().with("accountId", "user2");
    adapter
        .upsert(Model::Session, &id("s1"), &replaced, None)
        .await
        .map_err(adapter_err)?;
    assert_eq!(
        adapter
            .find(Model::Session, &id("s1"))
            .await
            .map_err(adapter_err)?,
        Some(replaced)
    );

    // Destroy, twice: the second is a no-op.
    adapter
        .destroy(Model::Session, &id("s1"))
        .await
        .map_err(adapter_err)?;
    adapter
        .destroy(Model::Session, &id("s1"))
        .await
        .map_err(adapter_err)?;
    assert!(adapter
        .find(Model::Session, &id("s1"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // Consume marks without changing other fields.
    let code = Payload::new()
        .with("accountId", "user1")
        .with("clientId", "foo")
        .with("grantId", id("g-consume").as_str());
    adapter
        .upsert(Model::AuthorizationCode, &id("c1"), &code, Some(60))
        .await
        .map_err(adapter_err)?;
    adapter
        .consume(Model::AuthorizationCode, &id("c1"))
        .await
        .map_err(adapter_err)?;
    let consumed = adapter
        .find(Model::AuthorizationCode, &id("c1"))
        .await
        .map_err(adapter_err)?
        .ok_or_else(|| fail("consumed code should still exist"))?;
    assert!(consumed.is_consumed());
    let mut without_marker = consumed.clone();
    without_marker.remove("consumed");
    assert_eq!(without_marker, code);

    // Consuming a missing record creates nothing.
    adapter
        .consume(Model::AuthorizationCode, &id("missing"))
        .await
        .map_err(adapter_err)?;
    assert!(adapter
        .find(Model::AuthorizationCode, &id("missing"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // Re-upsert clears the consumed marker.
    adapter
        .upsert(Model::AuthorizationCode, &id("c1"), &code, Some(60))
        .await
        .map_err(adapter_err)?;
    let fresh = adapter
        .find(Model::AuthorizationCode, &id("c1"))
        .await
        .map_err(adapter_err)?
        .ok_or_else(|| fail("code should exist"))?;
    assert!(!fresh.is_consumed());

    // uid and userCode indirection
    let interaction = Payload::new()
        .with("uid", id("uid-1").as_str())
        .with("returnTo", "http://localoidc/auth/x");
    adapter
        .upsert(Model::Interaction, &id("i1"), &interaction, Some(60))
        .await
        .map_err(adapter_err)?;
    assert_eq!(
        adapter
            .find_by_uid(Model::Interaction, &id("uid-1"))
            .await
            .map_err(adapter_err)?,
        Some(interaction)
    );

    let device = Payload::new()
        .with("userCode", id("ABCD-EFGH").as_str())
        .with("clientId", "foo");
    adapter
        .upsert(Model::DeviceCode, &id("d1"), &device, Some(60))
        .await
        .map_err(adapter_err)?;
    assert_eq!(
        adapter
            .find_by_user_code(Model::DeviceCode, &id("ABCD-EFGH"))
            .await
            .map_err(adapter_err)?,
        Some(device)
    );
    assert!(adapter
        .find_by_user_code(Model::DeviceCode, &id("unknown"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // A dangling index resolves to nothing.
    adapter
        .destroy(Model::DeviceCode, &id("d1"))
        .await
        .map_err(adapter_err)?;
    assert!(adapter
        .find_by_user_code(Model::DeviceCode, &id("ABCD-EFGH"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // Grant cascade spans models and leaves other grants alone.
    let g1 = id("g1");
    let g2 = id("g2");
    let access = Payload::new().with("grantId", g1.as_str());
    let refresh = Payload::new().with("grantId", g1.as_str());
    let other = Payload::new().with("grantId", g2.as_str());
    adapter
        .upsert(Model::AccessToken, &id("at1"), &access, Some(60))
        .await
        .map_err(adapter_err)?;
    adapter
        .upsert(Model::RefreshToken, &id("rt1"), &refresh, None)
        .await
        .map_err(adapter_err)?;
    adapter
        .upsert(Model::AccessToken, &id("at2"), &other, Some(60))
        .await
        .map_err(adapter_err)?;

    adapter.revoke_by_grant_id(&g1).await.map_err(adapter_err)?;
    assert!(adapter
        .find(Model::AccessToken, &id("at1"))
        .await
        .map_err(adapter_err)?
        .is_none());
    assert!(adapter
        .find(Model::RefreshToken, &id("rt1"))
        .await
        .map_err(adapter_err)?
        .is_none());
    assert!(adapter
        .find(Model::AccessToken, &id("at2"))
        .await
        .map_err(adapter_err)?
        .is_some());

    // Revoking an unknown grant is fine.
    adapter
        .revoke_by_grant_id(&id("no-such-grant"))
        .await
        .map_err(adapter_err)?;

    // End to end: issue an authorization code under a grant, then revoke the grant.
    let abc = Payload::new()
        .with("sub", "user1")
        .with("grantId", id("e2e-g1").as_str());
    adapter
        .upsert(Model::AuthorizationCode, &id("abc123"), &abc, Some(60))
        .await
        .map_err(adapter_err)?;
    assert_eq!(
        adapter
            .find(Model::AuthorizationCode, &id("abc123"))
            .await
            .map_err(adapter_err)?,
        Some(abc)
    );
    adapter
        .revoke_by_grant_id(&id("e2e-g1"))
        .await
        .map_err(adapter_err)?;
    assert!(adapter
        .find(Model::AuthorizationCode, &id("abc123"))
        .await
        .map_err(adapter_err)?
        .is_none());

    // TTL expiry
    adapter
        .upsert(
            Model::AccessToken,
            &id("short"),
            &Payload::new().with("uid", id("short-uid").as_str()),
            Some(1),
        )
        .await
        .map_err(adapter_err)?;
    assert!(adapter
        .find(Model::AccessToken, &id("short"))
        .await
        .map_err(adapter_err)?
        .is_some());
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(adapter
        .find(Model::AccessToken, &id("short"))
        .await
        .map_err(adapter_err)?
        .is_none());
    assert!(adapter
        .find_by_uid(Model::AccessToken, &id("short-uid"))
        .await
        .map_err(adapter_err)?
        .is_none());

    adapter.healthcheck().await.map_err(adapter_err)?;

    Ok(())
}
