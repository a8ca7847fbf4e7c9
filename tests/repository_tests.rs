//! Integration tests for the repository layer against in-memory SQLite.

use anyhow::Result;
use meta_gateway::repositories::{
    AccountLookup, AdAccountRepository, ConnectionRepository, PageRepository,
    ad_account::AdAccountUpsert, connection::NewConnection, page::PageUpsert,
};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;

fn new_connection(app_id: &str, meta_user_id: &str) -> NewConnection {
    NewConnection {
        app_id: app_id.to_string(),
        org_id: Some("org-1".to_string()),
        label: Some("First".to_string()),
        meta_user_id: meta_user_id.to_string(),
        meta_user_name: Some("User One".to_string()),
        access_token: "aa:bb:cc".to_string(),
        token_expires_at: None,
        scopes: Some(serde_json::json!(["ads_read"])),
    }
}

#[tokio::test]
async fn upsert_by_meta_user_refreshes_existing_row() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let repo = ConnectionRepository::new(db);

    let first = repo
        .upsert_from_callback(new_connection("app-1", "meta-user-1"), true)
        .await?;

    let mut refreshed = new_connection("app-1", "meta-user-1");
    refreshed.access_token = "dd:ee:ff".to_string();
    refreshed.meta_user_name = Some("User One Renamed".to_string());
    let second = repo.upsert_from_callback(refreshed, true).await?;

    assert_eq!(first.id, second.id);
    assert_eq!(second.access_token, "dd:ee:ff");
    assert_eq!(second.meta_user_name.as_deref(), Some("User One Renamed"));

    let all = repo.list_for_app("app-1", None).await?;
    assert_eq!(all.len(), 1);
    Ok(())
}

#[tokio::test]
async fn insert_per_callback_creates_separate_rows() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let repo = ConnectionRepository::new(db);

    let first = repo
        .upsert_from_callback(new_connection("app-1", "meta-user-1"), false)
        .await?;
    let second = repo
        .upsert_from_callback(new_connection("app-1", "meta-user-1"), false)
        .await?;

    assert_ne!(first.id, second.id);
    assert_eq!(repo.list_for_app("app-1", None).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn upsert_scopes_natural_key_by_app() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let repo = ConnectionRepository::new(db);

    let a = repo
        .upsert_from_callback(new_connection("app-1", "meta-user-1"), true)
        .await?;
    let b = repo
        .upsert_from_callback(new_connection("app-2", "meta-user-1"), true)
        .await?;

    // Same Meta user under a different app is a distinct connection.
    assert_ne!(a.id, b.id);
    Ok(())
}

#[tokio::test]
async fn delete_owned_enforces_app_ownership() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let repo = ConnectionRepository::new(db);

    let connection = repo
        .upsert_from_callback(new_connection("app-1", "meta-user-1"), true)
        .await?;

    assert!(!repo.delete_owned(connection.id, "other-app").await?);
    assert!(repo.find_by_id(connection.id).await?.is_some());

    assert!(repo.delete_owned(connection.id, "app-1").await?);
    assert!(repo.find_by_id(connection.id).await?.is_none());

    assert!(!repo.delete_owned(Uuid::new_v4(), "app-1").await?);
    Ok(())
}

#[tokio::test]
async fn ad_account_upsert_preserves_reporting_toggle() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let connection =
        test_utils::seed_connection(db.clone(), "app-1", Some("org-1"), "meta-user-1", "tok")
            .await?;
    let repo = AdAccountRepository::new(db);

    test_utils::seed_ad_account(repo.db.clone(), connection.id, "111").await?;

    let AccountLookup::Found(account, _) = repo.find_with_connection("111", "app-1", None).await?
    else {
        panic!("seeded account");
    };
    let disabled = repo.set_active(account, false).await?;
    assert!(!disabled.is_active);

    // A re-discovery refreshes metadata but keeps the toggle off.
    repo.upsert_discovered(
        connection.id,
        AdAccountUpsert {
            ad_account_id: "111".to_string(),
            account_name: Some("Renamed Account".to_string()),
            currency: Some("EUR".to_string()),
            timezone: None,
            account_status: Some(1),
        },
    )
    .await?;

    let AccountLookup::Found(account, _) = repo.find_with_connection("111", "app-1", None).await?
    else {
        panic!("account still present");
    };
    assert_eq!(account.account_name.as_deref(), Some("Renamed Account"));
    assert_eq!(account.currency.as_deref(), Some("EUR"));
    assert!(!account.is_active);
    Ok(())
}

#[tokio::test]
async fn find_with_connection_scopes_by_app_and_org() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let connection =
        test_utils::seed_connection(db.clone(), "app-1", Some("org-1"), "meta-user-1", "tok")
            .await?;
    test_utils::seed_ad_account(db.clone(), connection.id, "222").await?;
    let repo = AdAccountRepository::new(db);

    assert!(matches!(
        repo.find_with_connection("222", "app-1", None).await?,
        AccountLookup::Found(..)
    ));
    assert!(matches!(
        repo.find_with_connection("222", "app-1", Some("org-1")).await?,
        AccountLookup::Found(..)
    ));

    // Accounts held by another app or org resolve distinctly from accounts
    // that do not exist at all, even though both map to a 404.
    assert!(matches!(
        repo.find_with_connection("222", "app-2", None).await?,
        AccountLookup::NotOwned
    ));
    assert!(matches!(
        repo.find_with_connection("222", "app-1", Some("org-2")).await?,
        AccountLookup::NotOwned
    ));
    assert!(matches!(
        repo.find_with_connection("999", "app-1", None).await?,
        AccountLookup::Missing
    ));
    Ok(())
}

#[tokio::test]
async fn delete_owned_cascades_to_discovered_assets() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let connection =
        test_utils::seed_connection(db.clone(), "app-1", None, "meta-user-1", "tok").await?;
    test_utils::seed_ad_account(db.clone(), connection.id, "401").await?;

    let pages = PageRepository::new(db.clone());
    pages
        .upsert_discovered(
            connection.id,
            PageUpsert {
                page_id: "501".to_string(),
                page_name: Some("Test Page".to_string()),
                page_access_token: "aa:bb:cc".to_string(),
                instagram_account_id: None,
            },
        )
        .await?;

    let connections = ConnectionRepository::new(db.clone());
    assert!(connections.delete_owned(connection.id, "app-1").await?);

    let accounts = AdAccountRepository::new(db.clone());
    assert!(
        accounts
            .list_for_connections(&[connection.id])
            .await?
            .is_empty()
    );
    assert!(pages.list_for_connections(&[connection.id]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_for_app_filters_active_only() -> Result<()> {
    let db = test_utils::setup_test_db().await?;
    let connection =
        test_utils::seed_connection(db.clone(), "app-1", None, "meta-user-1", "tok").await?;
    test_utils::seed_ad_account(db.clone(), connection.id, "301").await?;
    test_utils::seed_ad_account(db.clone(), connection.id, "302").await?;
    let repo = AdAccountRepository::new(db);

    let AccountLookup::Found(account, _) = repo.find_with_connection("302", "app-1", None).await?
    else {
        panic!("seeded account");
    };
    repo.set_active(account, false).await?;

    let all = repo.list_for_app("app-1", None, false).await?;
    assert_eq!(all.len(), 2);

    let active = repo.list_for_app("app-1", None, true).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].0.ad_account_id, "301");
    Ok(())
}
