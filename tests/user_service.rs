use serde_json::json;
use std::sync::Arc;
use userbase::application_impl::user_service_factory;
use userbase::application_port::{RequestScope, UserService, UserServiceError};
use userbase::domain_model::{PreferenceOptions, User};
use userbase::domain_port::{DbSession, SessionFactory};
use userbase::infra_memory::{MemoryDbSession, MemorySessionFactory, MemoryUserTable};
use userbase::runtime::Runtime;

fn table_with(users: &[User]) -> MemoryUserTable {
    let table = MemoryUserTable::new();
    for user in users {
        table.insert(user.clone()).unwrap();
    }
    table
}

fn prefs(value: serde_json::Value) -> PreferenceOptions {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn cached_users_do_not_survive_the_transaction() {
    let foo = User::new("foo", "example.com");
    let session = Arc::new(MemoryDbSession::new(table_with(&[foo.clone()])));
    let service = user_service_factory(&RequestScope::new("example.com", session.clone()));

    for _ in 0..3 {
        service.fetch("acct:foo@example.com").await.unwrap();
        service.fetch("acct:ghost@example.com").await.unwrap();
    }
    assert_eq!(session.query_count(), 2);

    session.commit().await.unwrap();
    let again = service.fetch("acct:foo@example.com").await.unwrap();
    assert_eq!(again, Some(foo));
    assert_eq!(session.query_count(), 3);
}

#[tokio::test]
async fn preference_change_round_trips_through_commit() {
    let table = table_with(&[User::new("foo", "example.com")]);
    let runtime = Runtime::new(
        "example.com",
        Arc::new(MemorySessionFactory::new(table.clone())),
    );

    let request = runtime.open_request();
    let service = user_service_factory(&request);
    let mut foo = service
        .fetch_by_username("foo", "example.com")
        .await
        .unwrap()
        .unwrap();
    service
        .update_preferences(&mut foo, &prefs(json!({"show_sidebar_tutorial": false})))
        .unwrap();
    request.db.save_user(&foo).await.unwrap();
    request.db.commit().await.unwrap();

    // A cached copy from before the commit must not be served.
    let reread = service
        .fetch_by_username("foo", "example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(reread.sidebar_tutorial_dismissed);
    assert!(table.get(foo.user_id).unwrap().sidebar_tutorial_dismissed);
}

#[tokio::test]
async fn rejected_preferences_leave_stored_user_untouched() {
    let table = table_with(&[User::new("foo", "example.com")]);
    let factory = MemorySessionFactory::new(table.clone());
    let scope = RequestScope::new("example.com", factory.open());
    let service = user_service_factory(&scope);

    let mut foo = service.fetch("acct:foo@example.com").await.unwrap().unwrap();
    let err = service
        .update_preferences(
            &mut foo,
            &prefs(json!({"show_sidebar_tutorial": false, "theme": "dark"})),
        )
        .unwrap_err();
    assert!(matches!(
        &err,
        UserServiceError::DisallowedPreferences(keys) if keys == &["theme".to_string()]
    ));
    assert_eq!(err.to_string(), "settings with keys theme are not allowed");
    assert!(!foo.sidebar_tutorial_dismissed);
}

#[tokio::test]
async fn login_distinguishes_missing_from_unactivated() {
    let table = table_with(&[
        User::new("active", "example.com").with_email("Active@Example.com"),
        User::new("pending", "example.com")
            .with_email("pending@example.com")
            .deactivated(),
    ]);
    let factory = MemorySessionFactory::new(table);
    let service = user_service_factory(&RequestScope::new("example.com", factory.open()));

    let found = service.fetch_for_login("active@EXAMPLE.com").await.unwrap();
    assert_eq!(found.map(|u| u.username), Some("active".to_string()));

    assert!(matches!(
        service.fetch_for_login("pending").await,
        Err(UserServiceError::NotActivated)
    ));
    assert!(service.fetch_for_login("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_login_emails_surface_as_store_error() {
    let table = table_with(&[
        User::new("a", "example.com").with_email("shared@example.com"),
        User::new("b", "example.com").with_email("Shared@example.com"),
    ]);
    let factory = MemorySessionFactory::new(table);
    let service = user_service_factory(&RequestScope::new("example.com", factory.open()));

    let err = service
        .fetch_for_login("shared@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, UserServiceError::Store(_)));
}
