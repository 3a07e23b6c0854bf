use chrono::Utc;
use rfieldclock::errors::AppError;

mod common;
use common::{FakeRemote, PASSWORD, USER, USERNAME, settled_engine};

#[tokio::test]
async fn test_online_login_caches_credentials() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote.clone()).await;

    let session = engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect("login");
    assert!(!session.offline);
    assert_eq!(session.profile.user_id, USER);

    // the current user is remembered
    let p = engine.session.profile(None).expect("profile");
    assert_eq!(p.username, USERNAME);

    remote.set_offline(true);
    let offline = engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect("offline login");
    assert!(offline.offline);
    assert_eq!(offline.profile, session.profile);
}

#[tokio::test]
async fn test_offline_login_rejects_wrong_password() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote.clone()).await;
    engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect("login");

    remote.set_offline(true);
    let err = engine
        .session
        .login(USERNAME, "nope", Utc::now())
        .await
        .expect_err("wrong password");
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_offline_login_without_cache_fails() {
    let engine = settled_engine(FakeRemote::offline()).await;
    let err = engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect_err("nothing cached");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_server_rejection_never_falls_back_offline() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote).await;
    engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect("login");

    // the server says no, even though the cache would accept the old password
    let err = engine
        .session
        .login(USERNAME, "changed", Utc::now())
        .await
        .expect_err("rejected");
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_logout_forgets_current_user() {
    let engine = settled_engine(FakeRemote::online()).await;
    engine
        .session
        .login(USERNAME, PASSWORD, Utc::now())
        .await
        .expect("login");

    assert!(engine.session.logout().expect("logout"));
    assert!(matches!(
        engine.session.profile(None),
        Err(AppError::UnknownUser(_))
    ));
    // explicit user still resolves from the credential cache
    assert!(engine.session.profile(Some(USERNAME)).is_ok());
    assert!(!engine.session.logout().expect("logout again"));
}
