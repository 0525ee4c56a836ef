//! Role derivation and chrome updates driven by session changes.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use arenza_core::{Email, ProductId, Role, Session};
use arenza_integration_tests::{
    ADMIN_EMAIL, Harness, admin_email, admin_session, customer_session, sample_catalog,
};
use arenza_storefront::AuthChangeKind;

#[test]
fn test_role_is_a_function_of_session_and_admin_email() {
    let admin = admin_email();
    let cases = [
        (None, Role::Guest),
        (Some(admin_session()), Role::Admin),
        (Some(customer_session()), Role::AuthenticatedUser),
        // Exact, case-sensitive comparison.
        (
            Some(Session::new("u-2", "Admin@arenza.com.br")),
            Role::AuthenticatedUser,
        ),
    ];

    for (session, expected) in cases {
        for _ in 0..3 {
            assert_eq!(Role::derive(session.as_ref(), Some(&admin)), expected);
        }
    }
}

#[test]
fn test_changing_admin_email_changes_role() {
    let session = admin_session();
    let other = Email::parse("dona@arenza.com.br").unwrap();
    assert_eq!(Role::derive(Some(&session), Some(&other)), Role::AuthenticatedUser);
    assert_eq!(Role::derive(Some(&session), None), Role::AuthenticatedUser);
}

#[tokio::test]
async fn test_no_fetch_before_first_session_change() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    assert!(!h.controller.catalog_loaded().await);
    assert!(h.controller.cached_products().await.is_empty());
    assert_eq!(h.catalog.list_calls(), 0);
    assert_eq!(h.auth.subscriptions(), 1);
}

#[tokio::test]
async fn test_admin_session_shows_admin_chrome_and_render() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.change_session(Some(admin_session())).await;

    assert_eq!(h.view.last_chrome(), Some(Role::Admin));
    let (role, ids) = h.view.last_render().unwrap();
    assert_eq!(role, Role::Admin);
    assert_eq!(ids, vec![ProductId::new(1), ProductId::new(2), ProductId::new(3)]);
    assert_eq!(h.controller.current_role().await, Role::Admin);
    assert!(h.controller.catalog_loaded().await);
}

#[tokio::test]
async fn test_customer_session_has_no_admin_controls() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.change_session(Some(customer_session())).await;

    assert_eq!(h.view.last_chrome(), Some(Role::AuthenticatedUser));
    assert_eq!(h.view.last_render().unwrap().0, Role::AuthenticatedUser);
}

#[tokio::test]
async fn test_sign_in_then_sign_out_through_event_loop() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.auth.emit(AuthChangeKind::InitialSession, None);
    h.view.wait_for_renders(1).await;
    assert_eq!(h.view.last_chrome(), Some(Role::Guest));

    h.auth.emit(AuthChangeKind::SignedIn, Some(admin_session()));
    h.view
        .wait_until(|view| view.last_render().is_some_and(|(role, _)| role == Role::Admin))
        .await;
    assert_eq!(h.view.last_chrome(), Some(Role::Admin));

    h.auth.emit(AuthChangeKind::SignedOut, None);
    h.view
        .wait_until(|view| view.last_render().is_some_and(|(role, _)| role == Role::Guest))
        .await;

    assert_eq!(h.view.chromes(), vec![Role::Guest, Role::Admin, Role::Guest]);
    // Sign-out refreshes too.
    assert_eq!(h.catalog.list_calls(), 3);
    assert!(h.controller.session().await.is_none());
}

#[tokio::test]
async fn test_duplicate_session_change_is_idempotent() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.change_session(Some(admin_session())).await;
    let once = (h.view.last_chrome(), h.view.last_render());

    h.change_session(Some(admin_session())).await;
    let twice = (h.view.last_chrome(), h.view.last_render());

    assert_eq!(once, twice);
    // Redundant events still refresh.
    assert_eq!(h.catalog.list_calls(), 2);
    assert_eq!(h.view.chromes(), vec![Role::Admin, Role::Admin]);
}

#[tokio::test]
async fn test_token_refresh_keeps_role() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.auth.emit(AuthChangeKind::SignedIn, Some(admin_session()));
    h.view.wait_for_renders(1).await;
    h.auth.emit(AuthChangeKind::TokenRefreshed, Some(admin_session()));
    h.view.wait_for_renders(2).await;

    assert!(h.view.renders().iter().all(|(role, _)| *role == Role::Admin));
    assert_eq!(
        h.controller.session().await.map(|s| s.email),
        Some(ADMIN_EMAIL.to_owned())
    );
}

#[tokio::test]
async fn test_shutdown_stops_handling_events() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.controller.shutdown().await;

    // The subscription may already be gone; either way nothing is handled.
    let _ = h.auth.try_emit(AuthChangeKind::SignedIn, Some(admin_session()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.controller.session().await.is_none());
    assert_eq!(h.catalog.list_calls(), 0);
    assert!(h.controller.is_started());
}
