//! Sign-in, sign-up and sign-out through the controller, plus lifecycle errors.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;

use arenza_core::Role;
use arenza_integration_tests::{
    ADMIN_EMAIL, AuthFailure, Harness, ViewCall, admin_email, sample_catalog,
};
use arenza_storefront::{AuthError, ConfigurationError};

fn password() -> SecretString {
    SecretString::from("correct horse battery staple")
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let h = Harness::new();
    h.start().await;

    let second = h.controller.start(admin_email()).await;

    assert!(matches!(second, Err(ConfigurationError::AlreadyStarted)));
    assert_eq!(h.auth.subscriptions(), 1);
}

#[tokio::test]
async fn test_admin_sign_in_and_sign_out() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;

    h.controller.sign_in(ADMIN_EMAIL, &password()).await.unwrap();
    h.view
        .wait_until(|view| view.last_render().is_some_and(|(role, _)| role == Role::Admin))
        .await;
    assert_eq!(h.view.last_chrome(), Some(Role::Admin));
    assert!(h.view.calls().contains(&ViewCall::CloseAuthPrompt));

    h.controller.sign_out().await.unwrap();
    h.view
        .wait_until(|view| view.last_render().is_some_and(|(role, _)| role == Role::Guest))
        .await;
    assert_eq!(h.view.last_chrome(), Some(Role::Guest));
    assert_eq!(h.auth.sign_out_calls(), 1);
    assert_eq!(h.catalog.list_calls(), 2);
}

#[tokio::test]
async fn test_sign_in_failure_shows_generic_message() {
    let h = Harness::new();
    h.start().await;
    h.auth.fail_next(AuthFailure::Rejected {
        status: 400,
        message: "Email not confirmed".to_owned(),
    });

    let result = h.controller.sign_in("cliente@example.com", &password()).await;

    assert!(matches!(result, Err(AuthError::Rejected { .. })));
    assert_eq!(h.view.auth_errors(), vec!["Invalid email or password.".to_owned()]);
    assert!(h.view.catalog_errors().is_empty());
    assert!(!h.view.calls().contains(&ViewCall::CloseAuthPrompt));
    assert!(h.controller.session().await.is_none());
}

#[tokio::test]
async fn test_sign_in_clears_previous_error_first() {
    let h = Harness::new();
    h.start().await;
    h.auth.fail_next(AuthFailure::InvalidCredentials);

    let _ = h.controller.sign_in("cliente@example.com", &password()).await;
    h.controller
        .sign_in("cliente@example.com", &password())
        .await
        .unwrap();

    let calls = h.view.calls();
    let error_at = calls
        .iter()
        .position(|call| matches!(call, ViewCall::AuthError(_)))
        .unwrap();
    let cleared_after = calls
        .iter()
        .skip(error_at)
        .any(|call| *call == ViewCall::ClearAuthError);
    assert!(cleared_after);
}

#[tokio::test]
async fn test_malformed_email_never_reaches_backend() {
    let h = Harness::new();
    h.start().await;

    let result = h.controller.sign_in("not-an-email", &password()).await;

    assert!(matches!(result, Err(AuthError::InvalidEmail(_))));
    assert_eq!(h.auth.sign_in_calls(), 0);
    assert_eq!(h.view.auth_errors().len(), 1);
}

#[tokio::test]
async fn test_sign_up_shows_confirmation_notice() {
    let h = Harness::new();
    h.start().await;

    h.controller
        .sign_up("nova@example.com", &password())
        .await
        .unwrap();

    assert_eq!(h.auth.sign_up_calls(), 1);
    assert_eq!(h.view.notices().len(), 1);
    assert!(h.view.notices()[0].contains("confirm"));
    assert!(h.view.calls().contains(&ViewCall::CloseAuthPrompt));
}

#[tokio::test]
async fn test_sign_up_rejection_shows_backend_message() {
    let h = Harness::new();
    h.start().await;
    h.auth.fail_next(AuthFailure::Rejected {
        status: 422,
        message: "User already registered".to_owned(),
    });

    let result = h.controller.sign_up("nova@example.com", &password()).await;

    assert!(result.is_err());
    assert_eq!(h.view.auth_errors(), vec!["User already registered".to_owned()]);
    assert!(h.view.notices().is_empty());
}

#[tokio::test]
async fn test_sign_out_failure_keeps_session() {
    let h = Harness::new();
    h.start().await;
    h.controller.sign_in(ADMIN_EMAIL, &password()).await.unwrap();
    h.view.wait_for_renders(1).await;
    h.auth.fail_next(AuthFailure::Rejected {
        status: 500,
        message: "logout failed".to_owned(),
    });

    let result = h.controller.sign_out().await;

    assert!(result.is_err());
    assert_eq!(
        h.view.auth_errors(),
        vec!["Sign-out failed: logout failed".to_owned()]
    );
    assert_eq!(h.controller.current_role().await, Role::Admin);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_auth_backend_times_out() {
    let h = Harness::new();
    h.start().await;
    h.auth.hang();

    let result = h.controller.sign_in(ADMIN_EMAIL, &password()).await;

    assert!(matches!(result, Err(AuthError::Timeout(_))));
    assert_eq!(h.view.auth_errors(), vec!["Invalid email or password.".to_owned()]);
}
