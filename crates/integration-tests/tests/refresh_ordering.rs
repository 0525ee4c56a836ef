//! Overlapping refreshes, cache ordering and refresh failures.

#![allow(clippy::unwrap_used)]

use arenza_core::{ProductId, Role};
use arenza_integration_tests::{Harness, admin_session, product, sample_catalog};
use arenza_storefront::BackendError;

fn ids(raw: &[i64]) -> Vec<ProductId> {
    raw.iter().copied().map(ProductId::new).collect()
}

/// Guest event, then admin event, both refreshes held until released in
/// `release_order`.
async fn overlapping_refreshes(release_order: [usize; 2]) -> Harness {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.catalog.hold_lists();

    let first = h.controller.on_session_changed(None).await;
    let second = h.controller.on_session_changed(Some(admin_session())).await;
    h.catalog.wait_for_held(2).await;

    for index in release_order {
        h.catalog.release(index);
    }
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    h
}

#[tokio::test]
async fn test_later_session_wins_when_responses_arrive_in_order() {
    let h = overlapping_refreshes([0, 1]).await;

    assert_eq!(h.view.chromes(), vec![Role::Guest, Role::Admin]);
    assert_eq!(h.view.last_render().unwrap().0, Role::Admin);
}

#[tokio::test]
async fn test_later_session_wins_when_responses_arrive_reversed() {
    let h = overlapping_refreshes([1, 0]).await;

    assert_eq!(h.view.last_chrome(), Some(Role::Admin));
    // Both refreshes render, each with the role current when it lands.
    let renders = h.view.renders();
    assert_eq!(renders.len(), 2);
    assert!(renders.iter().all(|(role, _)| *role == Role::Admin));
}

#[tokio::test]
async fn test_sign_out_during_refresh_hides_admin_controls() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.change_session(Some(admin_session())).await;
    h.view.clear();

    h.catalog.hold_lists();
    let slow_admin = h.controller.refresh_catalog();
    let guest = h.controller.on_session_changed(None).await;
    let (slow_admin, ()) = tokio::join!(slow_admin, async {
        h.catalog.wait_for_held(2).await;
        // Arrival order of the two calls is not fixed; release both.
        h.catalog.release(1);
        h.catalog.release(0);
    });

    slow_admin.unwrap();
    guest.await.unwrap().unwrap();
    assert_eq!(h.view.chromes(), vec![Role::Guest]);
    // Whichever response lands last, nothing renders with admin controls.
    let renders = h.view.renders();
    assert_eq!(renders.len(), 2);
    assert!(renders.iter().all(|(role, _)| *role == Role::Guest));
}

#[tokio::test]
async fn test_unsorted_backend_rows_are_cached_ascending() {
    let h = Harness::with_products(vec![
        product(3, "Saída de Praia", "89,50"),
        product(1, "Biquíni Lua", "149,90"),
        product(2, "Maiô Mar", "199,00"),
    ]);
    h.start().await;

    h.change_session(None).await;

    let cached: Vec<_> = h
        .controller
        .cached_products()
        .await
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(cached, ids(&[1, 2, 3]));
    assert_eq!(h.view.last_render().unwrap().1, ids(&[1, 2, 3]));
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_cache_and_view() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.change_session(None).await;
    let renders_before = h.view.renders().len();

    h.catalog.set_products(Vec::new());
    h.catalog.fail_lists(true);
    let result = h.controller.refresh_catalog().await;

    assert!(matches!(result, Err(BackendError::Api { status: 503, .. })));
    assert_eq!(h.controller.cached_products().await.len(), 3);
    assert_eq!(h.view.renders().len(), renders_before);
    assert!(h.view.catalog_errors().is_empty());
}

#[tokio::test]
async fn test_first_refresh_failure_leaves_catalog_unloaded() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.catalog.fail_lists(true);

    let refresh = h.controller.on_session_changed(None).await;
    assert!(refresh.await.unwrap().is_err());

    assert!(!h.controller.catalog_loaded().await);
    assert!(h.view.renders().is_empty());
    assert_eq!(h.view.chromes(), vec![Role::Guest]);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_list_times_out() {
    let h = Harness::with_products(sample_catalog());
    h.start().await;
    h.catalog.hold_lists();

    let result = h.controller.refresh_catalog().await;

    assert!(matches!(result, Err(BackendError::Timeout(_))));
    assert!(!h.controller.catalog_loaded().await);
}
