//! List stores and write services sharing one query cache.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use trackly::application::cache::{build_key, CacheOptions, QueryCache};
use trackly::application::list::{
    deliveries_store, orders_store, AutoRefresh, DeliveriesService, OrdersService, OrdersStore,
};
use trackly::domain::{
    CreateDeliveriesBatchRequest, CreateOrderRequest, DeleteOrdersBatchRequest, DeliveryStatus,
    DriverId, ListFilters, Order,
};
use trackly::error::Error;
use trackly::testkit::domain;
use trackly::testkit::fetcher::{GatedFetcher, StaticFetcher};
use trackly::testkit::gateway::{MemoryDeliveries, MemoryOrders};

fn request(customer: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: customer.to_string(),
        address: "12 rue Foch".to_string(),
        order_date: None,
    }
}

#[tokio::test]
async fn created_order_appears_after_invalidation() {
    let cache = QueryCache::new();
    let gateway = Arc::new(MemoryOrders::with_orders(vec![domain::order("Ada")]));
    let store = orders_store(gateway.clone(), cache.clone(), CacheOptions::default());
    let service = OrdersService::new(gateway, cache.clone());

    store.load(ListFilters::default()).await;
    assert_eq!(store.state().items.len(), 1);

    service.create(&request("Grace")).await.unwrap();
    assert!(cache.is_empty());

    store.load(ListFilters::default()).await;
    let names: Vec<_> = store
        .state()
        .items
        .iter()
        .map(|o| o.customer_name.clone())
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);
}

#[tokio::test]
async fn failed_write_keeps_cached_pages() {
    let cache = QueryCache::new();
    let gateway = Arc::new(MemoryOrders::with_orders(vec![domain::order("Ada")]));
    let store = orders_store(gateway.clone(), cache.clone(), CacheOptions::default());
    let service = OrdersService::new(gateway.clone(), cache.clone());

    store.load(ListFilters::default()).await;
    gateway.fail_writes();

    let ids = store.state().items.iter().map(|o| o.id).collect();
    let err = service
        .delete_batch(&DeleteOrdersBatchRequest {
            ids,
            force_delete_deliveries: false,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn search_terms_are_cached_separately() {
    let cache = QueryCache::new();
    let gateway = Arc::new(MemoryOrders::with_orders(vec![
        domain::order("Ada"),
        domain::order("Grace"),
    ]));
    let store = orders_store(gateway, cache.clone(), CacheOptions::default());

    store.load(ListFilters::default().with_search("Ada")).await;
    assert_eq!(store.state().items.len(), 1);
    store.load(ListFilters::default()).await;
    assert_eq!(store.state().items.len(), 2);

    assert_eq!(cache.len(), 2);
    assert_eq!(store.invalidate(), 2);
}

#[tokio::test]
async fn delivery_batch_refreshes_delivery_list() {
    let cache = QueryCache::new();
    let gateway = Arc::new(MemoryDeliveries::with_deliveries(vec![domain::delivery(
        DeliveryStatus::Completed,
    )]));
    let store = deliveries_store(gateway.clone(), cache.clone(), CacheOptions::default());
    let service = DeliveriesService::new(gateway, cache);

    store.load(ListFilters::default()).await;
    assert_eq!(store.state().items.len(), 1);

    let driver = DriverId::random();
    service
        .create_batch(&CreateDeliveriesBatchRequest {
            driver_id: driver,
            order_ids: vec![domain::order("Ada").id, domain::order("Grace").id],
        })
        .await
        .unwrap();

    store.load(ListFilters::default()).await;
    assert_eq!(store.state().items.len(), 3);

    let only_driver = ListFilters {
        driver_id: Some(driver),
        ..ListFilters::default()
    };
    store.load(only_driver).await;
    assert_eq!(store.state().items.len(), 2);
}

#[tokio::test]
async fn stores_on_one_cache_share_pages() {
    let cache = QueryCache::new();
    let fetcher = Arc::new(StaticFetcher::new(vec![domain::order("Ada")]));
    let calls = fetcher.calls();
    let first = orders_store(fetcher.clone(), cache.clone(), CacheOptions::default());
    let second = orders_store(fetcher, cache, CacheOptions::default());

    first.load(ListFilters::default()).await;
    second.load(ListFilters::default()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.state().items.len(), 1);
}

#[tokio::test]
async fn newer_filters_win_over_slow_older_load() {
    let fetcher = GatedFetcher::new();
    let gate = fetcher.handle();
    let store = Arc::new(orders_store(
        Arc::new(fetcher),
        QueryCache::new(),
        CacheOptions::default(),
    ));

    let slow = {
        let store = store.clone();
        tokio::spawn(async move { store.load(ListFilters::default().with_search("old")).await })
    };
    gate.wait_for_calls(1).await;

    let fast = {
        let store = store.clone();
        tokio::spawn(async move { store.load(ListFilters::default().with_search("new")).await })
    };
    gate.wait_for_calls(2).await;

    assert!(gate.release("new", Ok(vec![domain::order("New")])));
    fast.await.unwrap();
    slow.await.unwrap();
    support::settle().await;
    // Nobody else waited for the superseded load, so it was cancelled.
    assert!(!gate.release("old", Ok(vec![domain::order("Old")])));

    let state = store.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].customer_name, "New");
    assert!(!state.loading);
    assert!(state.error.is_none());
}

fn customers(store: &OrdersStore<GatedFetcher<Order>>) -> Vec<String> {
    store
        .state()
        .items
        .iter()
        .map(|o| o.customer_name.clone())
        .collect()
}

#[tokio::test]
async fn switching_filters_keeps_a_shared_load_alive_for_other_stores() {
    let cache = QueryCache::new();
    let fetcher = Arc::new(GatedFetcher::new());
    let gate = fetcher.handle();
    let first = Arc::new(orders_store(fetcher.clone(), cache.clone(), CacheOptions::default()));
    let second = Arc::new(orders_store(fetcher, cache.clone(), CacheOptions::default()));
    let shared_key = build_key("orders:list", &ListFilters::default());

    let first_load = {
        let first = first.clone();
        tokio::spawn(async move { first.load(ListFilters::default()).await })
    };
    gate.wait_for_calls(1).await;
    let second_load = {
        let second = second.clone();
        tokio::spawn(async move { second.load(ListFilters::default()).await })
    };
    support::wait_until(Duration::from_secs(1), || cache.waiters(&shared_key) == 2).await;

    let searched = {
        let first = first.clone();
        tokio::spawn(async move { first.load(ListFilters::default().with_search("x")).await })
    };
    gate.wait_for_calls(2).await;
    first_load.await.unwrap();
    assert!(cache.is_loading(&shared_key));

    assert!(gate.release("", Ok(vec![domain::order("Shared")])));
    second_load.await.unwrap();
    let state = second.state();
    assert_eq!(customers(&second), vec!["Shared"]);
    assert!(state.error.is_none());
    assert!(!state.loading);

    assert!(gate.release("x", Ok(vec![domain::order("Searched")])));
    searched.await.unwrap();
    assert_eq!(customers(&first), vec!["Searched"]);
}

#[tokio::test]
async fn late_superseded_page_is_never_shown() {
    let cache = QueryCache::new();
    let fetcher = Arc::new(GatedFetcher::new());
    let gate = fetcher.handle();
    let first = Arc::new(orders_store(fetcher.clone(), cache.clone(), CacheOptions::default()));
    let second = Arc::new(orders_store(fetcher, cache.clone(), CacheOptions::default()));
    let old_key = build_key("orders:list", &ListFilters::default().with_search("old"));

    let first_old = {
        let first = first.clone();
        tokio::spawn(async move { first.load(ListFilters::default().with_search("old")).await })
    };
    gate.wait_for_calls(1).await;
    let second_old = {
        let second = second.clone();
        tokio::spawn(async move { second.load(ListFilters::default().with_search("old")).await })
    };
    support::wait_until(Duration::from_secs(1), || cache.waiters(&old_key) == 2).await;

    let first_new = {
        let first = first.clone();
        tokio::spawn(async move { first.load(ListFilters::default().with_search("new")).await })
    };
    gate.wait_for_calls(2).await;
    assert!(gate.release("new", Ok(vec![domain::order("New")])));
    first_new.await.unwrap();
    first_old.await.unwrap();
    assert_eq!(customers(&first), vec!["New"]);

    // The old page is still awaited by the second store and resolves last.
    assert!(gate.release("old", Ok(vec![domain::order("Old")])));
    second_old.await.unwrap();
    support::settle().await;

    assert_eq!(customers(&second), vec!["Old"]);
    assert_eq!(customers(&first), vec!["New"]);
    assert!(cache.get::<trackly::application::list::ListPage<Order>>(&old_key).is_some());
}

#[tokio::test]
async fn failure_is_reported_and_cleared_by_next_success() {
    let fetcher = StaticFetcher::new(vec![domain::order("Ada")]);
    let failing = fetcher.failure_switch();
    let store = orders_store(
        Arc::new(fetcher),
        QueryCache::new(),
        CacheOptions::default(),
    );

    failing.store(true, Ordering::SeqCst);
    store.load(ListFilters::default()).await;
    let state = store.state();
    assert!(state.error.as_deref().unwrap().contains("500"));
    assert!(state.items.is_empty());

    failing.store(false, Ordering::SeqCst);
    store.refresh().await;
    let state = store.state();
    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_refetches_each_period() {
    let fetcher = StaticFetcher::new(vec![1, 2]);
    let calls = fetcher.calls();
    let store = Arc::new(orders_like_store(fetcher));

    store.load(ListFilters::default()).await;
    let refresh = AutoRefresh::spawn(&store, Duration::from_secs(5));

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    support::settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    refresh.stop();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

fn orders_like_store(
    fetcher: StaticFetcher<i32>,
) -> trackly::application::list::ListStore<StaticFetcher<i32>> {
    trackly::application::list::ListStore::new(
        "numbers:list",
        Arc::new(fetcher),
        QueryCache::new(),
        CacheOptions::default(),
    )
}

#[tokio::test]
async fn aborted_cache_load_reports_aborted() {
    let cache = QueryCache::new();
    let key = build_key("orders:list", &ListFilters::default());

    let waiter = {
        let cache = cache.clone();
        let key = key.clone();
        tokio::spawn(async move {
            cache
                .dedupe(&key, || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(0u8)
                })
                .await
        })
    };
    support::wait_until(Duration::from_secs(1), || cache.is_loading(&key)).await;

    cache.clear();
    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(Error::Aborted)));
    assert_eq!(cache.in_flight_len(), 0);
}
