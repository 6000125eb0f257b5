use super::*;
use crate::api::types::{Halaka, Invitation, InvitationStatus, TeacherProfile};
use crate::api::ErrorMessages;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(uri: &str) -> HttpClient {
  HttpClient::new(uri, Duration::from_secs(5), ErrorMessages::default()).unwrap()
}

fn store<R: Resource>(server: &MockServer, cache: &Arc<RequestCache>) -> ResourceStore<R> {
  ResourceStore::new(client_for(&server.uri()), cache.clone())
}

fn halakat_body() -> Value {
  json!({
    "status": "success",
    "data": [
      {"id": "h1", "title": "حفظ جزء عم", "status": "active", "maxStudents": 10, "currentStudents": 3},
      {"id": "h2", "title": "تجويد", "status": "completed"}
    ]
  })
}

fn all_query() -> ListQuery {
  ListQuery::new([("status", "all")], 1, 10, false)
}

async fn mount_list(server: &MockServer, times: u64) {
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(200).set_body_json(halakat_body()))
    .expect(times)
    .mount(server)
    .await;
}

#[tokio::test]
async fn test_fetch_list_then_cache_hit() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  let first = halakat.fetch_list(all_query()).await.unwrap();
  assert_eq!(first, FetchOutcome::Applied(CacheSource::Network));
  assert_eq!(halakat.items().len(), 2);
  assert_eq!(halakat.load_state(), LoadState::Ready);

  let key = ResourceStore::<Halaka>::list_key(&all_query());
  assert_eq!(key.to_string(), "/halakat?limit=10&page=1");
  assert!(cache.contains(&key));

  let items_before = halakat.items();
  let second = halakat.fetch_list(all_query()).await.unwrap();
  assert_eq!(second, FetchOutcome::Applied(CacheSource::Cache));
  assert_eq!(halakat.items(), items_before);
}

#[tokio::test]
async fn test_normalization_applied_to_list_items() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.fetch_list(all_query()).await.unwrap();
  let h2 = halakat.items().into_iter().find(|h| h.id == "h2").unwrap();
  assert_eq!(h2.description, "لا يوجد وصف");
  assert_eq!(h2.max_students, 10);
}

#[tokio::test]
async fn test_missing_pagination_falls_back_to_single_page() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.fetch_list(all_query()).await.unwrap();
  let p = halakat.pagination();
  assert_eq!((p.current_page, p.total_pages), (1, 1));
  assert!(!p.has_next);
  assert!(!p.has_prev);
}

#[tokio::test]
async fn test_mutations_invalidate_cached_lists() {
  let server = MockServer::start().await;
  // Initial fetch plus one refetch after each of the three mutations
  mount_list(&server, 4).await;
  Mock::given(method("POST"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "h3", "title": "جديد"}})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("PUT"))
    .and(path("/halakat/h1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "h1", "title": "معدل"}})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("DELETE"))
    .and(path("/halakat/h2"))
    .respond_with(ResponseTemplate::new(204))
    .expect(1)
    .mount(&server)
    .await;

  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  let created = halakat.create(json!({"title": "جديد"})).await.unwrap();
  assert_eq!(created.map(|h| h.id), Some("h3".to_string()));
  assert!(halakat.items().iter().any(|h| h.id == "h3"));
  assert_eq!(
    halakat.fetch_list(all_query()).await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );

  halakat.update("h1", json!({"title": "معدل"})).await.unwrap();
  assert_eq!(
    halakat.fetch_list(all_query()).await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );

  halakat.delete("h2").await.unwrap();
  assert!(halakat.items().iter().all(|h| h.id != "h2"));
  assert_eq!(
    halakat.fetch_list(all_query()).await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );
}

#[tokio::test]
async fn test_mutation_leaves_other_collections_cached() {
  let server = MockServer::start().await;
  Mock::given(method("DELETE"))
    .respond_with(ResponseTemplate::new(204))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let teachers_key = RequestKey::path("/teachers");
  cache.set(teachers_key.clone(), json!([]));
  cache.set(RequestKey::path("/halakat/h1"), json!({}));

  let halakat = store::<Halaka>(&server, &cache);
  halakat.delete("h9").await.unwrap();

  assert!(cache.contains(&teachers_key));
  assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_update_replaces_item_by_id() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  Mock::given(method("PUT"))
    .and(path("/halakat/h1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "h1", "title": "معدل", "maxStudents": 20}})))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  halakat.update("h1", json!({"title": "معدل"})).await.unwrap();

  let items = halakat.items();
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].title, "معدل");
  assert_eq!(items[0].max_students, 20);
}

#[tokio::test]
async fn test_concurrent_fetch_is_dropped() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(halakat_body())
        .set_delay(Duration::from_millis(200)),
    )
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  let (first, second) = tokio::join!(
    halakat.fetch_list(all_query()),
    halakat.fetch_list(all_query())
  );

  assert_eq!(first.unwrap(), FetchOutcome::Applied(CacheSource::Network));
  assert_eq!(second.unwrap(), FetchOutcome::Skipped);
  assert!(!halakat.is_request_in_progress());
}

#[tokio::test]
async fn test_set_filter_page_rules() {
  let server = MockServer::start().await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.set_filter("page", 3);
  halakat.set_filter("status", "active");
  assert_eq!(halakat.filters().page(), 1);

  halakat.set_filter("page", 5);
  let filters = halakat.filters();
  assert_eq!(filters.page(), 5);
  assert_eq!(filters.get("status"), Some("active"));
}

#[tokio::test]
async fn test_set_filter_drops_cached_queries() {
  let server = MockServer::start().await;
  mount_list(&server, 2).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.fetch_current(10).await.unwrap();
  assert_eq!(cache.len(), 1);

  halakat.set_filter("search", "جزء");
  assert!(cache.is_empty());

  halakat.set_filter("search", "");
  assert_eq!(
    halakat.fetch_current(10).await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );
}

#[tokio::test]
async fn test_rate_limit_sets_error_and_keeps_items() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(200).set_body_json(halakat_body()))
    .up_to_n_times(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(429))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.fetch_list(all_query()).await.unwrap();
  halakat.invalidate_cache();

  let err = halakat.fetch_list(all_query()).await.unwrap_err();
  assert_eq!(err.kind(), crate::api::ErrorKind::RateLimited);
  assert_eq!(halakat.error(), Some(ErrorMessages::default().rate_limited));
  assert_eq!(halakat.load_state(), LoadState::Error);
  assert!(!halakat.is_loading());
  assert_eq!(halakat.items().len(), 2);
}

#[tokio::test]
async fn test_network_failure_sets_connectivity_message() {
  let port = {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
  };
  let cache = Arc::new(RequestCache::new());
  let halakat: ResourceStore<Halaka> =
    ResourceStore::new(client_for(&format!("http://127.0.0.1:{}", port)), cache.clone());

  assert!(halakat.fetch_list(all_query()).await.is_err());
  assert_eq!(halakat.error(), Some(ErrorMessages::default().connectivity));
  assert!(cache.is_empty());
}

#[tokio::test]
async fn test_next_action_clears_error() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(503))
    .up_to_n_times(1)
    .mount(&server)
    .await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  assert!(halakat.fetch_list(all_query()).await.is_err());
  assert_eq!(halakat.load_state(), LoadState::Error);

  halakat.fetch_list(all_query()).await.unwrap();
  assert_eq!(halakat.error(), None);
  assert_eq!(halakat.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn test_enroll_increments_seat_count_without_refetch() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  Mock::given(method("POST"))
    .and(path("/halakat/h1/enroll"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": "success",
      "data": {"id": "e1", "status": "pending_payment", "amount": 120}
    })))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  let enrollment = halakat.enroll("h1").await.unwrap();

  assert_eq!(enrollment.id, "e1");
  assert_eq!(enrollment.halaka_id, "h1");
  assert_eq!(enrollment.amount, 120.0);
  let items = halakat.items();
  assert_eq!(items.iter().find(|h| h.id == "h1").unwrap().current_students, 4);
  assert_eq!(items.iter().find(|h| h.id == "h2").unwrap().current_students, 0);
  assert!(cache.is_empty());
}

#[tokio::test]
async fn test_failed_enroll_leaves_count() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  Mock::given(method("POST"))
    .and(path("/halakat/h1/enroll"))
    .respond_with(ResponseTemplate::new(400).set_body_json(json!({"status": "error", "message": "الحلقة ممتلئة"})))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  let err = halakat.enroll("h1").await.unwrap_err();
  assert_eq!(err.message(), "الحلقة ممتلئة");
  assert_eq!(halakat.error().as_deref(), Some("الحلقة ممتلئة"));
  assert_eq!(halakat.items()[0].current_students, 3);
  // Failed writes do not invalidate
  assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_initiate_payment() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/payments/initiate"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": {"paymentId": "pay_1", "paymentUrl": "https://pay.example/checkout/1"}
    })))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  let enrollment = crate::api::types::Enrollment {
    id: "e1".to_string(),
    halaka_id: "h1".to_string(),
    status: "pending_payment".to_string(),
    amount: 120.0,
    currency: "SAR".to_string(),
  };

  let session = halakat.initiate_payment(&enrollment).await.unwrap();
  assert_eq!(session.reference, "pay_1");
  assert_eq!(session.payment_url.as_deref(), Some("https://pay.example/checkout/1"));
  assert_eq!(session.status, "pending");
}

#[tokio::test]
async fn test_load_more_appends_without_caching() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .and(query_param("page", "1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": [{"id": "h1"}, {"id": "h2"}],
      "pagination": {"currentPage": 1, "totalPages": 2, "hasNext": true}
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .and(query_param("page", "2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": [{"id": "h2"}, {"id": "h3"}],
      "pagination": {"currentPage": 2, "totalPages": 2, "hasNext": false, "hasPrev": true}
    })))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat.fetch_current(2).await.unwrap();
  assert_eq!(
    halakat.load_more(2).await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );

  let ids: Vec<String> = halakat.items().into_iter().map(|h| h.id).collect();
  assert_eq!(ids, vec!["h1", "h2", "h3"]);
  assert_eq!(cache.len(), 1);
  assert_eq!(halakat.pagination().current_page, 2);

  // Last page reached
  assert_eq!(halakat.load_more(2).await.unwrap(), FetchOutcome::Skipped);
}

#[tokio::test]
async fn test_fetch_one_sets_current_and_caches() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  Mock::given(method("GET"))
    .and(path("/halakat/h1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": {"id": "h1", "title": "حفظ جزء عم", "currentStudents": 7}
    })))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  assert_eq!(
    halakat.fetch_one("h1").await.unwrap(),
    FetchOutcome::Applied(CacheSource::Network)
  );
  assert_eq!(halakat.current().unwrap().current_students, 7);
  assert_eq!(halakat.items()[0].current_students, 7);

  assert_eq!(
    halakat.fetch_one("h1").await.unwrap(),
    FetchOutcome::Applied(CacheSource::Cache)
  );
}

#[tokio::test]
async fn test_fetch_one_without_data_is_not_found() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat/missing"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": null})))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  let err = halakat.fetch_one("missing").await.unwrap_err();
  assert_eq!(err.kind(), crate::api::ErrorKind::NotFound);
  assert!(halakat.current().is_none());
  assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cancel_pending_discards_result() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(halakat_body())
        .set_delay(Duration::from_millis(300)),
    )
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  let (outcome, _) = tokio::join!(halakat.fetch_list(all_query()), async {
    tokio::time::sleep(Duration::from_millis(50)).await;
    halakat.cancel_pending();
  });

  assert_eq!(outcome.unwrap(), FetchOutcome::Superseded);
  assert!(halakat.items().is_empty());
  assert!(!halakat.is_loading());
  // Nothing was loaded, so the store is back where it started
  assert_eq!(halakat.load_state(), LoadState::Idle);
  assert!(!halakat.is_request_in_progress());
  assert!(cache.is_empty());
}

#[tokio::test]
async fn test_filtered_list_and_stats() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();

  assert_eq!(halakat.get_filtered_list().len(), 2);
  halakat.set_filter("status", "completed");
  let filtered = halakat.get_filtered_list();
  assert_eq!(filtered.len(), 1);
  assert_eq!(filtered[0].id, "h2");

  let stats = halakat.get_stats();
  assert_eq!(stats.total, 2);
  assert_eq!(stats.active, 1);
  assert_eq!(stats.enrolled_students, 3);
}

#[tokio::test]
async fn test_reset_clears_state() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();
  halakat.set_filter("status", "active");

  halakat.reset();

  let snapshot = halakat.snapshot();
  assert!(snapshot.items.is_empty());
  assert_eq!(snapshot.load, LoadState::Idle);
  assert_eq!(snapshot.filters, Filters::default());
}

#[tokio::test]
async fn test_teachers_nested_list_key() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/teachers"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": "success",
      "data": {"teachers": [{"_id": 1, "name": "أحمد", "verified": true}], "pagination": {"totalPages": 3}}
    })))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let teachers = store::<TeacherProfile>(&server, &cache);

  teachers.fetch_current(10).await.unwrap();
  assert_eq!(teachers.items()[0].id, "1");
  assert!(teachers.pagination().has_next);
  assert_eq!(teachers.get_stats().verified, 1);
}

#[tokio::test]
async fn test_invitation_respond_patches_status() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/invitations"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": [{"id": "i1", "status": "pending"}, {"id": "i2", "status": "pending"}]
    })))
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/invitations/i1/accept"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/invitations/i2/reject"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let invitations = store::<Invitation>(&server, &cache);
  invitations.fetch_current(10).await.unwrap();
  assert_eq!(invitations.pending_count(), 2);

  invitations.respond("i1", true).await.unwrap();
  invitations.respond("i2", false).await.unwrap();

  let items = invitations.items();
  assert_eq!(items[0].status, InvitationStatus::Accepted);
  assert_eq!(items[1].status, InvitationStatus::Rejected);
  assert_eq!(invitations.pending_count(), 0);
}

#[tokio::test]
async fn test_refresher_polls_and_stops() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/invitations"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "i1"}]})))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let invitations = Arc::new(store::<Invitation>(&server, &cache));

  let mut refresher = Refresher::spawn(invitations.clone(), Duration::from_millis(50), 10);
  for _ in 0..2 {
    let event = tokio::time::timeout(Duration::from_secs(2), refresher.next())
      .await
      .unwrap()
      .unwrap();
    // Every tick bypasses the cache
    assert!(matches!(event, RefreshEvent::Updated(CacheSource::Network)));
  }
  assert_eq!(invitations.items().len(), 1);

  refresher.stop();
  tokio::time::sleep(Duration::from_millis(200)).await;
  assert!(refresher.is_finished());
}

#[tokio::test]
async fn test_fetch_me_loads_current_student() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/students/me"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "data": {"_id": "s1", "fullName": "عائشة", "progress": 42.4}
    })))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let students = store::<crate::api::types::StudentProfile>(&server, &cache);

  students.fetch_me().await.unwrap();
  let me = students.current().unwrap();
  assert_eq!(me.id, "s1");
  assert_eq!(me.name, "عائشة");
  assert_eq!(me.progress, 42);
}

#[tokio::test]
async fn test_search_with_reserved_characters_gets_own_cache_entry() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .and(query_param("search", "x&status=active"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "literal"}]})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .and(query_param("search", "x"))
    .and(query_param("status", "active"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "filtered"}]})))
    .expect(1)
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  halakat
    .fetch_list(ListQuery::new([("search", "x&status=active")], 1, 10, false))
    .await
    .unwrap();
  let outcome = halakat
    .fetch_list(ListQuery::new([("search", "x"), ("status", "active")], 1, 10, false))
    .await
    .unwrap();

  assert_eq!(outcome, FetchOutcome::Applied(CacheSource::Network));
  assert_eq!(halakat.items()[0].id, "filtered");
  assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_cancelled_refetch_keeps_ready_state() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(ResponseTemplate::new(200).set_body_json(halakat_body()))
    .up_to_n_times(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({"data": []}))
        .set_delay(Duration::from_millis(300)),
    )
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();
  halakat.invalidate_cache();

  let (outcome, _) = tokio::join!(halakat.fetch_list(all_query()), async {
    tokio::time::sleep(Duration::from_millis(50)).await;
    halakat.cancel_pending();
  });

  assert_eq!(outcome.unwrap(), FetchOutcome::Superseded);
  assert_eq!(halakat.load_state(), LoadState::Ready);
  assert_eq!(halakat.items().len(), 2);
}

#[tokio::test]
async fn test_reset_during_fetch_ends_idle() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/halakat"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(halakat_body())
        .set_delay(Duration::from_millis(300)),
    )
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);

  let (outcome, _) = tokio::join!(halakat.fetch_list(all_query()), async {
    tokio::time::sleep(Duration::from_millis(50)).await;
    halakat.reset();
  });

  assert_eq!(outcome.unwrap(), FetchOutcome::Superseded);
  assert_eq!(halakat.load_state(), LoadState::Idle);
  assert!(halakat.items().is_empty());
}

#[tokio::test]
async fn test_clear_filters_resets_page_and_cache() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.set_filter("status", "completed");
  halakat.set_filter("page", 3);
  halakat.fetch_current(10).await.unwrap();
  assert_eq!(cache.len(), 1);
  assert_eq!(halakat.get_filtered_list().len(), 1);

  halakat.clear_filters();

  assert_eq!(halakat.filters(), Filters::default());
  assert_eq!(halakat.filters().page(), 1);
  assert!(cache.is_empty());
  assert_eq!(halakat.get_filtered_list().len(), 2);
}

#[tokio::test]
async fn test_patch_local_updates_list_and_current() {
  let server = MockServer::start().await;
  mount_list(&server, 1).await;
  Mock::given(method("GET"))
    .and(path("/halakat/h2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "h2"}})))
    .mount(&server)
    .await;
  let cache = Arc::new(RequestCache::new());
  let halakat = store::<Halaka>(&server, &cache);
  halakat.fetch_list(all_query()).await.unwrap();
  halakat.fetch_one("h2").await.unwrap();

  assert!(halakat.patch_local("h2", |h| h.title = "محلي".to_string()));
  assert!(!halakat.patch_local("missing", |h| h.title.clear()));

  assert_eq!(halakat.current().unwrap().title, "محلي");
  assert_eq!(halakat.items()[1].title, "محلي");
}
