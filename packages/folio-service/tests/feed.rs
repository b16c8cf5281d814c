use std::sync::Arc;

use serde_json::json;

use folio_domain::{EntityKind, FilterContext, category, identity};
use folio_service::{DeleteOutcome, Error, Feed, FeedOptions, LoadStatus};
use folio_testkit::{FakeBackend, Reply, appointment, note, page, record};

const DAY: &str = "2024-05-02";

fn id(source_id: &str) -> u64 {
	identity::derive_id(source_id).expect("Source id must not be blank.")
}

fn notes_feed(backend: &Arc<FakeBackend>) -> Feed {
	Feed::new(backend.clone(), FeedOptions::new(EntityKind::Note), FilterContext::for_customer("k-100"))
}

fn two_notes() -> serde_json::Value {
	json!([
		note("a1", "Notizen", "Rückruf vereinbart", "2024-05-02T09:00:00Z"),
		note("b2", "Notizen", "Scan hochgeladen", "2024-05-02T11:00:00Z"),
	])
}

async fn loaded_feed(backend: &Arc<FakeBackend>) -> Feed {
	let feed = notes_feed(backend);

	backend.push_page(page(two_notes(), 1, true));
	feed.load_next_page().await.expect("Initial load failed.");

	feed
}

#[tokio::test]
async fn duplicate_page_fetch_does_not_grow_the_partition() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;

	backend.push_page(page(two_notes(), 1, false));

	let outcome = feed.load_next_page().await.expect("Second load failed.");

	assert_eq!(outcome.items_added, 0);
	assert_eq!(outcome.status, LoadStatus::Applied);
	assert_eq!(feed.items_for(DAY, category::NOTES).len(), 2);
}

#[tokio::test]
async fn notes_without_system_text_are_not_shown() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	backend.push_page(page(json!([note("c3", "Notizen", "", "2024-05-02T09:00:00Z")]), 1, false));

	let outcome = feed.load_next_page().await.expect("Load failed.");

	assert_eq!(outcome.items_added, 0);
	assert!(feed.partition_keys().is_empty());
}

#[tokio::test]
async fn backend_categories_are_remapped_for_display_and_requests() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	feed.set_filter(FilterContext::for_customer("k-100").with_category(category::EMAILS));
	backend.push_page(page(
		json!([note("d4", "Emails", "Rechnung per E-Mail versendet", "2024-05-02T08:00:00Z")]),
		1,
		false,
	));
	feed.load_next_page().await.expect("Load failed.");

	let emails = feed.items_for(DAY, category::EMAILS);

	assert_eq!(emails.len(), 1);
	assert_eq!(emails[0].category, "E-mails");
	assert!(feed.items_for(DAY, "Emails").is_empty());
	assert_eq!(backend.fetches()[0].category.as_deref(), Some("Emails"));
}

#[tokio::test]
async fn stale_generation_is_discarded() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);
	let gate = backend.push_gated_page(page(two_notes(), 1, true));
	let before = feed.snapshot();
	let (outcome, ()) = tokio::join!(feed.load_next_page(), async {
		assert!(feed.set_filter(FilterContext::for_customer("k-100").with_search("Scan")));

		gate.open();
	});

	assert_eq!(outcome.expect("Stale load must not fail.").status, LoadStatus::Stale);
	assert_eq!(feed.snapshot(), before);
	assert!(feed.has_more());
	assert!(!feed.is_loading_more());
}

#[tokio::test]
async fn newer_generation_wins_even_when_older_resolves_last() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);
	let gate = backend.push_gated_page(page(two_notes(), 1, true));

	backend.push_page(page(
		json!([note("e5", "Termin", "Termin bestätigt", "2024-05-03T10:00:00Z")]),
		1,
		false,
	));

	let (stale, fresh) = tokio::join!(feed.load_next_page(), async {
		feed.set_filter(FilterContext::for_customer("k-100").with_category(category::APPOINTMENTS));

		let fresh = feed.load_next_page().await;

		gate.open();

		fresh
	});

	assert_eq!(stale.expect("stale").status, LoadStatus::Stale);
	assert_eq!(fresh.expect("fresh").items_added, 1);
	assert_eq!(feed.partition_keys(), vec!["2024-05-03".to_string()]);
	assert!(!feed.has_more());
}

#[tokio::test]
async fn fetch_failure_keeps_data_and_cursor() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let before = feed.snapshot();

	backend.push_fetch_failure("connection reset");

	let err = feed.load_next_page().await.expect_err("Load should fail.");

	assert!(matches!(err, Error::TransientFetch { .. }));
	assert_eq!(feed.snapshot(), before);
	assert!(!feed.is_loading_more());

	backend.push_page(page(json!([]), 2, false));
	feed.load_next_page().await.expect("Retry failed.");

	let pages: Vec<u32> = backend.fetches().iter().map(|req| req.page).collect();

	assert_eq!(pages, vec![1, 2, 2]);
	assert!(!feed.has_more());
}

#[tokio::test]
async fn last_page_stops_further_requests() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	backend.push_page(page(two_notes(), 1, false));
	feed.load_next_page().await.expect("Load failed.");

	let outcome = feed.load_next_page().await.expect("Skipped load must not fail.");

	assert_eq!(outcome.status, LoadStatus::Skipped);
	assert_eq!(backend.fetches().len(), 1);
}

#[tokio::test]
async fn concurrent_load_for_same_filter_is_skipped() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);
	let gate = backend.push_gated_page(page(two_notes(), 1, true));
	let (first, second) = tokio::join!(feed.load_next_page(), async {
		let second = feed.load_next_page().await;

		gate.open();

		second
	});

	assert_eq!(first.expect("first").items_added, 2);
	assert_eq!(second.expect("second").status, LoadStatus::Skipped);
	assert_eq!(backend.fetches().len(), 1);
}

#[tokio::test]
async fn failed_delete_restores_the_exact_state() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let before = feed.snapshot();

	backend.push_delete(Reply::Fail("500 Internal Server Error".to_string()));

	let err = feed.delete_item(DAY, id("a1")).await.expect_err("Delete should fail.");

	assert!(matches!(err, Error::MutationFailed { .. }));
	assert_eq!(feed.snapshot(), before);
	assert_eq!(backend.deletes(), vec!["a1".to_string()]);
}

#[tokio::test]
async fn delete_is_optimistic_and_exclusive_per_item() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let gate = backend.push_gated_delete(Reply::Ok(()));
	let (outcome, ()) = tokio::join!(feed.delete_item(DAY, id("a1")), async {
		assert!(!feed.snapshot().contains(DAY, id("a1")));

		let err = feed.delete_item(DAY, id("a1")).await.expect_err("Overlapping delete must fail.");

		assert!(matches!(err, Error::MutationRejected { .. }));

		gate.open();
	});

	assert_eq!(outcome.expect("Delete failed."), DeleteOutcome::Deleted);
	assert_eq!(backend.deletes().len(), 1);
	assert_eq!(feed.items_for(DAY, category::NOTES).len(), 1);
}

#[tokio::test]
async fn system_categories_cannot_be_deleted() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	backend.push_page(page(
		json!([note("f6", "Zahlungen", "Zahlung eingegangen", "2024-05-02T12:00:00Z")]),
		1,
		false,
	));
	feed.load_next_page().await.expect("Load failed.");

	let before = feed.snapshot();
	let err = feed.delete_item(DAY, id("f6")).await.expect_err("Delete must be rejected.");

	assert!(matches!(err, Error::MutationRejected { .. }));
	assert_eq!(feed.snapshot(), before);
	assert!(backend.deletes().is_empty());
}

#[tokio::test]
async fn already_deleted_records_count_as_success() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;

	backend.push_delete(Reply::NotFound);

	assert_eq!(feed.delete_item(DAY, id("b2")).await.expect("delete"), DeleteOutcome::AlreadyGone);
	assert!(!feed.snapshot().contains(DAY, id("b2")));
}

#[tokio::test]
async fn deleting_the_last_item_prunes_its_partition() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;

	feed.delete_item(DAY, id("a1")).await.expect("delete a1");
	feed.delete_item(DAY, id("b2")).await.expect("delete b2");

	assert!(feed.partition_keys().is_empty());
	assert!(feed.snapshot().is_empty());
}

#[tokio::test]
async fn local_items_are_deleted_without_a_request() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);
	let item = feed
		.add_local(category::NOTES, "Entwurf", time::macros::datetime!(2024-05-04 9:00 UTC))
		.expect("add_local");

	assert!(item.is_local());
	assert_eq!(
		feed.delete_item(&item.partition_key, item.id).await.expect("delete"),
		DeleteOutcome::Local
	);
	assert!(backend.deletes().is_empty());
	assert!(feed.partition_keys().is_empty());
}

#[tokio::test]
async fn added_note_is_replaced_by_the_stored_record() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	backend.push_create(Reply::Ok(record(note(
		"9c0ffee1-0000-4000-8000-000000000001",
		"Notizen",
		"Notiz angelegt",
		"2024-05-05T14:00:00Z",
	))));

	let stored = feed.add_note("Einlagen nachmessen").await.expect("add_note").expect("shown");
	let snapshot = feed.snapshot();

	assert_eq!(stored.source_id.as_deref(), Some("9c0ffee1-0000-4000-8000-000000000001"));
	assert_eq!(snapshot.len(), 1);
	assert!(snapshot.contains("2024-05-05", stored.id));
	assert_eq!(backend.creates(), vec![("k-100".to_string(), "Einlagen nachmessen".to_string())]);
}

#[tokio::test]
async fn failed_note_creation_removes_the_placeholder() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let before = feed.snapshot();

	backend.push_create(Reply::Fail("timeout".to_string()));

	let err = feed.add_note("Einlagen nachmessen").await.expect_err("Creation should fail.");

	assert!(matches!(err, Error::MutationFailed { .. }));
	assert_eq!(feed.snapshot(), before);
}

#[tokio::test]
async fn appointments_are_ordered_by_time_of_day() {
	let backend = Arc::new(FakeBackend::new());
	let feed = Feed::new(
		backend.clone(),
		FeedOptions::new(EntityKind::Appointment),
		FilterContext::for_customer("k-100"),
	);

	backend.push_page(page(
		json!([
			appointment("a1", "2024-05-06", "3:00 pm", "Anprobe"),
			appointment("b2", "2024-05-06", "bogus", "Rückfrage"),
		]),
		1,
		true,
	));
	backend.push_page(page(json!([appointment("c3", "2024-05-06", "09:15", "Abdruck")]), 2, false));
	feed.load_next_page().await.expect("page 1");
	feed.load_next_page().await.expect("page 2");

	let times: Vec<String> = feed
		.items_for("2024-05-06", category::APPOINTMENTS)
		.into_iter()
		.filter_map(|item| item.time_of_day)
		.collect();

	assert_eq!(times, vec!["09:15", "3:00 pm", "bogus"]);
}

#[tokio::test]
async fn observers_see_every_applied_change() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);
	let mut updates = feed.subscribe();

	backend.push_page(page(two_notes(), 1, false));
	feed.load_next_page().await.expect("Load failed.");

	assert!(updates.has_changed().expect("Sender alive."));

	updates.mark_unchanged();
	feed.delete_item(DAY, id("a1")).await.expect("delete");

	assert!(updates.has_changed().expect("Sender alive."));
}

#[tokio::test]
async fn page_loaded_during_a_delete_does_not_bring_the_item_back() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let gate = backend.push_gated_delete(Reply::Ok(()));

	backend.push_page(page(two_notes(), 2, false));

	let (outcome, ()) = tokio::join!(feed.delete_item(DAY, id("a1")), async {
		let loaded = feed.load_next_page().await.expect("Load failed.");

		assert_eq!(loaded.items_added, 0);
		assert!(!feed.snapshot().contains(DAY, id("a1")));

		gate.open();
	});

	assert_eq!(outcome.expect("Delete failed."), DeleteOutcome::Deleted);
	assert!(!feed.snapshot().contains(DAY, id("a1")));
	assert!(feed.snapshot().contains(DAY, id("b2")));
}

#[tokio::test]
async fn failed_delete_is_restored_across_a_filter_change() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let before = feed.snapshot();
	let gate = backend.push_gated_delete(Reply::Fail("502 Bad Gateway".to_string()));
	let (outcome, ()) = tokio::join!(feed.delete_item(DAY, id("a1")), async {
		assert!(feed.set_filter(FilterContext::for_customer("k-100").with_category(category::NOTES)));

		gate.open();
	});

	assert!(matches!(outcome, Err(Error::MutationFailed { .. })));

	backend.push_fetch_failure("connection reset");

	assert!(feed.load_next_page().await.is_err());
	assert_eq!(feed.snapshot(), before);
}

#[tokio::test]
async fn failed_delete_after_a_rebuild_keeps_the_server_copy() {
	let backend = Arc::new(FakeBackend::new());
	let feed = loaded_feed(&backend).await;
	let gate = backend.push_gated_delete(Reply::Fail("502 Bad Gateway".to_string()));

	backend.push_page(page(two_notes(), 1, false));

	let (outcome, ()) = tokio::join!(feed.delete_item(DAY, id("a1")), async {
		feed.refresh().await.expect("Refresh failed.");

		assert!(!feed.snapshot().contains(DAY, id("a1")));

		gate.open();
	});

	assert!(matches!(outcome, Err(Error::MutationFailed { .. })));
	assert!(feed.snapshot().contains(DAY, id("a1")));
	assert_eq!(feed.snapshot().len(), 2);
}

#[tokio::test]
async fn records_with_a_shared_id_prefix_are_both_shown() {
	let backend = Arc::new(FakeBackend::new());
	let feed = notes_feed(&backend);

	backend.push_page(page(
		json!([
			note("665f1a2b3c4d5e6f70000001", "Bestellungen", "Bestellung angelegt", "2024-05-02T09:00:00Z"),
			note("665f1a2b3c4d5e6f70000002", "Zahlungen", "Zahlung eingegangen", "2024-05-02T09:00:00Z"),
		]),
		1,
		false,
	));

	let outcome = feed.load_next_page().await.expect("Load failed.");

	assert_eq!(outcome.items_added, 2);
	assert_eq!(feed.snapshot().len(), 2);
}
