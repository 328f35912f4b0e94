use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use uuid::Uuid;

use selida::{
    Config, Entity, Error, ExecOptions, FindOptions, Listing, MemoryAdapter, Op, OrderBy, Repo,
    ValidationErrors, filters,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Gadget {
    id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Gadget {
    const SOURCE: &'static str = "gadgets";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.name.is_empty() {
            errors.add("name", "must not be blank");
        }
        errors
    }
}

fn gadget(name: &str, kind: &str, size: i64) -> Gadget {
    Gadget {
        id: Uuid::now_v7(),
        name: name.to_string(),
        kind: kind.to_string(),
        size,
        deleted_at: None,
    }
}

fn setup() -> Repo {
    Repo::new(Box::new(MemoryAdapter::new()))
}

async fn seed(repo: &Repo, count: i64) {
    for i in 1..=count {
        repo.create(&gadget(&format!("gadget-{i:02}"), "plain", i), ExecOptions::new())
            .await
            .unwrap();
    }
}

fn sizes(listing: &Listing<Gadget>) -> Vec<i64> {
    listing.entries().iter().map(|g| g.size).collect()
}

// ==================== Pagination scenarios ====================

#[tokio::test]
async fn empty_set_is_page_one_of_one() {
    let repo = setup();

    let listing = repo
        .find::<Gadget>(filters! {}, FindOptions::new().page(1).page_size(10))
        .await
        .unwrap();

    let meta = listing.meta().unwrap();
    assert!(listing.entries().is_empty());
    assert_eq!(meta.page, 1);
    assert_eq!(meta.page_size, 10);
    assert_eq!(meta.total_entries, 0);
    assert_eq!(meta.total_pages, 1);
}

#[tokio::test]
async fn last_page_holds_the_remainder() {
    let repo = setup();
    seed(&repo, 25).await;

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new()
                .page(3)
                .page_size(10)
                .order_by([OrderBy::asc("size")]),
        )
        .await
        .unwrap();

    let meta = listing.meta().unwrap();
    assert_eq!(sizes(&listing), [21, 22, 23, 24, 25]);
    assert_eq!(meta.page, 3);
    assert_eq!(meta.total_entries, 25);
    assert_eq!(meta.total_pages, 3);
}

#[tokio::test]
async fn out_of_range_page_clamps_to_last() {
    let repo = setup();
    seed(&repo, 25).await;

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new()
                .page(99)
                .page_size(10)
                .order_by([OrderBy::asc("size")]),
        )
        .await
        .unwrap();

    assert_eq!(sizes(&listing), [21, 22, 23, 24, 25]);
    assert_eq!(listing.meta().unwrap().page, 3);
}

#[tokio::test]
async fn offset_mode_reports_the_containing_page() {
    let repo = setup();
    seed(&repo, 12).await;

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new()
                .offset(5)
                .page_size(10)
                .order_by([OrderBy::asc("size")]),
        )
        .await
        .unwrap();

    let meta = listing.meta().unwrap();
    assert_eq!(sizes(&listing), [6, 7, 8, 9, 10, 11, 12]);
    assert_eq!(meta.page, 1);
    assert_eq!(meta.total_pages, 2);
}

#[tokio::test]
async fn invalid_page_falls_through_to_offset_clause() {
    let repo = setup();
    seed(&repo, 12).await;

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new()
                .page(0)
                .offset(5)
                .page_size(10)
                .order_by([OrderBy::asc("size")]),
        )
        .await
        .unwrap();

    assert!(listing.is_paged());
    assert_eq!(sizes(&listing), [6, 7, 8, 9, 10, 11, 12]);
}

#[tokio::test]
async fn invalid_pagination_inputs_disable_pagination() {
    let repo = setup();
    seed(&repo, 5).await;

    let listing = repo
        .find::<Gadget>(filters! {}, FindOptions::new().offset(-1).page_size(2))
        .await
        .unwrap();

    assert!(!listing.is_paged());
    assert_eq!(listing.entries().len(), 5);
}

#[tokio::test]
async fn page_size_defaults_come_from_config() {
    let repo = Repo::with_config(
        Box::new(MemoryAdapter::new()),
        Config::default().with_page_size(7),
    );
    seed(&repo, 20).await;

    let listing = repo
        .find::<Gadget>(filters! {}, FindOptions::new().page(1))
        .await
        .unwrap();

    let meta = listing.meta().unwrap();
    assert_eq!(meta.page_size, 7);
    assert_eq!(meta.total_pages, 3);
    assert_eq!(listing.entries().len(), 7);
}

#[tokio::test]
async fn identical_reads_are_idempotent() {
    let repo = setup();
    seed(&repo, 9).await;

    let options = || {
        FindOptions::new()
            .page(2)
            .page_size(4)
            .order_by([OrderBy::asc("size")])
    };

    let first = repo
        .find::<Gadget>(filters! { "kind" => "plain" }, options())
        .await
        .unwrap();
    let second = repo
        .find::<Gadget>(filters! { "kind" => "plain" }, options())
        .await
        .unwrap();

    assert_eq!(first, second);
}

// ==================== Filters, ordering, soft delete ====================

#[tokio::test]
async fn filters_narrow_the_result() {
    let repo = setup();
    repo.create(&gadget("a", "best", 1), ExecOptions::new()).await.unwrap();
    repo.create(&gadget("b", "plain", 2), ExecOptions::new()).await.unwrap();
    repo.create(&gadget("c", "best", 3), ExecOptions::new()).await.unwrap();

    let listing = repo
        .find::<Gadget>(filters! { "kind" => "best" }, FindOptions::new())
        .await
        .unwrap();

    assert_eq!(listing.entries().len(), 2);
    assert!(listing.entries().iter().all(|g| g.kind == "best"));

    let count = repo
        .count::<Gadget>(filters! { "kind" => "best" }, FindOptions::new())
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn order_override_replaces_the_default() {
    let repo = Repo::with_config(
        Box::new(MemoryAdapter::new()),
        Config::default().with_order_by([OrderBy::asc("name")]),
    );
    repo.create(&gadget("a", "best", 2), ExecOptions::new()).await.unwrap();
    repo.create(&gadget("b", "best", 1), ExecOptions::new()).await.unwrap();
    repo.create(&gadget("c", "best", 3), ExecOptions::new()).await.unwrap();

    // Default ordering applies when the caller gives none.
    let by_default = repo
        .find::<Gadget>(filters! {}, FindOptions::new())
        .await
        .unwrap();
    assert_eq!(sizes(&by_default), [2, 1, 3]);

    // An explicit order replaces the default; with a merge the name order
    // would win again.
    let by_size = repo
        .find::<Gadget>(filters! {}, FindOptions::new().order_by([OrderBy::asc("size")]))
        .await
        .unwrap();
    assert_eq!(sizes(&by_size), [1, 2, 3]);
}

#[tokio::test]
async fn exclude_deleted_is_a_strict_subset() {
    let repo = setup();
    seed(&repo, 4).await;

    let mut deleted = gadget("gone", "plain", 99);
    deleted.deleted_at = Some(Utc::now());
    repo.create(&deleted, ExecOptions::new()).await.unwrap();

    let unrestricted = repo
        .find::<Gadget>(filters! {}, FindOptions::new())
        .await
        .unwrap();
    let live = repo
        .find::<Gadget>(filters! {}, FindOptions::new().exclude_deleted())
        .await
        .unwrap();
    let gone = repo
        .find::<Gadget>(filters! {}, FindOptions::new().only_deleted())
        .await
        .unwrap();

    assert_eq!(unrestricted.entries().len(), 5);
    assert_eq!(live.entries().len(), 4);
    assert!(live.entries().iter().all(|g| g.deleted_at.is_none()));
    assert_eq!(gone.entries().len(), 1);
    assert_eq!(gone.entries()[0].name, "gone");
}

#[tokio::test]
async fn both_soft_delete_flags_match_nothing() {
    let repo = setup();
    seed(&repo, 3).await;

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new().exclude_deleted().only_deleted(),
        )
        .await
        .unwrap();

    assert!(listing.entries().is_empty());
}

#[tokio::test]
async fn pagination_counts_the_filtered_set() {
    let repo = setup();
    for i in 1..=6 {
        repo.create(&gadget(&format!("b{i}"), "best", i), ExecOptions::new())
            .await
            .unwrap();
    }
    for i in 1..=10 {
        repo.create(&gadget(&format!("p{i}"), "plain", i), ExecOptions::new())
            .await
            .unwrap();
    }

    let listing = repo
        .find::<Gadget>(
            filters! { "kind" => "best" },
            FindOptions::new().page(1).page_size(4),
        )
        .await
        .unwrap();

    let meta = listing.meta().unwrap();
    assert_eq!(meta.total_entries, 6);
    assert_eq!(meta.total_pages, 2);
    assert_eq!(listing.entries().len(), 4);
}

#[tokio::test]
async fn projection_trims_the_payload() {
    let repo = setup();
    repo.create(&gadget("keep", "best", 8), ExecOptions::new())
        .await
        .unwrap();

    let listing = repo
        .find::<Gadget>(
            filters! {},
            FindOptions::new().select(["id", "size"]),
        )
        .await
        .unwrap();

    let entry = &listing.entries()[0];
    assert_eq!(entry.size, 8);
    // Unselected fields come back at their serde defaults.
    assert_eq!(entry.name, "");
    assert_eq!(entry.kind, "");
}

// ==================== Single-record reads ====================

#[tokio::test]
async fn get_and_fetch_differ_on_absence() {
    let repo = setup();
    let stored = gadget("only", "best", 1);
    repo.create(&stored, ExecOptions::new()).await.unwrap();

    let found: Option<Gadget> = repo.get(stored.id, ExecOptions::new()).await.unwrap();
    assert_eq!(found.unwrap().name, "only");

    let missing = Uuid::now_v7();
    let absent: Option<Gadget> = repo.get(missing, ExecOptions::new()).await.unwrap();
    assert!(absent.is_none());

    let err = repo.fetch::<Gadget>(missing, ExecOptions::new()).await;
    assert!(matches!(err, Err(Error::NotFound)));
}

#[tokio::test]
async fn find_by_returns_the_first_match() {
    let repo = setup();
    repo.create(&gadget("first", "best", 1), ExecOptions::new()).await.unwrap();
    repo.create(&gadget("second", "best", 2), ExecOptions::new()).await.unwrap();

    let found: Gadget = repo
        .find_by(filters! { "kind" => "best" }, ExecOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "first");

    let none: Option<Gadget> = repo
        .find_by(filters! { "kind" => "worst" }, ExecOptions::new())
        .await
        .unwrap();
    assert!(none.is_none());
}

// ==================== Writes ====================

#[tokio::test]
async fn create_validates_input() {
    let repo = setup();
    let err = repo
        .create(&gadget("", "best", 1), ExecOptions::new())
        .await;

    match err {
        Err(Error::Validation(errors)) => {
            assert_eq!(errors.errors()[0].field, "name");
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let repo = setup();
    let stored = gadget("dup", "best", 1);
    repo.create(&stored, ExecOptions::new()).await.unwrap();

    let err = repo.create(&stored, ExecOptions::new()).await;
    assert!(matches!(err, Err(Error::Conflict)));
}

#[tokio::test]
async fn update_persists_changes() {
    let repo = setup();
    let mut stored = gadget("before", "best", 1);
    repo.create(&stored, ExecOptions::new()).await.unwrap();

    stored.name = "after".to_string();
    repo.update(&stored, ExecOptions::new()).await.unwrap();

    let found: Gadget = repo.fetch(stored.id, ExecOptions::new()).await.unwrap();
    assert_eq!(found.name, "after");
}

#[tokio::test]
async fn delete_removes_and_returns_the_row() {
    let repo = setup();
    let stored = gadget("doomed", "best", 1);
    repo.create(&stored, ExecOptions::new()).await.unwrap();

    let deleted: Gadget = repo.delete(stored.id, ExecOptions::new()).await.unwrap();
    assert_eq!(deleted.id, stored.id);

    let gone: Option<Gadget> = repo.get(stored.id, ExecOptions::new()).await.unwrap();
    assert!(gone.is_none());

    let err = repo.delete::<Gadget>(stored.id, ExecOptions::new()).await;
    assert!(matches!(err, Err(Error::NotFound)));
}

// ==================== Capabilities ====================

#[tokio::test]
async fn read_only_repo_rejects_writes() {
    let repo = Repo::with_config(
        Box::new(MemoryAdapter::new()),
        Config::default().read_only(),
    );

    let err = repo.create(&gadget("x", "best", 1), ExecOptions::new()).await;
    assert!(matches!(err, Err(Error::OperationDisabled(Op::Create))));

    let err = repo.delete::<Gadget>(Uuid::now_v7(), ExecOptions::new()).await;
    assert!(matches!(err, Err(Error::OperationDisabled(Op::Delete))));

    // Reads still work.
    let listing = repo
        .find::<Gadget>(filters! {}, FindOptions::new())
        .await
        .unwrap();
    assert!(listing.entries().is_empty());
}

#[tokio::test]
async fn excluded_operations_fail_fast() {
    let repo = Repo::with_config(
        Box::new(MemoryAdapter::new()),
        Config::default().without([Op::Stream]),
    );

    assert!(!repo.is_enabled(Op::Stream));
    let err = repo.stream::<Gadget>(filters! {}, FindOptions::new()).await;
    assert!(matches!(err, Err(Error::OperationDisabled(Op::Stream))));
}

// ==================== Streaming ====================

#[tokio::test]
async fn stream_yields_the_filtered_set_lazily() {
    let repo = setup();
    seed(&repo, 6).await;

    let mut stream = repo
        .stream::<Gadget>(
            filters! { "kind" => "plain" },
            FindOptions::new().order_by([OrderBy::asc("size")]),
        )
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Some(item) = stream.next().await {
        seen.push(item.unwrap().size);
    }
    assert_eq!(seen, [1, 2, 3, 4, 5, 6]);
}

// ==================== Option forwarding ====================

#[tokio::test]
async fn tenancy_prefix_isolates_data() {
    let repo = setup();
    repo.create(
        &gadget("a-only", "best", 1),
        ExecOptions::new().with_prefix("tenant_a"),
    )
    .await
    .unwrap();

    let seen_by_a = repo
        .find::<Gadget>(filters! {}, FindOptions::new().prefix("tenant_a"))
        .await
        .unwrap();
    let seen_by_b = repo
        .find::<Gadget>(filters! {}, FindOptions::new().prefix("tenant_b"))
        .await
        .unwrap();

    assert_eq!(seen_by_a.entries().len(), 1);
    assert!(seen_by_b.entries().is_empty());
}
