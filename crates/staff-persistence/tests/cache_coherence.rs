//! Cache-coherence behaviour of `EmployeeService` against in-memory backends.

use async_trait::async_trait;
use fake::Fake;
use fake::faker::name::en::Name;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use staff_domain::{Employee, EmployeeAttributes, EmployeeId, RequestContext};
use staff_persistence::cache::keys;
use staff_persistence::{
    CacheStore, CacheTtl, EmployeeRepository, EmployeeService, InMemoryEmployeeRepository,
    MemoryCache, PersistenceError, Result, ServiceError, ServiceOptions, WriteStrategy,
};

// =============================================================================
// TEST DOUBLES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum CacheOp {
    Get(String),
    Generation(String),
    Set(String),
    Delete(Vec<String>),
}

/// Memory cache that records every call and can be told to fail
#[derive(Default)]
struct RecordingCache {
    inner: MemoryCache,
    ops: Mutex<Vec<CacheOp>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl RecordingCache {
    fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().unwrap().clone()
    }

    fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    fn record(&self, op: CacheOp) {
        self.ops.lock().unwrap().push(op);
    }
}

fn redis_down() -> PersistenceError {
    PersistenceError::Redis("connection refused".into())
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.record(CacheOp::Get(key.to_string()));
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(redis_down());
        }
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.record(CacheOp::Set(key.to_string()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(redis_down());
        }
        self.inner.set_ex(key, value, ttl).await
    }

    async fn set_ex_if_current(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        seen: u64,
    ) -> Result<bool> {
        self.record(CacheOp::Set(key.to_string()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(redis_down());
        }
        self.inner.set_ex_if_current(key, value, ttl, seen).await
    }

    async fn generation(&self, key: &str) -> Result<u64> {
        self.record(CacheOp::Generation(key.to_string()));
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(redis_down());
        }
        self.inner.generation(key).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        self.record(CacheOp::Delete(keys.to_vec()));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(redis_down());
        }
        self.inner.delete_many(keys).await
    }
}

/// In-memory repository that counts calls and can be told to fail
#[derive(Default)]
struct CountingRepository {
    inner: InMemoryEmployeeRepository,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingRepository {
    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PersistenceError::Postgres("connection reset by peer".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EmployeeRepository for CountingRepository {
    async fn create(&self, attrs: &EmployeeAttributes) -> Result<Employee> {
        self.check()?;
        self.inner.create(attrs).await
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.list().await
    }

    async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get_by_id(id).await
    }

    async fn update(&self, id: EmployeeId, attrs: &EmployeeAttributes) -> Result<Option<Employee>> {
        self.check()?;
        self.inner.update(id, attrs).await
    }

    async fn delete(&self, id: EmployeeId) -> Result<Option<Employee>> {
        self.check()?;
        self.inner.delete(id).await
    }
}

/// Repository whose next armed read pauses after loading its rows until released
#[derive(Default)]
struct PausingRepository {
    inner: InMemoryEmployeeRepository,
    armed: AtomicBool,
    loaded: Notify,
    release: Notify,
}

impl PausingRepository {
    async fn pause_if_armed(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.loaded.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl EmployeeRepository for PausingRepository {
    async fn create(&self, attrs: &EmployeeAttributes) -> Result<Employee> {
        self.inner.create(attrs).await
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let rows = self.inner.list().await?;
        self.pause_if_armed().await;
        Ok(rows)
    }

    async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        let row = self.inner.get_by_id(id).await?;
        self.pause_if_armed().await;
        Ok(row)
    }

    async fn update(&self, id: EmployeeId, attrs: &EmployeeAttributes) -> Result<Option<Employee>> {
        self.inner.update(id, attrs).await
    }

    async fn delete(&self, id: EmployeeId) -> Result<Option<Employee>> {
        self.inner.delete(id).await
    }
}

struct Harness {
    service: EmployeeService,
    repo: Arc<CountingRepository>,
    cache: Arc<RecordingCache>,
    ctx: RequestContext,
}

fn harness_with(options: ServiceOptions) -> Harness {
    let repo = Arc::new(CountingRepository::default());
    let cache = Arc::new(RecordingCache::default());
    let service = EmployeeService::with_options(repo.clone(), cache.clone(), options);
    Harness {
        service,
        repo,
        cache,
        ctx: RequestContext::new("test-request"),
    }
}

fn harness() -> Harness {
    harness_with(ServiceOptions::default())
}

fn ada() -> EmployeeAttributes {
    EmployeeAttributes::new("Ada Lovelace", "Engineer")
}

// =============================================================================
// ROUND TRIPS
// =============================================================================

#[tokio::test]
async fn created_employee_reads_back_identically() {
    let h = harness();
    for _ in 0..5 {
        let name: String = Name().fake();
        let created = h
            .service
            .create(&h.ctx, EmployeeAttributes::new(name, "Analyst"))
            .await
            .unwrap();

        // First read from the store, second from the cache
        assert_eq!(h.service.get_by_id(&h.ctx, created.id).await.unwrap(), created);
        assert_eq!(h.service.get_by_id(&h.ctx, created.id).await.unwrap(), created);
    }
    assert_eq!(h.repo.get_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn list_is_served_from_cache_on_second_call() {
    let h = harness();
    h.service.create(&h.ctx, ada()).await.unwrap();
    h.service
        .create(&h.ctx, EmployeeAttributes::new("Grace Hopper", "Rear Admiral"))
        .await
        .unwrap();

    let first = h.service.list(&h.ctx).await.unwrap();
    let second = h.service.list(&h.ctx).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(h.repo.list_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// INVALIDATION
// =============================================================================

#[tokio::test]
async fn update_is_visible_through_a_warm_cache() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();

    // Warm both key families with the pre-update value
    h.service.get_by_id(&h.ctx, created.id).await.unwrap();
    h.service.list(&h.ctx).await.unwrap();

    let updated = h
        .service
        .update(
            &h.ctx,
            created.id,
            EmployeeAttributes::new("Ada Lovelace", "Principal Engineer"),
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Principal Engineer");

    assert_eq!(h.service.get_by_id(&h.ctx, created.id).await.unwrap(), updated);
    assert_eq!(h.service.list(&h.ctx).await.unwrap(), vec![updated]);
}

#[tokio::test]
async fn delete_removes_record_from_every_view() {
    let h = harness();
    let keep = h.service.create(&h.ctx, ada()).await.unwrap();
    let gone = h
        .service
        .create(&h.ctx, EmployeeAttributes::new("Charles Babbage", "Inventor"))
        .await
        .unwrap();

    h.service.get_by_id(&h.ctx, gone.id).await.unwrap();
    h.service.list(&h.ctx).await.unwrap();

    let deleted = h.service.delete(&h.ctx, gone.id).await.unwrap();
    assert_eq!(deleted, gone);

    assert!(matches!(
        h.service.get_by_id(&h.ctx, gone.id).await,
        Err(ServiceError::NotFound { id }) if id == gone.id
    ));
    assert_eq!(h.service.list(&h.ctx).await.unwrap(), vec![keep]);
}

#[tokio::test]
async fn create_invalidates_collection_snapshot() {
    let h = harness();
    h.service.create(&h.ctx, ada()).await.unwrap();
    assert_eq!(h.service.list(&h.ctx).await.unwrap().len(), 1);

    h.cache.clear_ops();
    let second = h
        .service
        .create(&h.ctx, EmployeeAttributes::new("Grace Hopper", "Rear Admiral"))
        .await
        .unwrap();

    assert_eq!(h.cache.ops(), vec![CacheOp::Delete(keys::write_scope(second.id))]);
    assert_eq!(h.service.list(&h.ctx).await.unwrap().len(), 2);
}

#[tokio::test]
async fn writes_invalidate_exactly_their_scope() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();

    h.cache.clear_ops();
    h.service.update(&h.ctx, created.id, ada()).await.unwrap();
    assert_eq!(
        h.cache.ops(),
        vec![CacheOp::Delete(vec![
            "employees:all".to_string(),
            format!("employee:id:{}", created.id),
        ])]
    );

    h.cache.clear_ops();
    h.service.delete(&h.ctx, created.id).await.unwrap();
    assert_eq!(h.cache.ops(), vec![CacheOp::Delete(keys::write_scope(created.id))]);
}

#[tokio::test]
async fn not_found_writes_perform_no_cache_operations() {
    let h = harness();
    h.service.list(&h.ctx).await.unwrap();
    h.cache.clear_ops();

    assert!(matches!(
        h.service.update(&h.ctx, 42, ada()).await,
        Err(ServiceError::NotFound { id: 42 })
    ));
    assert!(matches!(
        h.service.delete(&h.ctx, 42).await,
        Err(ServiceError::NotFound { id: 42 })
    ));

    assert!(h.cache.ops().is_empty());
}

#[tokio::test]
async fn concurrent_updates_converge_to_store_state() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();
    h.service.get_by_id(&h.ctx, created.id).await.unwrap();

    let a = h.service.clone();
    let b = h.service.clone();
    let ctx_a = RequestContext::new("writer-a");
    let ctx_b = RequestContext::new("writer-b");
    let id = created.id;

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move {
            a.update(&ctx_a, id, EmployeeAttributes::new("Ada Lovelace", "Architect"))
                .await
        }),
        tokio::spawn(async move {
            b.update(&ctx_b, id, EmployeeAttributes::new("Ada Lovelace", "Director"))
                .await
        }),
    );
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    let stored = h.repo.inner.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(h.service.get_by_id(&h.ctx, id).await.unwrap(), stored);
    assert_eq!(h.service.list(&h.ctx).await.unwrap(), vec![stored]);
}

#[tokio::test]
async fn read_overtaken_by_update_does_not_cache_old_row() {
    let repo = Arc::new(PausingRepository::default());
    let service = EmployeeService::new(repo.clone(), Arc::new(MemoryCache::new()));
    let ctx = RequestContext::new("writer");
    let created = service.create(&ctx, ada()).await.unwrap();

    repo.armed.store(true, Ordering::SeqCst);
    let reader = {
        let service = service.clone();
        let id = created.id;
        tokio::spawn(async move { service.get_by_id(&RequestContext::new("reader"), id).await })
    };
    repo.loaded.notified().await;

    let updated = service
        .update(
            &ctx,
            created.id,
            EmployeeAttributes::new("Ada Lovelace", "Principal Engineer"),
        )
        .await
        .unwrap();
    repo.release.notify_one();

    // The slow reader still answers with the row it loaded
    assert_eq!(reader.await.unwrap().unwrap().title, "Engineer");
    assert_eq!(service.get_by_id(&ctx, created.id).await.unwrap(), updated);
    assert_eq!(service.get_by_id(&ctx, created.id).await.unwrap().title, "Principal Engineer");
}

#[tokio::test]
async fn list_overtaken_by_delete_does_not_cache_old_collection() {
    let repo = Arc::new(PausingRepository::default());
    let service = EmployeeService::new(repo.clone(), Arc::new(MemoryCache::new()));
    let ctx = RequestContext::new("writer");
    let keep = service.create(&ctx, ada()).await.unwrap();
    let gone = service
        .create(&ctx, EmployeeAttributes::new("Charles Babbage", "Inventor"))
        .await
        .unwrap();

    repo.armed.store(true, Ordering::SeqCst);
    let reader = {
        let service = service.clone();
        tokio::spawn(async move { service.list(&RequestContext::new("reader")).await })
    };
    repo.loaded.notified().await;

    service.delete(&ctx, gone.id).await.unwrap();
    repo.release.notify_one();

    assert_eq!(reader.await.unwrap().unwrap().len(), 2);
    assert_eq!(service.list(&ctx).await.unwrap(), vec![keep]);
}

#[tokio::test]
async fn uncontended_read_still_populates() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();
    h.cache.clear_ops();

    h.service.get_by_id(&h.ctx, created.id).await.unwrap();

    let key = keys::employee(created.id);
    assert_eq!(
        h.cache.ops(),
        vec![
            CacheOp::Get(key.clone()),
            CacheOp::Generation(key.clone()),
            CacheOp::Set(key.clone()),
        ]
    );
    assert!(h.cache.inner.contains(&key));
}

// =============================================================================
// FAILURE SEMANTICS
// =============================================================================

#[tokio::test]
async fn store_failure_leaves_cache_untouched() {
    let h = harness();
    h.repo.fail.store(true, Ordering::SeqCst);

    let err = h.service.create(&h.ctx, ada()).await.unwrap_err();

    assert!(matches!(err, ServiceError::Store(PersistenceError::Postgres(_))));
    assert!(err.is_fault());
    assert!(h.cache.ops().is_empty());
}

#[tokio::test]
async fn store_failure_on_read_propagates() {
    let h = harness();
    h.repo.fail.store(true, Ordering::SeqCst);

    assert!(matches!(h.service.list(&h.ctx).await, Err(ServiceError::Store(_))));
    assert!(!h.cache.ops().iter().any(|op| matches!(op, CacheOp::Set(_))));
}

#[tokio::test]
async fn cache_outage_does_not_fail_reads() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();

    h.cache.fail_reads.store(true, Ordering::SeqCst);
    h.cache.fail_writes.store(true, Ordering::SeqCst);

    assert_eq!(h.service.get_by_id(&h.ctx, created.id).await.unwrap(), created);
    assert_eq!(h.service.list(&h.ctx).await.unwrap(), vec![created]);
}

#[tokio::test]
async fn invalidation_failure_fails_write_by_default() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();
    h.cache.fail_deletes.store(true, Ordering::SeqCst);

    let err = h
        .service
        .update(&h.ctx, created.id, EmployeeAttributes::new("Ada Lovelace", "CTO"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::CacheInvalidation(_)));
    // The store write itself happened before the invalidation attempt
    let stored = h.repo.inner.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "CTO");
}

#[tokio::test]
async fn lenient_policy_tolerates_invalidation_failure() {
    let h = harness_with(ServiceOptions {
        write_strategy: WriteStrategy::WriteAroundLenient,
        ..ServiceOptions::default()
    });
    let created = h.service.create(&h.ctx, ada()).await.unwrap();
    h.cache.fail_deletes.store(true, Ordering::SeqCst);

    let updated = h
        .service
        .update(&h.ctx, created.id, EmployeeAttributes::new("Ada Lovelace", "CTO"))
        .await
        .unwrap();
    assert_eq!(updated.title, "CTO");
}

#[tokio::test]
async fn undecodable_snapshot_is_treated_as_miss() {
    let h = harness();
    let created = h.service.create(&h.ctx, ada()).await.unwrap();
    h.cache
        .inner
        .set_ex(&keys::employee(created.id), "not json".into(), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(h.service.get_by_id(&h.ctx, created.id).await.unwrap(), created);
    assert_eq!(h.repo.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_snapshot_is_refetched() {
    let h = harness_with(ServiceOptions {
        ttl: CacheTtl::uniform(Duration::from_millis(20)),
        ..ServiceOptions::default()
    });
    h.service.create(&h.ctx, ada()).await.unwrap();

    h.service.list(&h.ctx).await.unwrap();
    h.service.list(&h.ctx).await.unwrap();
    assert_eq!(h.repo.list_calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.service.list(&h.ctx).await.unwrap();
    assert_eq!(h.repo.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn slow_cache_is_bounded_by_call_timeout() {
    struct StallingCache;

    #[async_trait]
    impl CacheStore for StallingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
        async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            Ok(())
        }
        async fn set_ex_if_current(
            &self,
            _key: &str,
            _value: String,
            _ttl: Duration,
            _seen: u64,
        ) -> Result<bool> {
            Ok(true)
        }
        async fn generation(&self, _key: &str) -> Result<u64> {
            Ok(0)
        }
        async fn delete_many(&self, _keys: &[String]) -> Result<u64> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(0)
        }
    }

    let repo = Arc::new(InMemoryEmployeeRepository::new());
    let service = EmployeeService::with_options(
        repo,
        Arc::new(StallingCache),
        ServiceOptions {
            call_timeout: Duration::from_millis(20),
            ..ServiceOptions::default()
        },
    );
    let ctx = RequestContext::new("slow");

    // Reads degrade to the store
    assert!(service.list(&ctx).await.unwrap().is_empty());

    // Writes surface the stalled invalidation as a timeout
    let err = service.create(&ctx, ada()).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::CacheInvalidation(PersistenceError::Timeout { timeout_ms: 20 })
    ));
}
