//! Drives the Revalidation Engine against a real (if tiny) in-process HTTP
//! origin, exercising the hit/miss/revalidate/refetch/single-flight paths
//! end to end rather than through mocked collaborators.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use tokio::net::TcpListener;

use apt_cache_proxy::cache::CacheAdapter;
use apt_cache_proxy::classify::{self, FreshnessPolicy};
use apt_cache_proxy::engine::{RequestContext, RevalidationEngine};
use apt_cache_proxy::http_date;
use apt_cache_proxy::origin::OriginClient;

#[derive(Clone)]
struct Entry {
    body: &'static str,
    last_modified: SystemTime,
}

struct MockOrigin {
    entries: Mutex<HashMap<&'static str, Entry>>,
    gets: AtomicUsize,
    heads: AtomicUsize,
}

impl MockOrigin {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            gets: AtomicUsize::new(0),
            heads: AtomicUsize::new(0),
        })
    }

    fn set(&self, path: &'static str, body: &'static str, last_modified: SystemTime) {
        self.entries.lock().unwrap().insert(path, Entry { body, last_modified });
    }

    fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    fn respond(&self, req: &Request<Incoming>) -> Response<Full<Bytes>> {
        if req.method() == Method::GET {
            self.gets.fetch_add(1, Ordering::SeqCst);
        } else if req.method() == Method::HEAD {
            self.heads.fetch_add(1, Ordering::SeqCst);
        }

        let path = req.uri().path().to_string();
        let entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get(path.as_str()) else {
            return Response::builder().status(StatusCode::NOT_FOUND).body(Full::from(Bytes::new())).unwrap();
        };

        let client_ims = req
            .headers()
            .get(http::header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(http_date::parse);

        if let Some(ims) = client_ims {
            if ims >= entry.last_modified {
                return Response::builder()
                    .status(StatusCode::NOT_MODIFIED)
                    .header(http::header::LAST_MODIFIED, http_date::format(entry.last_modified))
                    .body(Full::from(Bytes::new()))
                    .unwrap();
            }
        }

        let body = if req.method() == Method::HEAD { Bytes::new() } else { Bytes::from_static(entry.body.as_bytes()) };

        Response::builder()
            .status(StatusCode::OK)
            .header(http::header::LAST_MODIFIED, http_date::format(entry.last_modified))
            .header(http::header::CONNECTION, "keep-alive")
            .body(Full::from(body))
            .unwrap()
    }
}

async fn spawn_mock_origin(origin: Arc<MockOrigin>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => continue,
            };
            let io = hyper_util::rt::TokioIo::new(stream);
            let origin = origin.clone();
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let origin = origin.clone();
                    async move { Ok::<_, Infallible>(origin.respond(&req)) }
                });
                let _ = http1::Builder::new().serve_connection(io, svc).await;
            });
        }
    });

    format!("http://{addr}")
}

fn engine(timeout: Duration) -> RevalidationEngine {
    let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let cache_dir = std::env::temp_dir().join(format!("apt-cache-proxy-engine-test-{}-{n}", std::process::id()));
    let cache = CacheAdapter::new(cache_dir, 10 * 1024 * 1024).unwrap();
    RevalidationEngine::new(cache, OriginClient::new(timeout))
}

fn ctx(path: &str, origin_base: &str, policy: FreshnessPolicy, if_modified_since: Option<SystemTime>) -> RequestContext {
    RequestContext {
        path: path.to_string(),
        method: Method::GET,
        if_modified_since,
        policy,
        origin_url: format!("{origin_base}{path}"),
    }
}

async fn body_text(resp: apt_cache_proxy::types::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn pool_path_miss_then_hit_never_revalidates() {
    let mock = MockOrigin::new();
    let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    mock.set("/ubuntu/pool/main/h/hello/hello.deb", "hello-deb-bytes", t1);
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = engine(Duration::from_secs(5));
    let policy = classify::classify("/ubuntu/pool/main/h/hello/hello.deb");
    assert!(!policy.use_conditional && !policy.validate_with_origin);

    let c = ctx("/ubuntu/pool/main/h/hello/hello.deb", &base, policy, None);
    let resp = engine.handle(&c).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "hello-deb-bytes");
    assert_eq!(mock.gets(), 1);

    // second request is served from cache, no origin contact at all
    let resp = engine.handle(&c).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "hello-deb-bytes");
    assert_eq!(mock.gets(), 1);
    assert_eq!(mock.heads(), 0);
}

#[tokio::test]
async fn dists_index_revalidates_and_refetches_on_change() {
    let mock = MockOrigin::new();
    let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let t2 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_100);
    let path = "/ubuntu/dists/jammy/InRelease";
    mock.set(path, "inrelease-v1", t1);
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = engine(Duration::from_secs(5));
    // the handler forces this policy for Release/InRelease routes
    let policy = FreshnessPolicy::FORCE_REVALIDATE;

    let c = ctx(path, &base, policy, None);
    let resp = engine.handle(&c).await;
    assert_eq!(body_text(resp).await, "inrelease-v1");
    assert_eq!(mock.gets(), 1);

    // unchanged content: revalidation HEAD sees 304, serves cached entry, no refetch
    let resp = engine.handle(&c).await;
    assert_eq!(body_text(resp).await, "inrelease-v1");
    assert_eq!(mock.gets(), 1);
    assert_eq!(mock.heads(), 1);

    // content changes upstream: revalidation HEAD sees 200, engine refetches
    mock.set(path, "inrelease-v2", t2);
    let resp = engine.handle(&c).await;
    assert_eq!(body_text(resp).await, "inrelease-v2");
    assert_eq!(mock.gets(), 2);
    assert_eq!(mock.heads(), 2);
}

#[tokio::test]
async fn concurrent_misses_for_the_same_path_trigger_one_origin_get() {
    let mock = MockOrigin::new();
    let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let path = "/ubuntu/dists/jammy/main/binary-amd64/Packages.gz";
    mock.set(path, "packages-bytes", t1);
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = Arc::new(engine(Duration::from_secs(5)));
    let policy = classify::classify(path);
    assert!(policy.use_conditional && policy.validate_with_origin);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let c = ctx(path, &base, policy, None);
        tasks.push(tokio::spawn(async move {
            let resp = engine.handle(&c).await;
            assert_eq!(resp.status(), StatusCode::OK);
            body_text(resp).await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), "packages-bytes");
    }

    // exactly one leader performed the origin GET; any followers that woke
    // up after population may each issue a revalidation HEAD, never a GET.
    assert_eq!(mock.gets(), 1);
}

#[tokio::test]
async fn missing_repository_path_surfaces_as_not_found_from_the_origin() {
    let mock = MockOrigin::new();
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = engine(Duration::from_secs(5));
    let c = ctx("/ubuntu/pool/main/z/zzz/zzz.deb", &base, FreshnessPolicy { use_conditional: false, validate_with_origin: false }, None);
    let resp = engine.handle(&c).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hop_by_hop_headers_from_a_stored_response_do_not_resurface_on_a_cache_hit() {
    let mock = MockOrigin::new();
    let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let path = "/ubuntu/pool/main/h/hello/hello.deb";
    mock.set(path, "hello-deb-bytes", t1);
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = engine(Duration::from_secs(5));
    let policy = classify::classify(path);
    let c = ctx(path, &base, policy, None);

    let miss_resp = engine.handle(&c).await;
    assert_eq!(miss_resp.status(), StatusCode::OK);
    assert!(miss_resp.headers().get(http::header::CONNECTION).is_none());
    drop(miss_resp);

    // a later cache hit must not resurrect a hop-by-hop header alongside the
    // freshly computed Content-Length
    let hit_resp = engine.handle(&c).await;
    assert_eq!(hit_resp.status(), StatusCode::OK);
    assert!(hit_resp.headers().get(http::header::CONNECTION).is_none());
    assert!(hit_resp.headers().get(http::header::CONTENT_LENGTH).is_some());
}

#[tokio::test]
async fn client_if_modified_since_short_circuits_to_304_without_contacting_origin() {
    let mock = MockOrigin::new();
    let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    // uses conditional If-Modified-Since handling but is not itself
    // revalidated against the origin on every hit, so a plain cache
    // population (no HEAD traffic) precedes the 304 check below.
    let path = "/ubuntu/dists/jammy/main/binary-amd64/by-hash/SHA256/abcabcabc";
    mock.set(path, "by-hash-bytes", t1);
    let base = spawn_mock_origin(mock.clone()).await;

    let engine = engine(Duration::from_secs(5));
    let policy = classify::classify(path);

    // populate the cache first
    let miss_c = ctx(path, &base, policy, None);
    let resp = engine.handle(&miss_c).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(mock.gets(), 1);

    let gets_before = mock.gets();
    let heads_before = mock.heads();

    // client already has a copy at least as fresh as the cached entry
    let ims_c = ctx(path, &base, policy, Some(t1));
    let resp = engine.handle(&ims_c).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(mock.gets(), gets_before);
    assert_eq!(mock.heads(), heads_before);
}
