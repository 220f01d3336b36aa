//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

use marketplace_web::config::{profiles, AppConfig, CacheBackend, ObjectStoreConfig};
use marketplace_web::storage::{CacheSettings, CacheStore, ObjectStore};
use marketplace_web::App;

/// Development profile with no external services.
pub fn offline_config() -> AppConfig {
    let mut config = profiles::development();
    config.cache.backend = CacheBackend::Null;
    config
}

/// Build an app around `config` with a disabled cache and no object store.
pub fn offline_app(config: AppConfig) -> App {
    App::new(
        Arc::new(config),
        Arc::new(CacheStore::disabled()),
        Arc::new(ObjectStore::unavailable(ObjectStoreConfig::default())),
    )
}

/// Build an app whose cache store is connected to `redis_url`.
pub async fn app_with_cache(mut config: AppConfig, redis_url: &str) -> App {
    config.cache.backend = CacheBackend::Redis;
    config.redis.url = redis_url.to_string();
    let cache = CacheStore::initialize(CacheSettings::from_config(&config)).await;
    App::new(
        Arc::new(config),
        Arc::new(cache),
        Arc::new(ObjectStore::unavailable(ObjectStoreConfig::default())),
    )
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub async fn get(router: Router, uri: &str) -> TestResponse {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

/// Redis URL on which nothing listens.
pub fn unreachable_redis_url() -> String {
    "redis://127.0.0.1:1/0".to_string()
}

// --- Mock Redis ---

#[derive(Default)]
struct Keyspace {
    values: HashMap<String, (String, Option<Instant>)>,
}

impl Keyspace {
    fn live(&mut self, key: &str) -> Option<&mut (String, Option<Instant>)> {
        let expired = matches!(self.values.get(key), Some((_, Some(deadline))) if *deadline <= Instant::now());
        if expired {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }
}

/// Handle to a running mock Redis server.
#[derive(Clone)]
pub struct MockRedis {
    pub addr: SocketAddr,
    keyspace: Arc<Mutex<Keyspace>>,
}

impl MockRedis {
    pub fn url(&self) -> String {
        format!("redis://{}/0", self.addr)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keyspace.lock().unwrap().values.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.keyspace.lock().unwrap().live(key).map(|(v, _)| v.clone())
    }

    /// Write a raw value, optionally with an expiry.
    pub fn seed(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.keyspace
            .lock()
            .unwrap()
            .values
            .insert(key.to_string(), (value.to_string(), deadline));
    }

    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.keyspace
            .lock()
            .unwrap()
            .live(key)
            .and_then(|(_, deadline)| *deadline)
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Start an in-memory server speaking enough RESP for the cache store:
/// PING, GET, SET, SETEX, DEL, EXPIRE, TTL, INCR/INCRBY and MULTI/EXEC.
/// Everything else is an error.
pub async fn start_mock_redis() -> MockRedis {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let keyspace = Arc::new(Mutex::new(Keyspace::default()));

    let shared = keyspace.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let keyspace = shared.clone();
                    tokio::spawn(async move {
                        let _ = serve_resp(socket, keyspace).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockRedis { addr, keyspace }
}

async fn serve_resp(socket: TcpStream, keyspace: Arc<Mutex<Keyspace>>) -> std::io::Result<()> {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    let mut queued: Option<Vec<Vec<String>>> = None;

    while let Some(args) = read_command(&mut reader).await? {
        let command = args.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
        let reply = match command.as_str() {
            "MULTI" if queued.is_none() => {
                queued = Some(Vec::new());
                "+OK\r\n".to_string()
            }
            "EXEC" if queued.is_some() => {
                let commands = queued.take().unwrap_or_default();
                let mut reply = format!("*{}\r\n", commands.len());
                for queued_args in &commands {
                    reply.push_str(&execute(queued_args, &keyspace));
                }
                reply
            }
            _ => match queued.as_mut() {
                Some(commands) => {
                    commands.push(args);
                    "+QUEUED\r\n".to_string()
                }
                None => execute(&args, &keyspace),
            },
        };
        write.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

async fn read_command(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> std::io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count: usize = line.trim_end().trim_start_matches('*').parse().unwrap_or(0);

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len: usize = line.trim_end().trim_start_matches('$').parse().unwrap_or(0);
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn bulk(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

fn execute(args: &[String], keyspace: &Mutex<Keyspace>) -> String {
    let mut ks = keyspace.lock().unwrap();
    let command = args.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let deadline = |secs: &str| secs.parse::<u64>().ok().map(|s| Instant::now() + Duration::from_secs(s));

    match command.as_str() {
        "PING" => "+PONG\r\n".to_string(),
        "GET" => match ks.live(&arg(1)) {
            Some((value, _)) => bulk(value),
            None => "$-1\r\n".to_string(),
        },
        "SET" => {
            let expiry = match args.get(3).map(|a| a.to_ascii_uppercase()) {
                Some(flag) if flag == "EX" => deadline(&arg(4)),
                _ => None,
            };
            ks.values.insert(arg(1), (arg(2), expiry));
            "+OK\r\n".to_string()
        }
        "SETEX" => {
            ks.values.insert(arg(1), (arg(3), deadline(&arg(2))));
            "+OK\r\n".to_string()
        }
        "DEL" => {
            let removed = args[1..]
                .iter()
                .filter(|key| ks.live(key).is_some() && ks.values.remove(*key).is_some())
                .count();
            format!(":{removed}\r\n")
        }
        "EXPIRE" => match ks.live(&arg(1)) {
            Some(entry) => {
                entry.1 = deadline(&arg(2));
                ":1\r\n".to_string()
            }
            None => ":0\r\n".to_string(),
        },
        "TTL" => match ks.live(&arg(1)) {
            Some((_, Some(deadline))) => {
                let left = deadline.saturating_duration_since(Instant::now());
                format!(":{}\r\n", (left.as_millis() + 500) / 1000)
            }
            Some((_, None)) => ":-1\r\n".to_string(),
            None => ":-2\r\n".to_string(),
        },
        "INCR" | "INCRBY" => {
            let delta: i64 = if command == "INCR" { 1 } else { arg(2).parse().unwrap_or(1) };
            let key = arg(1);
            let current = ks.live(&key).map(|(v, d)| (v.parse::<i64>().unwrap_or(0), *d));
            let (count, expiry) = match current {
                Some((value, expiry)) => (value + delta, expiry),
                None => (delta, None),
            };
            ks.values.insert(key, (count.to_string(), expiry));
            format!(":{count}\r\n")
        }
        _ => format!("-ERR unknown command '{}'\r\n", command),
    }
}
