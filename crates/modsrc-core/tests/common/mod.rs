//! In-process stub of a module registry and archive host.

#![allow(clippy::unwrap_used, dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use modsrc_core::ResolverChain;
use modsrc_core::ResolverConfig;
use serde_json::Value;
use serde_json::json;

/// A request seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub version_header: Option<String>,
}

/// Behaviour of the stub registry.
#[derive(Debug, Clone)]
pub struct StubRegistry {
    pub listing: Value,
    pub versions_status: StatusCode,
    pub download_status: StatusCode,
    /// Value of `X-Terraform-Get`. `None` points at the stub archive route.
    pub location: Option<String>,
    pub archive: Vec<u8>,
    pub archive_delay: Duration,
    /// Streams the archive without a `Content-Length` header.
    pub chunked_archive: bool,
}

impl StubRegistry {
    /// A registry publishing one module with the given versions.
    pub fn new(versions: &[&str], archive: Vec<u8>) -> Self {
        Self {
            listing: listing(&[versions]),
            versions_status: StatusCode::OK,
            download_status: StatusCode::NO_CONTENT,
            location: None,
            archive,
            archive_delay: Duration::ZERO,
            chunked_archive: false,
        }
    }

    pub fn with_listing(mut self, listing: Value) -> Self {
        self.listing = listing;
        self
    }

    pub fn with_versions_status(mut self, status: StatusCode) -> Self {
        self.versions_status = status;
        self
    }

    pub fn with_download_status(mut self, status: StatusCode) -> Self {
        self.download_status = status;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_archive_delay(mut self, delay: Duration) -> Self {
        self.archive_delay = delay;
        self
    }

    pub fn with_chunked_archive(mut self) -> Self {
        self.chunked_archive = true;
        self
    }

    /// Starts serving on an ephemeral localhost port.
    pub fn start(self) -> RunningStub {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let location = self
            .location
            .clone()
            .unwrap_or_else(|| format!("{url}/archives/module.tar.gz"));
        let log: Arc<Mutex<Vec<Recorded>>> = Arc::default();

        let versions = {
            let log = Arc::clone(&log);
            let status = self.versions_status;
            let listing = self.listing.clone();
            move |uri: Uri, headers: HeaderMap| async move {
                record(&log, &uri, &headers);
                (status, Json(listing)).into_response()
            }
        };

        let download = {
            let log = Arc::clone(&log);
            let status = self.download_status;
            move |uri: Uri, headers: HeaderMap| async move {
                record(&log, &uri, &headers);
                download_response(status, &location)
            }
        };

        let archive = {
            let log = Arc::clone(&log);
            let body = self.archive.clone();
            let delay = self.archive_delay;
            let chunked = self.chunked_archive;
            move |uri: Uri, headers: HeaderMap| async move {
                record(&log, &uri, &headers);
                tokio::time::sleep(delay).await;
                if chunked {
                    chunked_response(body)
                } else {
                    body.into_response()
                }
            }
        };

        let app = Router::new()
            .route("/v1/modules/:namespace/:name/:provider/versions", get(versions))
            .route("/v1/modules/:namespace/:name/:provider/download", get(download.clone()))
            .route(
                "/v1/modules/:namespace/:name/:provider/:version/download",
                get(download),
            )
            .route("/archives/module.tar.gz", get(archive));

        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(async move {
            let _ = server.await;
        });

        RunningStub { url, log }
    }
}

fn record(log: &Mutex<Vec<Recorded>>, uri: &Uri, headers: &HeaderMap) {
    let version_header = headers
        .get("x-terraform-version")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    log.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        version_header,
    });
}

fn download_response(status: StatusCode, location: &str) -> Response {
    if status == StatusCode::NO_CONTENT {
        (status, [("x-terraform-get", location.to_string())]).into_response()
    } else {
        status.into_response()
    }
}

fn chunked_response(data: Vec<u8>) -> Response {
    let (mut sender, body) = Body::channel();
    tokio::spawn(async move {
        for chunk in data.chunks(64 * 1024) {
            if sender.send_data(Bytes::copy_from_slice(chunk)).await.is_err() {
                break;
            }
        }
    });
    Response::new(axum::body::boxed(body))
}

/// Builds a version listing with one module entry per slice.
pub fn listing(modules: &[&[&str]]) -> Value {
    let modules: Vec<Value> = modules
        .iter()
        .map(|versions| {
            let versions: Vec<Value> = versions.iter().map(|v| json!({ "version": v })).collect();
            json!({ "versions": versions })
        })
        .collect();
    json!({ "modules": modules })
}

/// A running stub server.
pub struct RunningStub {
    pub url: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl RunningStub {
    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn config(&self) -> ResolverConfig {
        ResolverConfig {
            registry_url: self.url.clone(),
            ..Default::default()
        }
    }

    pub fn chain(&self) -> ResolverChain {
        ResolverChain::standard(&self.config()).unwrap()
    }
}
