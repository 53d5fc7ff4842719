//! HTTP plumbing shared by the network resolvers.

use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;

use crate::QuotaResource;
use crate::ResolveContext;
use crate::ResolveError;
use crate::ResolverConfig;
use crate::Result;

/// Builds the client owned by a resolver chain.
pub(crate) fn build_client(config: &ResolverConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.http_timeout)
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|err| ResolveError::from_reqwest(&config.registry_url, err))
}

/// Sends a request under the context.
pub(crate) async fn send(
    ctx: &ResolveContext,
    url: &str,
    request: RequestBuilder,
) -> Result<Response> {
    ctx.run(request.send())
        .await?
        .map_err(|err| ResolveError::from_reqwest(url, err))
}

/// Reads a whole response body under the context.
pub(crate) async fn read_body(
    ctx: &ResolveContext,
    url: &str,
    response: Response,
) -> Result<Vec<u8>> {
    let bytes = ctx
        .run(response.bytes())
        .await?
        .map_err(|err| ResolveError::from_reqwest(url, err))?;
    Ok(bytes.to_vec())
}

/// Reads a response body under the context, failing as soon as it is known
/// to exceed `max_bytes`.
///
/// A declared `Content-Length` over the limit fails before any body is read.
/// Otherwise the body is pulled chunk by chunk and the running total is
/// checked after each chunk.
pub(crate) async fn read_body_limited(
    ctx: &ResolveContext,
    url: &str,
    mut response: Response,
    max_bytes: u64,
) -> Result<Vec<u8>> {
    if let Some(declared) = response.content_length().filter(|&len| len > max_bytes) {
        return Err(body_too_large(declared, max_bytes));
    }

    let mut body = Vec::new();
    let mut total: u64 = 0;
    while let Some(chunk) = ctx
        .run(response.chunk())
        .await?
        .map_err(|err| ResolveError::from_reqwest(url, err))?
    {
        total = u64::try_from(chunk.len())
            .ok()
            .and_then(|len| total.checked_add(len))
            .ok_or(ResolveError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
        if total > max_bytes {
            return Err(body_too_large(total, max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn body_too_large(current: u64, max: u64) -> ResolveError {
    ResolveError::QuotaExceeded {
        resource: QuotaResource::TotalSize { current, max },
    }
}

/// Fails with a status error unless the response status equals `expected`.
pub(crate) fn expect_status(
    url: &str,
    response: &Response,
    expected: reqwest::StatusCode,
) -> Result<()> {
    if response.status() == expected {
        Ok(())
    } else {
        Err(ResolveError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}
