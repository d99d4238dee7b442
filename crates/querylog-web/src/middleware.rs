//! Request-scoped capture middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, header::AsHeaderName, HeaderMap, Uri},
    middleware::{self as axum_middleware, Next},
    response::Response,
    Router,
};
use querylog_core::{scope, Identity, QueryLog, RequestContext, UnitOfWork};
use std::net::SocketAddr;
use tracing::{debug, error};

/// Wrap `router` with [`capture_queries`] when the query log is enabled.
pub fn with_query_log<S>(router: Router<S>, log: Option<QueryLog>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match log {
        Some(log) => router.layer(axum_middleware::from_fn_with_state(log, capture_queries)),
        None => router,
    }
}

/// Open a unit of work for the request, run the inner service inside it and
/// flush the batch before returning the response.
///
/// The identity is resolved at teardown. Auth that runs inside this layer
/// (a `route_layer` or the handler) can call [`scope::identify`] or put an
/// [`Identity`] in the response extensions; an [`Identity`] already in the
/// request extensions is the fallback.
///
/// Flush failures are logged and never alter the response.
pub async fn capture_queries(State(log): State<QueryLog>, req: Request, next: Next) -> Response {
    let mut ctx = request_context(&req);
    let (response, uow) = scope::run(log.begin(), next.run(req)).await;
    if let Some(identity) = response.extensions().get::<Identity>() {
        ctx.authenticated_user = Some(identity.clone());
    }
    if let Some(uow) = uow {
        flush(uow, ctx).await;
    }
    response
}

async fn flush(uow: UnitOfWork, ctx: RequestContext) {
    let label = format!("{} {}", ctx.method, ctx.url);
    match tokio::task::spawn_blocking(move || uow.finish(&ctx)).await {
        Ok(Ok(Some(path))) => debug!("Query log for {} written to {}", label, path.display()),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => error!("Failed to write query log for {}: {}", label, e),
        Err(e) => error!("Query log flush for {} did not complete: {}", label, e),
    }
}

/// Collect the unit-of-work metadata for `req`.
///
/// The identity is whatever [`Identity`] an outer auth layer stored in the
/// request extensions so far.
pub fn request_context(req: &Request) -> RequestContext {
    let headers = req.headers();

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .or_else(|| first_hop(headers, "x-forwarded-for").map(str::to_string));

    RequestContext {
        url: full_url(req.uri(), headers),
        method: req.method().as_str().to_string(),
        client_ip,
        user_agent: header_str(headers, header::USER_AGENT).map(str::to_string),
        authenticated_user: req.extensions().get::<Identity>().cloned(),
    }
}

fn full_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.scheme().is_some() {
        return uri.to_string();
    }
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match header_str(headers, header::HOST) {
        Some(host) => {
            let scheme = first_hop(headers, "x-forwarded-proto").unwrap_or("http");
            format!("{scheme}://{host}{path}")
        }
        None => path.to_string(),
    }
}

fn header_str<K: AsHeaderName>(headers: &HeaderMap, key: K) -> Option<&str> {
    headers.get(key)?.to_str().ok()
}

fn first_hop<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    header_str(headers, key)?
        .split(',')
        .map(str::trim)
        .find(|hop| !hop.is_empty())
}
