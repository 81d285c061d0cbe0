//! Proxy endpoints for the JioSaavn API.
//!
//! All routes take a single `query` parameter and return the upstream body
//! unchanged. Search and song retry through upstream cold starts; playlist,
//! album and lyrics get one attempt.

use actix_web::{get, web, HttpResponse};

use crate::error::{AppError, AppResult};
use crate::models::{AppState, ProxyQuery};
use crate::upstream::Endpoint;

/// Forward `query` to `endpoint` and relay the response.
async fn proxy(
    state: &AppState,
    endpoint: Endpoint,
    query: ProxyQuery,
) -> AppResult<HttpResponse> {
    let query = query
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::missing_query(endpoint.name()))?;

    tracing::info!(%endpoint, query = %query, "Starting upstream request");

    let response = state.upstream.fetch(endpoint, &query).await.map_err(|e| {
        tracing::error!(%endpoint, error = %e, "Error fetching from JioSaavn API");
        AppError::from_fetch(endpoint, &e)
    })?;

    tracing::info!(
        %endpoint,
        status = response.status,
        bytes = response.body.len(),
        "Upstream request successful"
    );

    let content_type = response
        .content_type
        .unwrap_or_else(|| "application/json".to_string());

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .body(response.body))
}

/// Search songs, albums and artists.
///
/// GET /api/search?query={search_term}
pub async fn search(
    data: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> AppResult<HttpResponse> {
    proxy(&data, Endpoint::Search, query.into_inner()).await
}

/// Song details, including lyrics.
///
/// GET /api/search/song?query={song_url_or_id}
#[get("/song")]
pub async fn song(
    data: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> AppResult<HttpResponse> {
    proxy(&data, Endpoint::Song, query.into_inner()).await
}

/// GET /api/search/playlist?query={playlist_url}
#[get("/playlist")]
pub async fn playlist(
    data: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> AppResult<HttpResponse> {
    proxy(&data, Endpoint::Playlist, query.into_inner()).await
}

/// GET /api/search/album?query={album_url}
#[get("/album")]
pub async fn album(
    data: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> AppResult<HttpResponse> {
    proxy(&data, Endpoint::Album, query.into_inner()).await
}

/// GET /api/search/lyrics?query={song_url_or_id}
#[get("/lyrics")]
pub async fn lyrics(
    data: web::Data<AppState>,
    query: web::Query<ProxyQuery>,
) -> AppResult<HttpResponse> {
    proxy(&data, Endpoint::Lyrics, query.into_inner()).await
}

/// Reject unparsable query strings with the usual error body.
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest {
            message: "Invalid query string".to_string(),
            details: Some(err.to_string()),
        }
        .into()
    })
}

/// Configure search routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/search")
            .app_data(query_config())
            .route("", web::get().to(search))
            .route("/", web::get().to(search))
            .service(song)
            .service(playlist)
            .service(album)
            .service(lyrics),
    );
}
