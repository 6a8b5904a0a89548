//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the playlist-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the playlist-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "playlist-dl REST API",
        version = "0.1.0",
        description = "Download catalog playlists as zip archives: submit a playlist, poll its job, retrieve the archive once"
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Playlist jobs
        crate::api::routes::submit_playlist,
        crate::api::routes::get_status,
        crate::api::routes::retrieve_archive,
        crate::api::routes::event_stream,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::Status,
        crate::types::JobSnapshot,
        crate::types::SubmitResponse,
        crate::types::Capabilities,
        crate::types::Event,

        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Playlist jobs - Submit, poll, retrieve and follow events"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the bearer token scheme used by the `/download` routes
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .description(Some("Catalog (Spotify) access token"))
                        .build(),
                ),
            );
        }
    }
}
