use std::sync::Arc;

use warp::Filter;

use crate::session::SessionEngine;
use crate::websocket::ConnectionManager;

pub mod config;
pub mod gateway;
pub mod room_store;
pub mod session;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    engine: Arc<SessionEngine>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let engine_filter = warp::any().map({
        let engine = engine.clone();
        move || engine.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .and(engine_filter.clone())
        .map(|ws: warp::ws::Ws, conn_mgr, engine| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, engine))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Read-only room snapshot - never reveals the answer
    let room_state = warp::path!("room" / String / "state")
        .and(warp::get())
        .and(engine_filter.clone())
        .and_then(handle_room_state_request);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(room_state)
        .with(cors)
        .with(warp::log("atlas_arena"))
}

async fn handle_room_state_request(
    code: String,
    engine: Arc<SessionEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // Room codes are always 6 ASCII digits; anything else is malformed
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Invalid room code format"
            })),
            warp::http::StatusCode::BAD_REQUEST,
        ));
    }

    match engine.room_snapshot(&code).await {
        Some(snapshot) => Ok(warp::reply::with_status(
            warp::reply::json(&snapshot),
            warp::http::StatusCode::OK,
        )),
        None => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Room not found"
            })),
            warp::http::StatusCode::NOT_FOUND,
        )),
    }
}
