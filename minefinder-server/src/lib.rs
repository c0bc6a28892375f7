use std::sync::Arc;
use warp::Filter;

use crate::session_directory::SharedDirectory;
use crate::websocket::{ConnectionManager, RateLimitSettings};

pub mod config;
pub mod match_coordinator;
pub mod session_directory;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    directory: SharedDirectory,
    rate_limits: RateLimitSettings,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let directory_filter = warp::any().map({
        let directory = directory.clone();
        move || directory.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(directory_filter.clone())
        .map(move |ws: warp::ws::Ws, conn_mgr, directory| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, directory, rate_limits)
            })
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let rooms = warp::path("rooms")
        .and(warp::path::end())
        .and(warp::get())
        .and(directory_filter)
        .and_then(handle_rooms_request);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(rooms)
        .with(cors)
        .with(warp::log("minefinder"))
}

async fn handle_rooms_request(
    directory: SharedDirectory,
) -> Result<impl warp::Reply, warp::Rejection> {
    let summaries = directory.lock().await.room_summaries();
    Ok(warp::reply::json(&summaries))
}
