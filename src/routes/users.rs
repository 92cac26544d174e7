use crate::handlers;
use crate::users::UserStore;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use warp::ws::{Message, WebSocket};
use warp::Filter;

pub(super) fn routes(
    users: Arc<UserStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    hello()
        .or(get_version())
        .or(signup(users.clone()))
        .or(websocket(users.clone()))
}

fn hello() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path::end().and(warp::get()).map(handlers::hello)
}

fn get_version() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("version")
        .and(warp::get())
        .map(handlers::get_version)
}

fn signup(
    users: Arc<UserStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("signup")
        .and(warp::post())
        .and(warp::body::json())
        .map(move |request: handlers::SignupRequest| handlers::signup(users.clone(), request))
}

fn websocket(
    users: Arc<UserStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("ws")
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let users = users.clone();
            ws.on_upgrade(move |socket| client_connected(socket, users))
        })
}

/// Each raw socket gets a freshly minted guest account before the
/// greeting goes out.
async fn client_connected(socket: WebSocket, users: Arc<UserStore>) {
    match users.create_random() {
        Ok(user) => tracing::info!("Websocket client connected as {}", user.username),
        Err(e) => {
            tracing::error!("Could not create a guest user: {}", e);
            return;
        }
    }
    let (mut tx, mut rx) = socket.split();
    if tx
        .send(Message::text("Connected to the server"))
        .await
        .is_err()
    {
        return;
    }
    // Drain until the client hangs up
    while let Some(message) = rx.next().await {
        if message.is_err() {
            break;
        }
    }
    tracing::info!("Websocket client disconnected");
}
