pub mod websocket;

use std::convert::Infallible;
use std::sync::Arc;

use warp::Filter;

use crate::auth::AuthVerifier;
use crate::config::ServerConfig;
use crate::constants::WS_PATH;
use crate::core::service::FeedService;
use crate::transport::WsTransport;
use self::websocket::{handle_ws_client, JoinQuery};

/// Shared state handed to every gateway handler
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<FeedService>,
    pub transport: Arc<WsTransport>,
    pub verifier: Arc<dyn AuthVerifier>,
    pub default_room: String,
    pub history_limit: usize,
}

impl GatewayState {
    pub fn new(
        config: &ServerConfig,
        service: Arc<FeedService>,
        transport: Arc<WsTransport>,
        verifier: Arc<dyn AuthVerifier>,
    ) -> Self {
        Self {
            service,
            transport,
            verifier,
            default_room: config.default_room.clone(),
            history_limit: config.history_limit,
        }
    }
}

/// The warp routes of the gateway: the WebSocket endpoint and a health check
pub fn gateway_routes(
    state: GatewayState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ws_route = warp::path(WS_PATH)
        .and(warp::ws())
        .and(warp::query::<JoinQuery>())
        .and(with_state(state))
        .map(|ws: warp::ws::Ws, query: JoinQuery, state: GatewayState| {
            ws.on_upgrade(move |socket| handle_ws_client(socket, query, state))
        });

    let health_route = warp::path("health").map(|| "OK");

    ws_route.or(health_route)
}

fn with_state(
    state: GatewayState,
) -> impl Filter<Extract = (GatewayState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
