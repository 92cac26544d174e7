use crate::locations::get_user_db_dir;
use crate::routes;
use crate::session::SessionManager;
use crate::users::UserStore;
use crate::workspace::{get_workspace_manager, WorkspaceManager};

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;

const DEFAULT_PORT: u16 = 3001;

pub(crate) struct Server {
    workspace_manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
    users: Arc<UserStore>,
    address: SocketAddr,
}

impl Server {
    pub(crate) async fn start(&self) {
        let listener = tokio::net::TcpListener::bind(&self.address).await.unwrap();
        let incoming = TcpListenerStream::new(listener);
        tracing::info!("Listening on {}", self.address);
        let server = warp::serve(routes::routes(
            self.workspace_manager.clone(),
            self.sessions.clone(),
            self.users.clone(),
        ))
        .serve_incoming_with_graceful_shutdown(incoming, async {
            signal::ctrl_c().await.unwrap()
        });
        server.await;
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        println!("Shutting down server...");
        self.sessions.lock().unwrap().teardown_all();
    }
}

pub(crate) fn get_server(port: Option<u16>) -> Server {
    let users = UserStore::open(get_user_db_dir().unwrap()).unwrap();
    Server {
        workspace_manager: Arc::new(Mutex::new(get_workspace_manager())),
        sessions: Arc::new(Mutex::new(SessionManager::new())),
        users: Arc::new(users),
        address: SocketAddr::from(([127, 0, 0, 1], port.unwrap_or(DEFAULT_PORT))),
    }
}
