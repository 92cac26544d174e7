mod users;
mod workspaces;

use crate::session::SessionManager;
use crate::users::UserStore;
use crate::workspace::WorkspaceManager;
use std::sync::{Arc, Mutex};
use warp::Filter;

pub(crate) fn routes(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
    users: Arc<UserStore>,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    users::routes(users.clone()).or(workspaces::routes(manager.clone(), sessions.clone()))
}
