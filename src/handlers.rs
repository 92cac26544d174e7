use crate::ftree::{self, Navigator, TreeNode};
use crate::mount;
use crate::session::SessionManager;
use crate::templates;
use crate::users::UserStore;
use crate::workspace::WorkspaceManager;
use warp::reply::Reply;

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tracing::instrument;
use warp::http::StatusCode;

#[instrument(name = "handlers.hello", level = "info")]
pub(crate) fn hello() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_status(
        warp::reply::json(&"Hello from coderoom server!".to_string()),
        StatusCode::OK,
    ))
}

#[instrument(name = "handlers.get_version", level = "info")]
pub(crate) fn get_version() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_status(
        warp::reply::json(&env!("CARGO_PKG_VERSION").to_string()),
        StatusCode::OK,
    ))
}

#[derive(Deserialize)]
pub(crate) struct SignupRequest {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    message: String,
    user: crate::users::User,
}

#[instrument(name = "handlers.signup", level = "info", skip(users, request), fields(username = %request.username))]
pub(crate) fn signup(
    users: Arc<UserStore>,
    request: SignupRequest,
) -> Result<impl warp::Reply, Infallible> {
    let user = users.signup(&request.username, &request.email, &request.password);
    match user {
        Ok(user) => {
            tracing::info!("User {} signed up", user.username);
            Ok(warp::reply::with_status(
                warp::reply::json(&SignupResponse {
                    message: "Signup successful".to_string(),
                    user,
                }),
                StatusCode::CREATED,
            )
            .into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(name = "handlers.list_templates", level = "info")]
pub(crate) fn list_templates() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&templates::project_templates()))
}

#[instrument(name = "handlers.list_workspaces", level = "info", skip(manager))]
pub(crate) fn list_workspaces(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> Result<impl warp::Reply, Infallible> {
    let names = manager.lock().unwrap().list_workspaces();
    match names {
        Ok(names) => Ok(warp::reply::json(&names).into_response()),
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.create_workspace",
    level = "info",
    skip(manager),
    fields(
        workspace = %workspace,
        template = ?template,
        force = %force
    )
)]
pub(crate) fn create_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    template: Option<String>,
    force: bool,
) -> Result<impl warp::Reply, Infallible> {
    let result =
        manager
            .lock()
            .unwrap()
            .create_workspace(&workspace, template.as_deref(), force);
    match result {
        Ok(_) => Ok(warp::reply::with_status(
            warp::reply::json(&format!("Workspace {workspace} created")),
            StatusCode::CREATED,
        )
        .into_response()),
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.delete_workspace",
    level = "info",
    skip(manager, sessions),
    fields(workspace = %workspace)
)]
pub(crate) fn delete_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
    workspace: String,
) -> Result<impl warp::Reply, Infallible> {
    sessions.lock().unwrap().teardown(&workspace);
    let result = manager.lock().unwrap().delete_workspace(&workspace);
    match result {
        Ok(_) => {
            tracing::info!("Workspace {workspace} deleted");
            Ok(warp::reply::with_status(
                warp::reply::json(&format!("Workspace {workspace} deleted")),
                StatusCode::OK,
            )
            .into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.get_tree",
    level = "info",
    skip(manager),
    fields(workspace = %workspace)
)]
pub(crate) fn get_tree(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let loaded = loaded.lock().unwrap();
            let tree = ftree::derive_tree(loaded.files());
            Ok(warp::reply::json(&tree).into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.get_mount",
    level = "info",
    skip(manager),
    fields(workspace = %workspace)
)]
pub(crate) fn get_mount(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let loaded = loaded.lock().unwrap();
            let descriptor = mount::build_mount(loaded.files());
            Ok(warp::reply::json(&descriptor).into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Serialize)]
struct FolderListing {
    path: String,
    breadcrumbs: Vec<ftree::Breadcrumb>,
    children: Vec<TreeNode>,
}

#[instrument(
    name = "handlers.list_folder",
    level = "info",
    skip(manager),
    fields(workspace = %workspace, path = %path)
)]
pub(crate) fn list_folder(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    path: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let loaded = loaded.lock().unwrap();
            let tree = ftree::derive_tree(loaded.files());
            let mut navigator = Navigator::new();
            navigator.navigate_into(&path);
            // A missing folder renders empty rather than erroring
            let children = ftree::children_of(&tree, navigator.current()).to_vec();
            Ok(warp::reply::json(&FolderListing {
                path: navigator.current().to_string(),
                breadcrumbs: navigator.breadcrumbs(),
                children,
            })
            .into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Serialize)]
struct FileResponse {
    path: String,
    content: String,
    language: &'static str,
}

#[instrument(
    name = "handlers.get_file",
    level = "info",
    skip(manager),
    fields(workspace = %workspace, path = %path)
)]
pub(crate) fn get_file(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    path: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let loaded = loaded.lock().unwrap();
            let content = loaded.get_file(&path);
            match content {
                Ok(content) => Ok(warp::reply::json(&FileResponse {
                    content: content.to_string(),
                    language: templates::language_from_filename(&path),
                    path,
                })
                .into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.search_files",
    level = "info",
    skip(manager),
    fields(workspace = %workspace, pattern = %pattern)
)]
pub(crate) fn search_files(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    pattern: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let loaded = loaded.lock().unwrap();
            match loaded.files_matching(&pattern) {
                Ok(matches) => Ok(warp::reply::json(&matches).into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Deserialize)]
pub(crate) struct AddFileRequest {
    pub(crate) path: String,
    pub(crate) content: Option<String>,
}

#[instrument(
    name = "handlers.add_file",
    level = "info",
    skip(manager, request),
    fields(workspace = %workspace, path = %request.path)
)]
pub(crate) fn add_file(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    request: AddFileRequest,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let result = loaded
                .lock()
                .unwrap()
                .add_file(&request.path, request.content);
            match result {
                Ok(_) => Ok(warp::reply::with_status(
                    warp::reply::json(&format!(
                        "File {} added to workspace {workspace}",
                        request.path
                    )),
                    StatusCode::CREATED,
                )
                .into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Deserialize)]
pub(crate) struct WriteFileRequest {
    pub(crate) path: String,
    pub(crate) content: String,
}

#[instrument(
    name = "handlers.write_file",
    level = "info",
    skip(manager, request),
    fields(workspace = %workspace, path = %request.path)
)]
pub(crate) fn write_file(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    request: WriteFileRequest,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let result = loaded
                .lock()
                .unwrap()
                .write_file(&request.path, request.content);
            match result {
                Ok(_) => Ok(warp::reply::with_status(
                    warp::reply::json(&format!("File {} updated", request.path)),
                    StatusCode::OK,
                )
                .into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Deserialize)]
pub(crate) struct AddFolderRequest {
    pub(crate) path: String,
}

#[instrument(
    name = "handlers.add_folder",
    level = "info",
    skip(manager, request),
    fields(workspace = %workspace, path = %request.path)
)]
pub(crate) fn add_folder(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    request: AddFolderRequest,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let result = loaded.lock().unwrap().add_folder(&request.path);
            match result {
                Ok(_) => Ok(warp::reply::with_status(
                    warp::reply::json(&format!(
                        "Folder {} added to workspace {workspace}",
                        request.path
                    )),
                    StatusCode::CREATED,
                )
                .into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[derive(Serialize)]
struct RemoveResponse {
    message: String,
    removed: Vec<String>,
}

/// An empty removal list means the delete was refused because the
/// target is the last file in the workspace.
fn removal_message(path: &str, workspace: &str, removed: &[String]) -> String {
    if removed.is_empty() {
        format!("`{}` was kept: workspace {} must retain at least one file", path, workspace)
    } else {
        format!("Removed {} from workspace {}", path, workspace)
    }
}

#[instrument(
    name = "handlers.remove_file",
    level = "info",
    skip(manager),
    fields(workspace = %workspace, path = %path)
)]
pub(crate) fn remove_file(
    manager: Arc<Mutex<WorkspaceManager>>,
    workspace: String,
    path: String,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    match loaded {
        Ok(loaded) => {
            let result = loaded.lock().unwrap().remove_file(&path);
            match result {
                Ok(removed) => Ok(warp::reply::with_status(
                    warp::reply::json(&RemoveResponse {
                        message: removal_message(&path, &workspace, &removed),
                        removed,
                    }),
                    StatusCode::OK,
                )
                .into_response()),
                Err(e) => Ok(e.into_response()),
            }
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.run_workspace",
    level = "info",
    skip(manager, sessions),
    fields(workspace = %workspace, entry = ?entry)
)]
pub(crate) fn run_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
    workspace: String,
    entry: Option<String>,
) -> Result<impl warp::Reply, Infallible> {
    let loaded = manager.lock().unwrap().load_workspace(&workspace);
    let descriptor = match loaded {
        Ok(loaded) => mount::build_mount(loaded.lock().unwrap().files()),
        Err(e) => return Ok(e.into_response()),
    };
    let entry = entry.unwrap_or_else(|| templates::DEFAULT_ENTRY_POINT.to_string());
    let mut sessions = sessions.lock().unwrap();
    match sessions.session_for(&workspace) {
        Ok(session) => {
            session.run(descriptor, &entry);
            tracing::info!("Run started for workspace {workspace} with entry {entry}");
            Ok(warp::reply::with_status(
                warp::reply::json(&format!("Run started with entry point {entry}")),
                StatusCode::ACCEPTED,
            )
            .into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.stop_workspace",
    level = "info",
    skip(sessions),
    fields(workspace = %workspace)
)]
pub(crate) fn stop_workspace(
    sessions: Arc<Mutex<SessionManager>>,
    workspace: String,
) -> Result<impl warp::Reply, Infallible> {
    let mut sessions = sessions.lock().unwrap();
    match sessions.session_for(&workspace) {
        Ok(session) => {
            session.stop();
            Ok(warp::reply::with_status(
                warp::reply::json(&format!("Workspace {workspace} stopped")),
                StatusCode::OK,
            )
            .into_response())
        }
        Err(e) => Ok(e.into_response()),
    }
}

#[instrument(
    name = "handlers.get_output",
    level = "info",
    skip(sessions),
    fields(workspace = %workspace)
)]
pub(crate) fn get_output(
    sessions: Arc<Mutex<SessionManager>>,
    workspace: String,
) -> Result<impl warp::Reply, Infallible> {
    let sessions = sessions.lock().unwrap();
    let output = match sessions.get(&workspace) {
        Some(session) => session.output(),
        None => Vec::new(),
    };
    Ok(warp::reply::json(&output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_message_reflects_a_refusal() {
        let refused = removal_message("only.js", "room", &[]);
        assert!(refused.contains("was kept"));
        let removed = vec!["b.js".to_string(), "src/.placeholder".to_string()];
        let done = removal_message("b.js", "room", &removed);
        assert!(done.contains("Removed b.js"));
    }
}
