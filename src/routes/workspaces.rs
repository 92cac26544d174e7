use crate::handlers;
use crate::session::SessionManager;
use crate::workspace::WorkspaceManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::reply::Reply;
use warp::Filter;

pub(super) fn routes(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list_templates()
        .or(list_workspaces(manager.clone()))
        .or(create_workspace(manager.clone()))
        .or(delete_workspace(manager.clone(), sessions.clone()))
        .or(get_tree(manager.clone()))
        .or(get_mount(manager.clone()))
        .or(list_folder(manager.clone()))
        .or(get_file(manager.clone()))
        .or(add_file(manager.clone()))
        .or(write_file(manager.clone()))
        .or(remove_file(manager.clone()))
        .or(add_folder(manager.clone()))
        .or(run_workspace(manager.clone(), sessions.clone()))
        .or(stop_workspace(sessions.clone()))
        .or(get_output(sessions.clone()))
}

fn list_templates() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("templates")
        .and(warp::get())
        .map(handlers::list_templates)
}

fn list_workspaces(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces")
        .and(warp::get())
        .map(move || handlers::list_workspaces(manager.clone()))
}

fn create_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String)
        .and(warp::post())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |workspace, params: HashMap<String, String>| {
            let force = match params.get("force") {
                Some(force) => force.parse::<bool>().unwrap_or(false),
                None => false,
            };
            let template = params.get("template").map(|template| template.to_owned());
            handlers::create_workspace(manager.clone(), workspace, template, force)
        })
}

fn delete_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String)
        .and(warp::delete())
        .map(move |workspace| {
            handlers::delete_workspace(manager.clone(), sessions.clone(), workspace)
        })
}

fn get_tree(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "tree")
        .and(warp::get())
        .map(move |workspace| handlers::get_tree(manager.clone(), workspace))
}

fn get_mount(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "mount")
        .and(warp::get())
        .map(move |workspace| handlers::get_mount(manager.clone(), workspace))
}

fn list_folder(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "list")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |workspace, params: HashMap<String, String>| {
            let path = match params.get("path") {
                Some(path) => path.to_owned(),
                None => String::new(),
            };
            handlers::list_folder(manager.clone(), workspace, path)
        })
}

fn get_file(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "files")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |workspace, params: HashMap<String, String>| {
            if let Some(pattern) = params.get("pattern") {
                return handlers::search_files(manager.clone(), workspace, pattern.to_owned())
                    .map(|reply| reply.into_response());
            }
            match params.get("path") {
                Some(path) => handlers::get_file(manager.clone(), workspace, path.to_owned())
                    .map(|reply| reply.into_response()),
                None => Ok(warp::reply::with_status(
                    warp::reply::json(&"Missing path argument".to_string()),
                    StatusCode::BAD_REQUEST,
                )
                .into_response()),
            }
        })
}

fn add_file(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "files")
        .and(warp::post())
        .and(warp::body::json())
        .map(move |workspace, request: handlers::AddFileRequest| {
            handlers::add_file(manager.clone(), workspace, request)
        })
}

fn write_file(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "files")
        .and(warp::put())
        .and(warp::body::json())
        .map(move |workspace, request: handlers::WriteFileRequest| {
            handlers::write_file(manager.clone(), workspace, request)
        })
}

fn remove_file(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "files")
        .and(warp::delete())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |workspace, params: HashMap<String, String>| {
            match params.get("path") {
                Some(path) => handlers::remove_file(manager.clone(), workspace, path.to_owned())
                    .map(|reply| reply.into_response()),
                None => Ok(warp::reply::with_status(
                    warp::reply::json(&"Missing path argument".to_string()),
                    StatusCode::BAD_REQUEST,
                )
                .into_response()),
            }
        })
}

fn add_folder(
    manager: Arc<Mutex<WorkspaceManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "folders")
        .and(warp::post())
        .and(warp::body::json())
        .map(move |workspace, request: handlers::AddFolderRequest| {
            handlers::add_folder(manager.clone(), workspace, request)
        })
}

fn run_workspace(
    manager: Arc<Mutex<WorkspaceManager>>,
    sessions: Arc<Mutex<SessionManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "run")
        .and(warp::post())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |workspace, params: HashMap<String, String>| {
            let entry = params.get("entry").map(|entry| entry.to_owned());
            handlers::run_workspace(manager.clone(), sessions.clone(), workspace, entry)
        })
}

fn stop_workspace(
    sessions: Arc<Mutex<SessionManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "stop")
        .and(warp::post())
        .map(move |workspace| handlers::stop_workspace(sessions.clone(), workspace))
}

fn get_output(
    sessions: Arc<Mutex<SessionManager>>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("workspaces" / String / "output")
        .and(warp::get())
        .map(move |workspace| handlers::get_output(sessions.clone(), workspace))
}
