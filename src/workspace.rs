use crate::errors::{CoderoomError, CoderoomErrorType, Result};
use crate::locations::get_workspace_db_dir;
use crate::templates;
use crate::vfs::Workspace;

use sled::Db;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Owns the workspace database and an in-memory cache of open
/// workspaces. One instance lives behind the server's shared state.
pub(crate) struct WorkspaceManager {
    db: Db,
    open: HashMap<String, Arc<Mutex<Workspace>>>,
}

pub(crate) fn get_workspace_manager() -> WorkspaceManager {
    let db_dir = get_workspace_db_dir().unwrap();
    WorkspaceManager::open(db_dir).unwrap()
}

impl WorkspaceManager {
    pub(crate) fn open(path: PathBuf) -> Result<WorkspaceManager> {
        let db = sled::open(path)?;
        Ok(WorkspaceManager {
            db,
            open: HashMap::new(),
        })
    }

    pub(crate) fn create_workspace(
        &mut self,
        name: &str,
        template: Option<&str>,
        force: bool,
    ) -> Result<Arc<Mutex<Workspace>>> {
        let seed = templates::seed_files(template).ok_or_else(|| {
            CoderoomError::new(
                CoderoomErrorType::NotFound,
                format!("No template named {}", template.unwrap_or("")),
            )
        })?;
        if self.db.contains_key(name.as_bytes())? {
            if !force {
                return Err(CoderoomError::new(
                    CoderoomErrorType::AlreadyExists,
                    format!("Workspace {} already exists", name),
                ));
            }
            self.delete_workspace(name)?;
        }
        let workspace = Workspace::new(name, seed, self.db.clone())?;
        let workspace = Arc::new(Mutex::new(workspace));
        self.open.insert(name.to_string(), workspace.clone());
        Ok(workspace)
    }

    pub(crate) fn load_workspace(&mut self, name: &str) -> Result<Arc<Mutex<Workspace>>> {
        if let Some(workspace) = self.open.get(name) {
            return Ok(workspace.clone());
        }
        let workspace = Workspace::load(name, self.db.clone())?;
        let workspace = Arc::new(Mutex::new(workspace));
        self.open.insert(name.to_string(), workspace.clone());
        Ok(workspace)
    }

    pub(crate) fn delete_workspace(&mut self, name: &str) -> Result<()> {
        self.open.remove(name);
        let previous = self.db.remove(name.as_bytes())?;
        if previous.is_none() {
            return Err(CoderoomError::new(
                CoderoomErrorType::NotFound,
                format!("Workspace {} does not exist", name),
            ));
        }
        Ok(())
    }

    pub(crate) fn list_workspaces(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.db.iter() {
            let (key, _) = entry?;
            names.push(String::from_utf8_lossy(key.as_ref()).to_string());
        }
        Ok(names)
    }
}
