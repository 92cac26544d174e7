// Starter content for new workspaces and the scaffold-command catalog
// the client offers when initializing a project inside the sandbox.

use crate::vfs::FlatFileMap;
use serde::Serialize;

const STARTER_INDEX_JS: &str = r#"console.log("Hello from the sandbox!");
const express = require('express');
const app = express();
const port = 3000;

app.get('/', (req, res) => {
  res.send('Hello World from the sandbox!');
});

app.listen(port, () => {
  console.log(`Server running at http://localhost:${port}`);
});
"#;

const STARTER_PACKAGE_JSON: &str = r#"{
  "name": "workspace-starter",
  "version": "1.0.0",
  "description": "Express starter workspace",
  "main": "index.js",
  "dependencies": {
    "express": "^4.18.2"
  }
}
"#;

pub(crate) const DEFAULT_ENTRY_POINT: &str = "index.js";

/// Seed files for a freshly created workspace.
pub(crate) fn starter_files() -> FlatFileMap {
    let mut files = FlatFileMap::new();
    files.insert("index.js".to_string(), STARTER_INDEX_JS.to_string());
    files.insert("package.json".to_string(), STARTER_PACKAGE_JSON.to_string());
    files
}

pub(crate) fn seed_files(template: Option<&str>) -> Option<FlatFileMap> {
    match template {
        None | Some("starter") => Some(starter_files()),
        Some("empty") => {
            let mut files = FlatFileMap::new();
            files.insert(
                "package.json".to_string(),
                STARTER_PACKAGE_JSON.to_string(),
            );
            Some(files)
        }
        Some(_) => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProjectTemplate {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) command: &'static str,
}

/// Scaffold commands offered to the client. These run inside the
/// sandbox, not on this server.
pub(crate) fn project_templates() -> Vec<ProjectTemplate> {
    vec![
        ProjectTemplate {
            name: "React + TypeScript",
            description: "Vite with React and TypeScript",
            command: "npm create vite@latest my-react-ts-app -- --template react-ts -y",
        },
        ProjectTemplate {
            name: "React + JavaScript",
            description: "Vite with React and JavaScript",
            command: "npm create vite@latest my-react-app -- --template react -y",
        },
        ProjectTemplate {
            name: "Vue + TypeScript",
            description: "Vite with Vue and TypeScript",
            command: "npm create vite@latest my-vue-ts-app -- --template vue-ts -y",
        },
        ProjectTemplate {
            name: "Next.js App (TypeScript)",
            description: "Next.js app router with TypeScript",
            command: "npx create-next-app@latest my-next-ts-app --ts --eslint --app",
        },
        ProjectTemplate {
            name: "Next.js App (JavaScript)",
            description: "Next.js app router with JavaScript",
            command: "npx create-next-app@latest my-next-app --eslint --app",
        },
    ]
}

/// Editor language hint for a file name, by extension.
pub(crate) fn language_from_filename(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext);
    match extension {
        Some("js") | Some("jsx") => "javascript",
        Some("ts") | Some("tsx") => "typescript",
        Some("json") => "json",
        Some("html") => "html",
        Some("css") => "css",
        Some("md") => "markdown",
        _ => "plaintext",
    }
}

/// Default content for a newly added file, by extension.
pub(crate) fn default_content(filename: &str) -> String {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "// JavaScript file\nconsole.log(\"Hello from new file!\");\n".to_string(),
        Some("ts") => {
            "// TypeScript file\nconst greeting: string = \"Hello!\";\nconsole.log(greeting);\n"
                .to_string()
        }
        Some("json") => "{\n  \"name\": \"New JSON File\"\n}\n".to_string(),
        Some("html") => {
            "<!DOCTYPE html>\n<html>\n<head>\n  <title>New HTML File</title>\n</head>\n<body>\n  <h1>Hello World</h1>\n</body>\n</html>\n"
                .to_string()
        }
        Some("css") => "/* CSS file */\nbody {\n  margin: 0;\n  padding: 0;\n}\n".to_string(),
        _ => String::new(),
    }
}
