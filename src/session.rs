// Run sessions. Each workspace gets an explicitly owned session with
// create-on-demand and teardown-on-drop lifecycle; nothing about a run
// lives in module state. The runtime trait is the seam to the sandbox:
// the session only mounts, spawns, and kills through it.

use crate::errors::{CoderoomError, CoderoomErrorType, Result};
use crate::mount::{flatten_mount, MountDescriptor};

use std::collections::{HashMap, VecDeque};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

const MAX_OUTPUT_LINES: usize = 1000;

/// Bounded, shareable console log for one session.
#[derive(Clone)]
pub(crate) struct OutputLog {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl OutputLog {
    fn new() -> OutputLog {
        OutputLog {
            lines: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub(crate) fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() == MAX_OUTPUT_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap().iter().cloned().collect()
    }
}

pub(crate) trait SandboxProcess: Send {
    fn kill(&mut self);
}

pub(crate) trait SandboxRuntime: Send {
    fn mount(&mut self, descriptor: &MountDescriptor) -> Result<()>;

    /// Run a command to completion, streaming its output. Returns the
    /// exit code.
    fn run_to_completion(
        &mut self,
        command: &str,
        args: &[String],
        output: &OutputLog,
    ) -> Result<i32>;

    /// Spawn a long-running command and hand back its handle.
    fn spawn(
        &mut self,
        command: &str,
        args: &[String],
        output: &OutputLog,
    ) -> Result<Box<dyn SandboxProcess>>;
}

pub(crate) struct SandboxSession {
    workspace_name: String,
    runtime: Arc<Mutex<Box<dyn SandboxRuntime>>>,
    server_process: Arc<Mutex<Option<Box<dyn SandboxProcess>>>>,
    output: OutputLog,
    worker: Option<JoinHandle<()>>,
}

impl SandboxSession {
    pub(crate) fn new(workspace_name: &str, runtime: Box<dyn SandboxRuntime>) -> SandboxSession {
        SandboxSession {
            workspace_name: workspace_name.to_string(),
            runtime: Arc::new(Mutex::new(runtime)),
            server_process: Arc::new(Mutex::new(None)),
            output: OutputLog::new(),
            worker: None,
        }
    }

    /// Mount the workspace, install dependencies, then start the entry
    /// point. Any previously running server process is killed first.
    /// The sequence runs on a worker thread; progress lands in the
    /// session output.
    pub(crate) fn run(&mut self, descriptor: MountDescriptor, entry_point: &str) {
        let runtime = self.runtime.clone();
        let server_process = self.server_process.clone();
        let output = self.output.clone();
        let entry_point = entry_point.to_string();
        let workspace_name = self.workspace_name.clone();
        self.worker = Some(std::thread::spawn(move || {
            let mut runtime = runtime.lock().unwrap();
            // The runtime lock serializes runs, so a process spawned by
            // an earlier run is registered by the time we hold it. Kill
            // here, not before the spawn of the thread, or a run racing
            // a still-installing one leaks the older server.
            if let Some(mut process) = server_process.lock().unwrap().take() {
                process.kill();
                output.push("Previous server process stopped".to_string());
            }
            output.push("Mounting workspace files".to_string());
            if let Err(e) = runtime.mount(&descriptor) {
                tracing::error!("Mount failed for workspace {}: {}", workspace_name, e);
                output.push(format!("Mount failed: {}", e.message));
                return;
            }
            output.push("Installing dependencies...".to_string());
            match runtime.run_to_completion("npm", &["install".to_string()], &output) {
                Ok(0) => output.push("Dependencies installed".to_string()),
                Ok(code) => {
                    output.push(format!("Install failed with exit code {}", code));
                    return;
                }
                Err(e) => {
                    tracing::error!("Install failed for workspace {}: {}", workspace_name, e);
                    output.push(format!("Install failed: {}", e.message));
                    return;
                }
            }
            output.push(format!("Starting server with entry point: {}", entry_point));
            match runtime.spawn("node", &[entry_point], &output) {
                Ok(process) => {
                    *server_process.lock().unwrap() = Some(process);
                }
                Err(e) => {
                    tracing::error!("Start failed for workspace {}: {}", workspace_name, e);
                    output.push(format!("Start failed: {}", e.message));
                }
            }
        }));
    }

    /// Kill the running server process, if any.
    pub(crate) fn stop(&mut self) {
        if let Some(mut process) = self.server_process.lock().unwrap().take() {
            process.kill();
            self.output.push("Server process stopped".to_string());
        }
    }

    pub(crate) fn output(&self) -> Vec<String> {
        self.output.snapshot()
    }

    /// Block until the current run sequence has finished.
    pub(crate) fn wait_idle(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SandboxSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sessions keyed by workspace name, created on demand and dropped
/// (killing their processes) when the workspace goes away.
pub(crate) struct SessionManager {
    sessions: HashMap<String, SandboxSession>,
}

impl SessionManager {
    pub(crate) fn new() -> SessionManager {
        SessionManager {
            sessions: HashMap::new(),
        }
    }

    pub(crate) fn session_for(&mut self, workspace_name: &str) -> Result<&mut SandboxSession> {
        if !self.sessions.contains_key(workspace_name) {
            let root = crate::locations::get_session_dir(workspace_name)?;
            let session =
                SandboxSession::new(workspace_name, Box::new(ShellRuntime::new(root)));
            self.sessions.insert(workspace_name.to_string(), session);
        }
        Ok(self.sessions.get_mut(workspace_name).unwrap())
    }

    pub(crate) fn get(&self, workspace_name: &str) -> Option<&SandboxSession> {
        self.sessions.get(workspace_name)
    }

    pub(crate) fn teardown(&mut self, workspace_name: &str) {
        // Dropping the session kills its process
        self.sessions.remove(workspace_name);
    }

    pub(crate) fn teardown_all(&mut self) {
        self.sessions.clear();
    }
}

/// Process-backed runtime: materializes the mount under a scratch
/// directory and runs commands there.
pub(crate) struct ShellRuntime {
    root: PathBuf,
}

impl ShellRuntime {
    pub(crate) fn new(root: PathBuf) -> ShellRuntime {
        ShellRuntime { root }
    }
}

struct ShellProcess {
    child: std::process::Child,
}

impl SandboxProcess for ShellProcess {
    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl SandboxRuntime for ShellRuntime {
    fn mount(&mut self, descriptor: &MountDescriptor) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(&self.root)?;
        for (path, contents) in flatten_mount(descriptor) {
            let full_path = self.root.join(&path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full_path, contents)?;
        }
        Ok(())
    }

    fn run_to_completion(
        &mut self,
        command: &str,
        args: &[String],
        output: &OutputLog,
    ) -> Result<i32> {
        let result = std::process::Command::new(command)
            .args(args)
            .current_dir(&self.root)
            .output()?;
        for line in result.stdout.as_slice().lines().chain(result.stderr.as_slice().lines()) {
            output.push(line?);
        }
        Ok(result.status.code().unwrap_or(-1))
    }

    fn spawn(
        &mut self,
        command: &str,
        args: &[String],
        output: &OutputLog,
    ) -> Result<Box<dyn SandboxProcess>> {
        let mut child = std::process::Command::new(command)
            .args(args)
            .current_dir(&self.root)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CoderoomError::new(
                CoderoomErrorType::InternalError,
                "Spawned process has no stdout".to_string(),
            )
        })?;
        let stderr = child.stderr.take();
        let stdout_log = output.clone();
        std::thread::spawn(move || {
            for line in std::io::BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => stdout_log.push(line),
                    Err(_) => break,
                }
            }
        });
        if let Some(stderr) = stderr {
            let stderr_log = output.clone();
            std::thread::spawn(move || {
                for line in std::io::BufReader::new(stderr).lines() {
                    match line {
                        Ok(line) => stderr_log.push(line),
                        Err(_) => break,
                    }
                }
            });
        }
        Ok(Box::new(ShellProcess { child }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::build_mount;
    use crate::vfs::FlatFileMap;

    #[derive(Clone)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new() -> Recorder {
            Recorder {
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn record(&self, event: &str) {
            self.events.lock().unwrap().push(event.to_string());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct RecordingRuntime {
        recorder: Recorder,
        install_delay: std::time::Duration,
    }

    struct RecordingProcess {
        recorder: Recorder,
        name: String,
    }

    impl SandboxProcess for RecordingProcess {
        fn kill(&mut self) {
            self.recorder.record(&format!("kill {}", self.name));
        }
    }

    impl SandboxRuntime for RecordingRuntime {
        fn mount(&mut self, descriptor: &MountDescriptor) -> Result<()> {
            self.recorder
                .record(&format!("mount {} entries", descriptor.len()));
            Ok(())
        }

        fn run_to_completion(
            &mut self,
            command: &str,
            args: &[String],
            _output: &OutputLog,
        ) -> Result<i32> {
            std::thread::sleep(self.install_delay);
            self.recorder
                .record(&format!("complete {} {}", command, args.join(" ")));
            Ok(0)
        }

        fn spawn(
            &mut self,
            command: &str,
            args: &[String],
            _output: &OutputLog,
        ) -> Result<Box<dyn SandboxProcess>> {
            let name = format!("{} {}", command, args.join(" "));
            self.recorder.record(&format!("spawn {}", name));
            Ok(Box::new(RecordingProcess {
                recorder: self.recorder.clone(),
                name,
            }))
        }
    }

    fn descriptor() -> MountDescriptor {
        let mut flat = FlatFileMap::new();
        flat.insert("index.js".to_string(), "x".to_string());
        flat.insert("package.json".to_string(), "{}".to_string());
        build_mount(&flat)
    }

    fn recording_session_with_delay(install_delay: std::time::Duration) -> (Recorder, SandboxSession) {
        let recorder = Recorder::new();
        let runtime = RecordingRuntime {
            recorder: recorder.clone(),
            install_delay,
        };
        let session = SandboxSession::new("room", Box::new(runtime));
        (recorder, session)
    }

    fn recording_session() -> (Recorder, SandboxSession) {
        recording_session_with_delay(std::time::Duration::ZERO)
    }

    #[test]
    fn run_mounts_installs_then_starts() {
        let (recorder, mut session) = recording_session();
        session.run(descriptor(), "index.js");
        session.wait_idle();
        assert_eq!(
            recorder.events(),
            vec![
                "mount 2 entries",
                "complete npm install",
                "spawn node index.js"
            ]
        );
        let output = session.output();
        assert!(output.iter().any(|l| l.contains("Installing dependencies")));
        assert!(output.iter().any(|l| l.contains("entry point: index.js")));
    }

    #[test]
    fn rerun_kills_the_previous_server() {
        let (recorder, mut session) = recording_session();
        session.run(descriptor(), "index.js");
        session.wait_idle();
        session.run(descriptor(), "server.js");
        session.wait_idle();
        let events = recorder.events();
        let kill_position = events
            .iter()
            .position(|e| e == "kill node index.js")
            .unwrap();
        let respawn_position = events
            .iter()
            .position(|e| e == "spawn node server.js")
            .unwrap();
        assert!(kill_position < respawn_position);
    }

    #[test]
    fn rerun_while_installing_does_not_orphan_the_server() {
        let (recorder, mut session) =
            recording_session_with_delay(std::time::Duration::from_millis(50));
        session.run(descriptor(), "a.js");
        // Let the first run take the runtime before racing it
        while recorder.events().is_empty() {
            std::thread::yield_now();
        }
        session.run(descriptor(), "b.js");
        session.wait_idle();
        let events = recorder.events();
        let spawn_a = events.iter().position(|e| e == "spawn node a.js").unwrap();
        let kill_a = events.iter().position(|e| e == "kill node a.js").unwrap();
        let spawn_b = events.iter().position(|e| e == "spawn node b.js").unwrap();
        assert!(spawn_a < kill_a);
        assert!(kill_a < spawn_b);
    }

    #[test]
    fn stop_and_drop_kill_the_process() {
        let (recorder, mut session) = recording_session();
        session.run(descriptor(), "index.js");
        session.wait_idle();
        session.stop();
        assert!(recorder.events().contains(&"kill node index.js".to_string()));

        let (recorder, mut session) = recording_session();
        session.run(descriptor(), "index.js");
        session.wait_idle();
        drop(session);
        assert!(recorder.events().contains(&"kill node index.js".to_string()));
    }

    #[test]
    fn output_log_is_bounded() {
        let log = OutputLog::new();
        for i in 0..(MAX_OUTPUT_LINES + 10) {
            log.push(format!("line {}", i));
        }
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), MAX_OUTPUT_LINES);
        assert_eq!(snapshot[0], "line 10");
    }

    #[test]
    fn shell_runtime_materializes_the_mount() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("session");
        let mut runtime = ShellRuntime::new(root.clone());
        let mut flat = FlatFileMap::new();
        flat.insert("index.js".to_string(), "top".to_string());
        flat.insert("src/app.js".to_string(), "nested".to_string());
        runtime.mount(&build_mount(&flat)).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("index.js")).unwrap(), "top");
        assert_eq!(
            std::fs::read_to_string(root.join("src/app.js")).unwrap(),
            "nested"
        );
    }
}
