// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locating and invoking the test runner.

use crate::{
    FileUri, config::RunnerConfig, errors::RunnerExecutionError, filesystem::Filesystem,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{future::Future, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::{debug, info};

/// Everything needed to run the tests in one file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunRequest {
    /// The runner executable.
    pub executable: Utf8PathBuf,

    /// The runner configuration file, if one was found.
    pub config_file: Option<Utf8PathBuf>,

    /// The file whose tests are run.
    pub target: FileUri,

    /// The directory the runner is started in.
    pub working_dir: Utf8PathBuf,
}

/// Runs tests and returns the JUnit report they produced.
pub trait TestRunner: Send + Sync {
    /// Runs the tests described by `request`, returning the text of the JUnit report.
    fn run_tests(
        &self,
        request: &RunRequest,
    ) -> impl Future<Output = Result<String, RunnerExecutionError>> + Send;
}

/// Works out how to run the tests in `target`.
///
/// A project-local runner found above `target` is preferred over one on the search path.
pub async fn locate_runner<F: Filesystem>(
    fs: &F,
    config: &RunnerConfig,
    target: &FileUri,
) -> Result<RunRequest, RunnerExecutionError> {
    let target_dir = target.parent().unwrap_or(Utf8Path::new("/"));

    let mut executable = None;
    for candidate in &config.local_candidates {
        if let Some(found) = fs.find_up(candidate, target_dir).await {
            executable = Some(found);
            break;
        }
    }
    if executable.is_none() {
        executable = fs.which(&config.binary, target_dir).await;
    }
    let executable = executable.ok_or_else(|| RunnerExecutionError::MissingExecutable {
        binary: config.binary.clone(),
        searched_from: target_dir.to_owned(),
    })?;

    let mut config_file = None;
    for name in &config.config_files {
        if let Some(found) = fs.find_up(name, target_dir).await {
            config_file = Some(found);
            break;
        }
    }

    let working_dir = config_file
        .as_deref()
        .and_then(Utf8Path::parent)
        .unwrap_or(target_dir)
        .to_owned();

    debug!(
        "located runner `{executable}` for {target} (config: {config_file:?}, cwd: {working_dir})"
    );
    Ok(RunRequest {
        executable,
        config_file,
        target: target.clone(),
        working_dir,
    })
}

/// The name of the report file inside the per-run temporary directory.
const REPORT_FILE_NAME: &str = "junit.xml";

/// A [`TestRunner`] that starts the runner as a child process.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    config_arg: String,
    report_arg: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl ProcessRunner {
    /// Creates a new process runner from the runner config.
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            config_arg: config.config_arg.clone(),
            report_arg: config.report_arg.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout,
        }
    }

    fn make_command(&self, request: &RunRequest, report_path: &Utf8Path) -> Command {
        let mut cmd = Command::new(&request.executable);
        if let Some(config_file) = &request.config_file {
            cmd.arg(&self.config_arg).arg(config_file);
        }
        cmd.args(&self.extra_args)
            .arg(&self.report_arg)
            .arg(report_path)
            .arg(request.target.as_path())
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl TestRunner for ProcessRunner {
    async fn run_tests(&self, request: &RunRequest) -> Result<String, RunnerExecutionError> {
        let report_dir = camino_tempfile::Builder::new()
            .prefix("testlens-")
            .tempdir()?;
        let report_path = report_dir.path().join(REPORT_FILE_NAME);

        let mut cmd = self.make_command(request, &report_path);
        let child = cmd
            .spawn()
            .map_err(|error| RunnerExecutionError::Spawn {
                executable: request.executable.clone(),
                error,
            })?;

        info!("running `{}` for {}", request.executable, request.target);
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RunnerExecutionError::Timeout {
                executable: request.executable.clone(),
                timeout: self.timeout,
            })??;
        debug!("`{}` exited with {}", request.executable, output.status);

        // Runners exit non-zero when tests fail, so only a missing report counts as an error.
        let report = match tokio::fs::read_to_string(&report_path).await {
            Ok(report) if !report.trim().is_empty() => report,
            Ok(_) => String::new(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(error.into()),
        };
        if report.is_empty() {
            return Err(RunnerExecutionError::NoReport {
                executable: request.executable.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(report)
    }
}
