// ABOUTME: In-memory container runtime used by the integration tests
// ABOUTME: Counts every lifecycle call and replays scripted exit codes, logs and archives
#![allow(dead_code)]

use async_trait::async_trait;
use buildbox_sandbox::logs::{encode_frame, StreamType};
use buildbox_sandbox::{ArchiveStream, ContainerRuntime, Result, RuntimeError, SandboxSpec};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tar::{Builder, EntryType, Header};

#[derive(Debug, Default)]
pub struct CallCounts {
    pub create: AtomicUsize,
    pub start: AtomicUsize,
    pub wait: AtomicUsize,
    pub logs: AtomicUsize,
    pub archive: AtomicUsize,
    pub stop: AtomicUsize,
    pub remove: AtomicUsize,
    /// Removals that ran to completion, successful or not
    pub remove_done: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub calls: CallCounts,
    pub last_spec: Mutex<Option<SandboxSpec>>,
    exit_code: i64,
    log_bytes: Vec<u8>,
    archive: Vec<u8>,
    create_delay: Option<Duration>,
    wait_delay: Option<Duration>,
    remove_delay: Option<Duration>,
    fail_create: bool,
    fail_start: bool,
    fail_wait: bool,
    fail_logs: bool,
    fail_remove: bool,
}

impl FakeRuntime {
    /// A runtime whose build exits 0, prints the completion marker and leaves `main.js`.
    pub fn succeeding() -> Self {
        Self::default()
            .with_logs(&[
                (StreamType::Stdout, "compiled successfully\n"),
                (StreamType::Stdout, "__BUILDBOX_BUILD_COMPLETE__\n"),
            ])
            .with_archive(&[("dist/assets/main.js", "console.log(1)"), ("dist/index.html", "<html/>")])
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_logs(mut self, records: &[(StreamType, &str)]) -> Self {
        self.log_bytes = records
            .iter()
            .flat_map(|(stream, text)| encode_frame(*stream, text.as_bytes()))
            .collect();
        self
    }

    pub fn with_archive(mut self, files: &[(&str, &str)]) -> Self {
        let mut builder = Builder::new(Vec::new());
        for (path, body) in files {
            let mut header = Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder
                .append_data(&mut header, path, body.as_bytes())
                .expect("append archive entry");
        }
        self.archive = builder.into_inner().expect("finish archive");
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    pub fn with_remove_delay(mut self, delay: Duration) -> Self {
        self.remove_delay = Some(delay);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    pub fn failing_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }

    pub fn failing_remove(mut self) -> Self {
        self.fail_remove = true;
        self
    }

    pub fn creates(&self) -> usize {
        CallCounts::get(&self.calls.create)
    }

    pub fn starts(&self) -> usize {
        CallCounts::get(&self.calls.start)
    }

    pub fn waits(&self) -> usize {
        CallCounts::get(&self.calls.wait)
    }

    pub fn archives(&self) -> usize {
        CallCounts::get(&self.calls.archive)
    }

    pub fn removes(&self) -> usize {
        CallCounts::get(&self.calls.remove)
    }

    pub fn removes_finished(&self) -> usize {
        CallCounts::get(&self.calls.remove_done)
    }

    pub fn logs_fetched(&self) -> usize {
        CallCounts::get(&self.calls.logs)
    }

    pub fn stops(&self) -> usize {
        CallCounts::get(&self.calls.stop)
    }

    pub fn spec(&self) -> SandboxSpec {
        self.last_spec
            .lock()
            .expect("spec lock")
            .clone()
            .expect("create was called")
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<String> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(RuntimeError::ImageNotFound(spec.image.clone()));
        }
        *self.last_spec.lock().expect("spec lock") = Some(spec.clone());
        // The daemon has the container by now; only the reply is slow
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("fake-{}", spec.name))
    }

    async fn start(&self, _id: &str) -> Result<()> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(RuntimeError::Container("start refused".to_string()));
        }
        Ok(())
    }

    async fn wait(&self, _id: &str) -> Result<i64> {
        self.calls.wait.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_wait {
            return Err(RuntimeError::Connection("daemon went away".to_string()));
        }
        Ok(self.exit_code)
    }

    async fn logs(&self, _id: &str) -> Result<Vec<u8>> {
        self.calls.logs.fetch_add(1, Ordering::SeqCst);
        if self.fail_logs {
            return Err(RuntimeError::Container("log stream closed".to_string()));
        }
        Ok(self.log_bytes.clone())
    }

    fn get_archive<'a>(&'a self, _id: &'a str, _path: &'a str) -> ArchiveStream<'a> {
        self.calls.archive.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Result<Vec<u8>>> = self
            .archive
            .chunks(512)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        stream::iter(chunks).boxed()
    }

    async fn stop(&self, _id: &str, _grace: Duration) -> Result<()> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, _id: &str, _force: bool) -> Result<()> {
        self.calls.remove.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.remove_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.remove_done.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove {
            return Err(RuntimeError::Container("removal already in progress".to_string()));
        }
        Ok(())
    }
}
