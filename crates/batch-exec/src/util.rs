use std::time::Duration;

use tokio::{
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};

cfg_if::cfg_if! {
    if #[cfg(target_family = "windows")] {
        /// Command running `script` through the platform shell.
        pub fn shell_command(script: &str) -> Command {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(script);
            cmd
        }
    } else {
        /// Command running `script` through the platform shell.
        pub fn shell_command(script: &str) -> Command {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(script);
            // own process group, so cancellation reaches the script's children too
            cmd.process_group(0);
            cmd
        }
    }
}

/// SIGTERM the child's process group, wait up to `grace`, then SIGKILL the child.
#[cfg(target_family = "unix")]
pub async fn kill_graceful(child: &mut Child, grace: Duration) -> std::io::Result<()> {
    if let Some(id) = child.id() {
        // SAFETY: signals a process group created by `shell_command`; no memory is touched.
        unsafe {
            libc::kill(-(id as libc::pid_t), libc::SIGTERM);
        }
        if timeout(grace, child.wait()).await.is_ok() {
            return Ok(());
        }
    }
    child.kill().await
}

#[cfg(target_family = "windows")]
pub async fn kill_graceful(child: &mut Child, _grace: Duration) -> std::io::Result<()> {
    child.kill().await
}

/// Await output readers for at most `limit`; stragglers are aborted.
pub async fn drain(readers: Vec<JoinHandle<()>>, limit: Duration) {
    for handle in readers {
        let abort = handle.abort_handle();
        if timeout(limit, handle).await.is_err() {
            abort.abort();
        }
    }
}
