//! File-backed token provider.
//!
//! The access token lives in a plain text file. On first run, when the file
//! is missing or empty, the operator is prompted on the terminal for the
//! token issued to the configured phone number; the answer is written back
//! so later runs start unattended.
//!
//! A blocking terminal read cannot be interrupted. When a login is
//! cancelled the prompt keeps waiting for its line, and the next login
//! takes over that same prompt instead of opening a second reader on stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cgbridge_core::{BridgeError, Credential, TokenProvider};

/// Asks the operator for a token. Runs on the blocking pool.
pub type Prompt = Arc<dyn Fn(&str) -> io::Result<String> + Send + Sync>;

pub struct FileTokenProvider {
    path: PathBuf,
    prompt: Prompt,
    /// Prompt still waiting for an answer, possibly from a cancelled login.
    pending: Mutex<Option<JoinHandle<io::Result<String>>>>,
}

impl FileTokenProvider {
    /// Provider that prompts on stdin/stderr.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_prompt(path, Arc::new(terminal_prompt))
    }

    pub fn with_prompt(path: impl Into<PathBuf>, prompt: Prompt) -> Self {
        Self {
            path: path.into(),
            prompt,
            pending: Mutex::new(None),
        }
    }
}

fn terminal_prompt(phone_number: &str) -> io::Result<String> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "access token for {phone_number}: ")?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn load_stored_credential(&self) -> Result<Option<Credential>, BridgeError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                let token = text.trim();
                Ok((!token.is_empty()).then(|| Credential::new(token)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn login(&self, phone_number: &str) -> Result<Credential, BridgeError> {
        let answer = {
            let mut pending = self.pending.lock().await;
            if pending.is_some() {
                debug!("resuming login prompt left by an earlier attempt");
            }
            let handle = pending.get_or_insert_with(|| {
                let prompt = Arc::clone(&self.prompt);
                let phone = phone_number.to_string();
                tokio::task::spawn_blocking(move || prompt(&phone))
            });
            let joined = handle.await;
            *pending = None;
            joined.map_err(|e| BridgeError::Other(format!("login prompt failed: {e}")))??
        };

        let token = answer.trim();
        if token.is_empty() {
            return Err(BridgeError::Credential("no token entered".into()));
        }
        if let Err(e) = tokio::fs::write(&self.path, token).await {
            warn!("could not store token in {}: {e}", self.path.display());
        } else {
            info!("token stored in {}", self.path.display());
        }
        Ok(Credential::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cgbridge-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_means_no_credential() {
        let provider = FileTokenProvider::new(temp_path("missing"));
        assert!(provider.load_stored_credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_token_is_trimmed() {
        let path = temp_path("stored");
        std::fs::write(&path, "  abc\n").unwrap();
        let provider = FileTokenProvider::new(&path);
        let cred = provider.load_stored_credential().await.unwrap().unwrap();
        assert_eq!(cred.expose(), "abc");
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn blank_file_means_no_credential() {
        let path = temp_path("blank");
        std::fs::write(&path, "\n").unwrap();
        let provider = FileTokenProvider::new(&path);
        assert!(provider.load_stored_credential().await.unwrap().is_none());
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn login_persists_entered_token() {
        let path = temp_path("login");
        let provider = FileTokenProvider::with_prompt(
            &path,
            Arc::new(|phone: &str| {
                assert_eq!(phone, "86-100");
                Ok("fresh\n".to_string())
            }),
        );
        let cred = provider.login("86-100").await.unwrap();
        assert_eq!(cred.expose(), "fresh");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn cancelled_login_leaves_one_prompt_for_the_next() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::mpsc;
        use std::time::Duration;

        let path = temp_path("resume");
        let (answer_tx, answer_rx) = mpsc::channel::<String>();
        let answer_rx = std::sync::Mutex::new(answer_rx);
        let prompts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&prompts);
        let provider = FileTokenProvider::with_prompt(
            &path,
            Arc::new(move |_: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                answer_rx.lock().unwrap().recv().map_err(io::Error::other)
            }),
        );

        let first = tokio::time::timeout(Duration::from_millis(50), provider.login("86-1")).await;
        assert!(first.is_err());

        answer_tx.send("late\n".to_string()).unwrap();
        let cred = provider.login("86-1").await.unwrap();
        assert_eq!(cred.expose(), "late");
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn empty_answer_is_a_credential_error() {
        let provider =
            FileTokenProvider::with_prompt(temp_path("empty"), Arc::new(|_: &str| Ok(String::new())));
        assert!(matches!(
            provider.login("86-1").await,
            Err(BridgeError::Credential(_))
        ));
    }
}
