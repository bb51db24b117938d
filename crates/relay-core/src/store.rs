//! JSON snapshots of the relay tables.
//!
//! Loads never fail: a missing file yields the empty default and a corrupt
//! one is logged and replaced by the default on the next save. Saves are
//! queued to a single writer task and land on disk in the order they were
//! scheduled; failures are only logged.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::{
    config::Config,
    domain::{ChatId, MessageId},
    errors::Error,
    links::{LinkRecord, LinkTable},
    Result,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ActiveUserFile {
    #[serde(default)]
    active_user: Option<ChatId>,
}

enum WriteJob {
    Write { path: PathBuf, bytes: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

impl std::fmt::Debug for WriteJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write { path, .. } => write!(f, "Write({})", path.display()),
            Self::Flush(_) => write!(f, "Flush"),
        }
    }
}

/// File-backed state. Must be created inside a tokio runtime (it spawns the writer).
#[derive(Clone, Debug)]
pub struct StateStore {
    users_file: PathBuf,
    links_file: PathBuf,
    active_user_file: PathBuf,
    writer: mpsc::UnboundedSender<WriteJob>,
}

impl StateStore {
    pub fn new(users_file: PathBuf, links_file: PathBuf, active_user_file: PathBuf) -> Self {
        let (writer, jobs) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(jobs));
        Self {
            users_file,
            links_file,
            active_user_file,
            writer,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.users_file.clone(),
            cfg.links_file.clone(),
            cfg.active_user_file.clone(),
        )
    }

    pub fn load_users(&self) -> HashSet<ChatId> {
        load_json::<Vec<ChatId>>(&self.users_file)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    pub fn load_links(&self, capacity: usize) -> LinkTable {
        let entries =
            load_json::<BTreeMap<MessageId, LinkRecord>>(&self.links_file).unwrap_or_default();
        LinkTable::from_entries(capacity, entries)
    }

    pub fn load_active_user(&self) -> Option<ChatId> {
        load_json::<ActiveUserFile>(&self.active_user_file)
            .unwrap_or_default()
            .active_user
    }

    /// Persist the registry as a sorted list.
    pub fn save_users(&self, users: &HashSet<ChatId>) {
        let mut list: Vec<ChatId> = users.iter().copied().collect();
        list.sort();
        self.schedule(&self.users_file, &list);
    }

    pub fn save_links(&self, links: &LinkTable) {
        let map: BTreeMap<_, _> = links.iter().map(|(id, record)| (id, *record)).collect();
        self.schedule(&self.links_file, &map);
    }

    pub fn save_active_user(&self, active_user: Option<ChatId>) {
        self.schedule(&self.active_user_file, &ActiveUserFile { active_user });
    }

    /// Wait until every save scheduled so far has been written (or has failed).
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writer.send(WriteJob::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    fn schedule<T: Serialize>(&self, path: &Path, value: &T) {
        if let Err(e) = self.enqueue(path, value) {
            error!("Error saving {}: {e}", path.display());
        }
    }

    fn enqueue<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.writer
            .send(WriteJob::Write {
                path: path.to_path_buf(),
                bytes,
            })
            .map_err(|_| Error::External("state writer has stopped".to_string()))
    }
}

async fn run_writer(mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Write { path, bytes } => {
                if let Err(e) = write_atomic(&path, &bytes).await {
                    error!("Error saving {}: {e}", path.display());
                }
            }
            WriteJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let txt = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Unreadable {}, resetting: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&txt) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Corrupt {}, resetting: {e}", path.display());
            None
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = PathBuf::from(format!("/tmp/{prefix}-{}-{ts}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn store_in(dir: &Path) -> StateStore {
        StateStore::new(
            dir.join("users.json"),
            dir.join("message_links.json"),
            dir.join("active_user.json"),
        )
    }

    #[tokio::test]
    async fn missing_files_load_as_empty() {
        let dir = tmp_dir("relay-store-missing");
        let store = store_in(&dir);
        assert!(store.load_users().is_empty());
        assert!(store.load_links(500).is_empty());
        assert_eq!(store.load_active_user(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_files_reset_to_default() {
        let dir = tmp_dir("relay-store-corrupt");
        std::fs::write(dir.join("users.json"), "[1, 2,").unwrap();
        std::fs::write(dir.join("message_links.json"), r#"{"abc": 1}"#).unwrap();
        std::fs::write(dir.join("active_user.json"), "null").unwrap();

        let store = store_in(&dir);
        assert!(store.load_users().is_empty());
        assert!(store.load_links(500).is_empty());
        assert_eq!(store.load_active_user(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn reads_existing_on_disk_formats() {
        let dir = tmp_dir("relay-store-formats");
        std::fs::write(dir.join("users.json"), "[42, 7, 42]").unwrap();
        std::fs::write(
            dir.join("message_links.json"),
            r#"{"100":{"user_id":42,"user_msg_id":7},"99":{"user_id":5,"user_msg_id":1}}"#,
        )
        .unwrap();
        std::fs::write(dir.join("active_user.json"), r#"{"active_user": 42}"#).unwrap();

        let store = store_in(&dir);
        let users = store.load_users();
        assert_eq!(users.len(), 2);
        assert!(users.contains(&ChatId(42)) && users.contains(&ChatId(7)));

        let links = store.load_links(500);
        let ids: Vec<_> = links.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![99, 100]);
        assert_eq!(
            links.get(MessageId(100)),
            Some(&LinkRecord {
                user_id: ChatId(42),
                user_msg_id: MessageId(7),
            })
        );

        assert_eq!(store.load_active_user(), Some(ChatId(42)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn saves_round_trip() {
        let dir = tmp_dir("relay-store-save");
        let store = store_in(&dir);

        let users: HashSet<ChatId> = [ChatId(3), ChatId(1)].into_iter().collect();
        let mut links = LinkTable::new(500);
        links.insert(
            MessageId(100),
            LinkRecord {
                user_id: ChatId(3),
                user_msg_id: MessageId(7),
            },
        );

        store.save_users(&users);
        store.save_links(&links);
        store.save_active_user(Some(ChatId(3)));
        store.flush().await;

        assert_eq!(
            std::fs::read_to_string(dir.join("users.json")).unwrap(),
            "[1,3]"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("message_links.json")).unwrap(),
            r#"{"100":{"user_id":3,"user_msg_id":7}}"#
        );
        assert_eq!(store.load_users(), users);
        assert_eq!(store.load_links(500).len(), 1);
        assert_eq!(store.load_active_user(), Some(ChatId(3)));

        store.save_active_user(None);
        store.flush().await;
        assert_eq!(
            std::fs::read_to_string(dir.join("active_user.json")).unwrap(),
            r#"{"active_user":null}"#
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn saves_land_in_scheduling_order() {
        let dir = tmp_dir("relay-store-order");
        let store = store_in(&dir);

        for i in 0..200 {
            store.save_active_user(Some(ChatId(i)));
        }
        store.flush().await;

        assert_eq!(store.load_active_user(), Some(ChatId(199)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unserializable_snapshot_is_a_json_error() {
        let dir = tmp_dir("relay-store-json");
        let store = store_in(&dir);

        // JSON object keys must be strings.
        let bad: BTreeMap<(i32, i32), i32> = [((1, 2), 3)].into_iter().collect();
        let res = store.enqueue(&dir.join("users.json"), &bad);
        assert!(matches!(res, Err(Error::Json(_))));

        store.flush().await;
        assert!(!dir.join("users.json").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let store = StateStore::new(
            PathBuf::from("/nonexistent-relay-dir/users.json"),
            PathBuf::from("/nonexistent-relay-dir/message_links.json"),
            PathBuf::from("/nonexistent-relay-dir/active_user.json"),
        );
        let users: HashSet<ChatId> = [ChatId(1)].into_iter().collect();
        store.save_users(&users);
        store.save_active_user(Some(ChatId(1)));

        // The writer logs the errors and keeps serving.
        store.flush().await;
        assert!(store.load_users().is_empty());
    }
}
