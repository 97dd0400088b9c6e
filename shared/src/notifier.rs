use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::channels::EntryInfo;

/// Creates the two ordered queues that carry entry creation and removal
/// notices from the channel subsystem's callback context to the role that
/// drains them once per cycle.
pub fn entry_notices(capacity: usize) -> (EntryNotifier, EntryNotices) {
    let (created_sender, created) = NoticeQueue::new(capacity);
    let (removed_sender, removed) = NoticeQueue::new(capacity);
    (
        EntryNotifier {
            created: created_sender,
            removed: removed_sender,
        },
        EntryNotices { created, removed },
    )
}

/// A bounded channel plus the notices that did not fit into it. Once
/// anything has spilled, later notices spill too until the consumer drains,
/// so the order is kept.
struct NoticeQueue {
    receiver: Receiver<EntryInfo>,
    spilled: Arc<Mutex<VecDeque<EntryInfo>>>,
}

#[derive(Clone)]
struct NoticeSender {
    sender: Sender<EntryInfo>,
    spilled: Weak<Mutex<VecDeque<EntryInfo>>>,
}

fn lock(spilled: &Mutex<VecDeque<EntryInfo>>) -> MutexGuard<'_, VecDeque<EntryInfo>> {
    spilled.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NoticeQueue {
    fn new(capacity: usize) -> (NoticeSender, Self) {
        let (sender, receiver) = bounded(capacity);
        let spilled = Arc::new(Mutex::new(VecDeque::new()));
        (
            NoticeSender {
                sender,
                spilled: Arc::downgrade(&spilled),
            },
            Self { receiver, spilled },
        )
    }

    fn drain(&self) -> Vec<EntryInfo> {
        let mut spilled = lock(&self.spilled);
        let mut notices: Vec<EntryInfo> = self.receiver.try_iter().collect();
        notices.extend(spilled.drain(..));
        notices
    }

    fn is_empty(&self) -> bool {
        self.receiver.is_empty() && lock(&self.spilled).is_empty()
    }
}

impl NoticeSender {
    fn push(&self, info: EntryInfo, kind: &str) {
        let Some(spilled) = self.spilled.upgrade() else {
            debug!("replicator went away, {} notice for entry {} not delivered", kind, info.entry);
            return;
        };
        let mut spilled = lock(&spilled);
        if spilled.is_empty() {
            match self.sender.try_send(info) {
                Ok(()) => return,
                Err(TrySendError::Full(info)) => {
                    warn!(
                        "entry {} queue is full ({} notices), keeping further notices until the replicator drains it",
                        kind,
                        self.sender.len()
                    );
                    spilled.push_back(info);
                }
                Err(TrySendError::Disconnected(info)) => {
                    debug!("replicator went away, {} notice for entry {} not delivered", kind, info.entry);
                }
            }
            return;
        }
        spilled.push_back(info);
    }
}

/// Producer side, handed to the channel subsystem. Safe to clone and call from
/// any thread, the draining role's own included. It never blocks: notices
/// beyond the queue capacity are held aside in order, never dropped while the
/// role is alive.
#[derive(Clone)]
pub struct EntryNotifier {
    created: NoticeSender,
    removed: NoticeSender,
}

impl EntryNotifier {
    pub fn notify_created(&self, info: EntryInfo) {
        self.created.push(info, "creation");
    }

    pub fn notify_removed(&self, info: EntryInfo) {
        self.removed.push(info, "removal");
    }
}

/// Consumer side, owned by the role
pub struct EntryNotices {
    created: NoticeQueue,
    removed: NoticeQueue,
}

impl EntryNotices {
    /// All creation notices queued so far, oldest first
    pub fn drain_created(&self) -> Vec<EntryInfo> {
        self.created.drain()
    }

    /// All removal notices queued so far, oldest first
    pub fn drain_removed(&self) -> Vec<EntryInfo> {
        self.removed.drain()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}
