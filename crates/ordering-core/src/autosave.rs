//! Debounced background autosave.
//!
//! Field edits push snapshots of the form. A snapshot is written once no newer
//! snapshot has arrived for the debounce window; a snapshot equal to the last
//! one written is skipped. Outcomes are published on the event bus and never
//! surface as session errors.
//!
//! Before a step save or submit writes the form itself, the session
//! supersedes the pending snapshot so an older form never lands after it.

use crate::event_bus::EventBus;
use crate::writer::{DraftWriter, WriteError};
use ordering_types::{truncate_id, AutosaveEvent, SessionEvent, SubmissionPatch};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Form state of one draft at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub submission_id: String,
	pub patch: SubmissionPatch,
}

enum Command {
	Push(Snapshot),
	/// `written` is about to be stored by another write; drop any pending
	/// snapshot for the same draft and treat `written` as the last one sent.
	Supersede {
		written: Snapshot,
		done: oneshot::Sender<()>,
	},
}

/// Handle to the autosave task.
///
/// Dropping the handle flushes the pending snapshot and stops the task.
pub struct Autosaver {
	sender: mpsc::UnboundedSender<Command>,
}

impl Autosaver {
	pub fn spawn(writer: DraftWriter, event_bus: EventBus, debounce: Duration) -> Self {
		let (sender, receiver) = mpsc::unbounded_channel();
		tokio::spawn(run(writer, event_bus, debounce, receiver));
		Self { sender }
	}

	/// Queues a snapshot. Replaces any snapshot still inside the debounce window.
	pub fn push(&self, snapshot: Snapshot) {
		if self.sender.send(Command::Push(snapshot)).is_err() {
			tracing::warn!("Autosave task stopped, dropping snapshot");
		}
	}

	/// Drops the pending snapshot for `written.submission_id`.
	///
	/// Returns once the task has seen the request. An autosave already handed
	/// to the writer by then is queued ahead of any write the caller makes next.
	pub async fn supersede(&self, written: Snapshot) {
		let (done, acknowledged) = oneshot::channel();
		if self.sender.send(Command::Supersede { written, done }).is_err() {
			tracing::warn!("Autosave task stopped");
			return;
		}
		acknowledged.await.ok();
	}
}

async fn run(
	writer: DraftWriter,
	event_bus: EventBus,
	debounce: Duration,
	mut receiver: mpsc::UnboundedReceiver<Command>,
) {
	let mut last_written: Option<Snapshot> = None;
	let mut pending: Option<Snapshot> = None;

	loop {
		// The window restarts on every message while a snapshot is pending
		let command = if pending.is_some() {
			match timeout(debounce, receiver.recv()).await {
				Ok(Some(command)) => command,
				Ok(None) => break,
				Err(_) => {
					if let Some(snapshot) = pending.take() {
						write(&writer, &event_bus, &mut last_written, snapshot).await;
					}
					continue;
				},
			}
		} else {
			match receiver.recv().await {
				Some(command) => command,
				None => break,
			}
		};

		match command {
			Command::Push(snapshot) => pending = Some(snapshot),
			Command::Supersede { written, done } => {
				if pending
					.as_ref()
					.is_some_and(|p| p.submission_id == written.submission_id)
				{
					tracing::debug!(
						submission_id = %truncate_id(&written.submission_id),
						"Pending autosave superseded"
					);
					pending = None;
				}
				last_written = Some(written);
				done.send(()).ok();
			},
		}
	}

	if let Some(snapshot) = pending {
		write(&writer, &event_bus, &mut last_written, snapshot).await;
	}
}

async fn write(
	writer: &DraftWriter,
	event_bus: &EventBus,
	last_written: &mut Option<Snapshot>,
	snapshot: Snapshot,
) {
	let submission_id = snapshot.submission_id.clone();
	if last_written.as_ref() == Some(&snapshot) {
		tracing::trace!(submission_id = %truncate_id(&submission_id), "Autosave unchanged");
		event_bus
			.publish(SessionEvent::Autosave(AutosaveEvent::Skipped { submission_id }))
			.ok();
		return;
	}

	match writer.update(&submission_id, snapshot.patch.clone()).await {
		Ok(saved) => {
			tracing::debug!(submission_id = %truncate_id(&submission_id), "Autosaved draft");
			event_bus
				.publish(SessionEvent::Autosave(AutosaveEvent::Saved {
					submission_id,
					saved_at: saved.last_saved_at.unwrap_or(saved.updated_at),
				}))
				.ok();
			*last_written = Some(snapshot);
		},
		Err(WriteError::Superseded) => {
			tracing::debug!(submission_id = %truncate_id(&submission_id), "Autosave superseded");
		},
		Err(e) => {
			tracing::warn!(
				submission_id = %truncate_id(&submission_id),
				error = %e,
				"Autosave failed"
			);
			event_bus
				.publish(SessionEvent::Autosave(AutosaveEvent::Failed {
					submission_id,
					error: e.to_string(),
				}))
				.ok();
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::ScriptedDraftStore;
	use ordering_drafts::DraftStoreService;
	use std::sync::atomic::Ordering;
	use std::sync::Arc;
	use tokio::sync::broadcast;

	const DEBOUNCE: Duration = Duration::from_millis(2000);

	struct Harness {
		store: Arc<ScriptedDraftStore>,
		autosaver: Autosaver,
		events: broadcast::Receiver<SessionEvent>,
		draft_id: String,
	}

	async fn harness() -> Harness {
		let store = Arc::new(ScriptedDraftStore::new());
		let writer = DraftWriter::spawn(DraftStoreService::new(store.clone()));
		let event_bus = EventBus::new(64);
		let events = event_bus.subscribe();
		let draft_id = store.create_draft("owner-1").await.id;
		Harness {
			store,
			autosaver: Autosaver::spawn(writer, event_bus, DEBOUNCE),
			events,
			draft_id,
		}
	}

	fn snapshot(id: &str, pages: u32) -> Snapshot {
		Snapshot {
			submission_id: id.to_string(),
			patch: SubmissionPatch {
				number_of_pages: Some(pages),
				..Default::default()
			},
		}
	}

	async fn next_autosave_event(events: &mut broadcast::Receiver<SessionEvent>) -> AutosaveEvent {
		match events.recv().await.unwrap() {
			SessionEvent::Autosave(event) => event,
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_only_latest_snapshot_in_window_is_written() {
		let mut h = harness().await;

		h.autosaver.push(snapshot(&h.draft_id, 2));
		tokio::time::sleep(Duration::from_millis(500)).await;
		h.autosaver.push(snapshot(&h.draft_id, 3));
		tokio::time::sleep(Duration::from_millis(500)).await;
		h.autosaver.push(snapshot(&h.draft_id, 4));

		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Saved { .. }
		));
		assert_eq!(h.store.calls(), vec!["create", "update"]);

		let saved = h.store.get_draft(&h.draft_id).await;
		assert_eq!(saved.number_of_pages, Some(4));
	}

	#[tokio::test(start_paused = true)]
	async fn test_nothing_is_written_inside_the_window() {
		let h = harness().await;
		h.autosaver.push(snapshot(&h.draft_id, 2));
		tokio::time::sleep(Duration::from_millis(1500)).await;
		assert_eq!(h.store.calls(), vec!["create"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unchanged_snapshot_is_skipped() {
		let mut h = harness().await;

		h.autosaver.push(snapshot(&h.draft_id, 2));
		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Saved { .. }
		));

		h.autosaver.push(snapshot(&h.draft_id, 2));
		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Skipped { .. }
		));
		assert_eq!(h.store.calls(), vec!["create", "update"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failure_is_published_and_retried_on_next_edit() {
		let mut h = harness().await;
		h.store.fail_writes.store(true, Ordering::SeqCst);

		h.autosaver.push(snapshot(&h.draft_id, 2));
		match next_autosave_event(&mut h.events).await {
			AutosaveEvent::Failed { submission_id, error } => {
				assert_eq!(submission_id, h.draft_id);
				assert!(error.contains("503"));
			},
			other => panic!("unexpected event: {:?}", other),
		}

		// A failed snapshot is not remembered, so the same content is retried
		h.store.fail_writes.store(false, Ordering::SeqCst);
		h.autosaver.push(snapshot(&h.draft_id, 2));
		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Saved { .. }
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_supersede_drops_pending_snapshot() {
		let mut h = harness().await;

		h.autosaver.push(snapshot(&h.draft_id, 2));
		tokio::time::sleep(Duration::from_millis(500)).await;
		h.autosaver.supersede(snapshot(&h.draft_id, 5)).await;
		tokio::time::sleep(DEBOUNCE * 2).await;
		assert_eq!(h.store.calls(), vec!["create"]);

		// The superseding form counts as written
		h.autosaver.push(snapshot(&h.draft_id, 5));
		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Skipped { .. }
		));
		assert_eq!(h.store.calls(), vec!["create"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_supersede_leaves_other_drafts_pending() {
		let mut h = harness().await;
		let other = h.store.create_draft("owner-1").await.id;

		h.autosaver.push(snapshot(&other, 3));
		h.autosaver.supersede(snapshot(&h.draft_id, 5)).await;
		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Saved { .. }
		));
		assert_eq!(h.store.get_draft(&other).await.number_of_pages, Some(3));
	}

	#[tokio::test(start_paused = true)]
	async fn test_dropping_handle_flushes_pending_snapshot() {
		let mut h = harness().await;
		h.autosaver.push(snapshot(&h.draft_id, 7));
		drop(h.autosaver);

		assert!(matches!(
			next_autosave_event(&mut h.events).await,
			AutosaveEvent::Saved { .. }
		));
		assert_eq!(h.store.get_draft(&h.draft_id).await.number_of_pages, Some(7));
	}
}
