//! Single-writer queue for draft writes.
//!
//! Autosaves, step saves and submits all reach the draft store through one
//! task, so at most one write is in flight and writes land in the order they
//! were queued. A queued autosave is dropped when a later write to the same
//! draft is already waiting behind it; step saves and submits always run.

use ordering_drafts::{DraftStoreError, DraftStoreService};
use ordering_types::{truncate_id, Submission, SubmissionPatch};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors returned for a queued write.
#[derive(Debug, Error)]
pub enum WriteError {
	/// A later write to the same draft replaced this autosave before it was sent.
	#[error("Superseded by a later write")]
	Superseded,
	/// The writer task is gone.
	#[error("Draft writer stopped")]
	Closed,
	#[error("Draft store error: {0}")]
	Store(#[from] DraftStoreError),
}

type Reply = oneshot::Sender<Result<Submission, WriteError>>;

#[derive(Debug)]
enum WriteOp {
	Autosave {
		patch: SubmissionPatch,
	},
	Step {
		step: u8,
		patch: SubmissionPatch,
	},
	Submit {
		terms_accepted: bool,
		patch: SubmissionPatch,
	},
}

impl WriteOp {
	fn name(&self) -> &'static str {
		match self {
			WriteOp::Autosave { .. } => "autosave",
			WriteOp::Step { .. } => "step",
			WriteOp::Submit { .. } => "submit",
		}
	}
}

struct WriteRequest {
	submission_id: String,
	op: WriteOp,
	reply: Reply,
}

/// Handle to the draft writer task. Cheap to clone.
///
/// The task stops once every handle is dropped and the queue is drained.
#[derive(Clone)]
pub struct DraftWriter {
	sender: mpsc::UnboundedSender<WriteRequest>,
}

impl DraftWriter {
	/// Spawns the writer task on the current runtime.
	pub fn spawn(drafts: DraftStoreService) -> Self {
		let (sender, receiver) = mpsc::unbounded_channel();
		tokio::spawn(run(drafts, receiver));
		Self { sender }
	}

	/// Queues an autosave merge. May be superseded.
	pub async fn update(
		&self,
		submission_id: &str,
		patch: SubmissionPatch,
	) -> Result<Submission, WriteError> {
		Self::wait(self.enqueue(submission_id, WriteOp::Autosave { patch })?).await
	}

	/// Queues a step save.
	pub async fn update_step(
		&self,
		submission_id: &str,
		step: u8,
		patch: SubmissionPatch,
	) -> Result<Submission, WriteError> {
		Self::wait(self.enqueue(submission_id, WriteOp::Step { step, patch })?).await
	}

	/// Queues the final submit. `patch` is stored on the draft first.
	pub async fn submit(
		&self,
		submission_id: &str,
		terms_accepted: bool,
		patch: SubmissionPatch,
	) -> Result<Submission, WriteError> {
		Self::wait(self.enqueue(
			submission_id,
			WriteOp::Submit {
				terms_accepted,
				patch,
			},
		)?)
		.await
	}

	fn enqueue(
		&self,
		submission_id: &str,
		op: WriteOp,
	) -> Result<oneshot::Receiver<Result<Submission, WriteError>>, WriteError> {
		let (reply, receiver) = oneshot::channel();
		self.sender
			.send(WriteRequest {
				submission_id: submission_id.to_string(),
				op,
				reply,
			})
			.map_err(|_| WriteError::Closed)?;
		Ok(receiver)
	}

	async fn wait(
		receiver: oneshot::Receiver<Result<Submission, WriteError>>,
	) -> Result<Submission, WriteError> {
		receiver.await.map_err(|_| WriteError::Closed)?
	}
}

async fn run(drafts: DraftStoreService, mut receiver: mpsc::UnboundedReceiver<WriteRequest>) {
	while let Some(first) = receiver.recv().await {
		let mut batch = vec![first];
		while let Ok(next) = receiver.try_recv() {
			batch.push(next);
		}

		for request in drop_superseded(batch) {
			let result = execute(&drafts, &request.submission_id, request.op).await;
			// The caller may have stopped waiting
			let _ = request.reply.send(result);
		}
	}
	tracing::debug!("Draft writer stopped");
}

/// Removes autosaves that have a later write to the same draft in the batch.
fn drop_superseded(batch: Vec<WriteRequest>) -> Vec<WriteRequest> {
	let mut later_writes = HashSet::new();
	let mut kept = Vec::with_capacity(batch.len());

	for request in batch.into_iter().rev() {
		let superseded = matches!(request.op, WriteOp::Autosave { .. })
			&& later_writes.contains(&request.submission_id);
		later_writes.insert(request.submission_id.clone());

		if superseded {
			tracing::debug!(
				submission_id = %truncate_id(&request.submission_id),
				"Dropping superseded autosave"
			);
			let _ = request.reply.send(Err(WriteError::Superseded));
		} else {
			kept.push(request);
		}
	}

	kept.reverse();
	kept
}

async fn execute(
	drafts: &DraftStoreService,
	submission_id: &str,
	op: WriteOp,
) -> Result<Submission, WriteError> {
	tracing::trace!(submission_id = %truncate_id(submission_id), op = op.name(), "Writing draft");
	let submission = match op {
		WriteOp::Autosave { patch } => drafts.update(submission_id, &patch).await?,
		WriteOp::Step { step, patch } => drafts.update_step(submission_id, step, &patch).await?,
		WriteOp::Submit {
			terms_accepted,
			patch,
		} => {
			let patch = SubmissionPatch {
				terms_accepted: Some(terms_accepted),
				..patch
			};
			drafts.update(submission_id, &patch).await?;
			drafts.submit(submission_id, terms_accepted).await?
		},
	};
	Ok(submission)
}
