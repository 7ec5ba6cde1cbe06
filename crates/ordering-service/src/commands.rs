//! CLI subcommands.
//!
//! Every command returns its result as JSON; `main` prints it.

use clap::{Args, Subcommand};
use ordering_core::{OrderingEngine, SessionError};
use ordering_types::{
	AcademicLevel, DeadlineUrgency, InstructionDetails, KeyDetails, ReviewDetails, ServiceType,
	SubmissionPatch,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("Session error: {0}")]
	Session(#[from] SessionError),
	#[error("Draft store error: {0}")]
	Drafts(String),
	#[error("Invalid input: {0}")]
	Input(String),
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Price an order
	Quote(QuoteArgs),
	/// Print the active pricing catalog
	Catalog,
	/// Manage saved drafts
	#[command(subcommand)]
	Drafts(DraftsCommand),
	/// Load a draft into a session and print the rebuilt wizard state
	Resume {
		/// Submission id
		id: String,
	},
	/// Run an order described in a JSON file through every wizard step
	Submit {
		#[arg(short, long)]
		file: PathBuf,
	},
}

#[derive(Subcommand, Debug)]
pub enum DraftsCommand {
	/// List an owner's submissions, most recent first
	List {
		/// Owner id; defaults to session.owner_id
		#[arg(long)]
		owner: Option<String>,
	},
	/// Print one submission
	Show { id: String },
	/// Delete a submission
	Delete { id: String },
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
	#[arg(long, default_value = "undergraduate")]
	pub level: AcademicLevel,
	#[arg(long, default_value = "writing")]
	pub service: ServiceType,
	#[arg(long, default_value = "7d")]
	pub deadline: DeadlineUrgency,
	#[arg(long, default_value_t = 1)]
	pub pages: u32,
	#[arg(long, default_value_t = 0)]
	pub sources: u32,
	/// Extra id; repeat for several
	#[arg(long = "extra")]
	pub extras: Vec<String>,
	#[arg(long)]
	pub promo: Option<String>,
}

/// An order as read by `submit --file`.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
	pub key_details: KeyDetails,
	pub instructions: InstructionDetails,
	#[serde(default)]
	pub review: ReviewDetails,
	#[serde(default)]
	pub promo_code: Option<String>,
}

pub async fn run(engine: &OrderingEngine, command: Command) -> Result<Value, CommandError> {
	match command {
		Command::Quote(args) => quote(engine, args).await,
		Command::Catalog => {
			let catalog = engine.catalog().catalog_or_default().await;
			to_json(catalog.as_ref())
		},
		Command::Drafts(command) => drafts(engine, command).await,
		Command::Resume { id } => resume(engine, &id).await,
		Command::Submit { file } => {
			let content = tokio::fs::read_to_string(&file)
				.await
				.map_err(|e| CommandError::Input(format!("{}: {}", file.display(), e)))?;
			let request: OrderRequest =
				serde_json::from_str(&content).map_err(|e| CommandError::Input(e.to_string()))?;
			submit(engine, request).await
		},
	}
}

async fn quote(engine: &OrderingEngine, args: QuoteArgs) -> Result<Value, CommandError> {
	let mut session = engine.open_session_for(None);
	let mut breakdown = session
		.update_fields(SubmissionPatch {
			academic_level: Some(args.level),
			service_type: Some(args.service),
			deadline_urgency: Some(args.deadline),
			number_of_pages: Some(args.pages),
			number_of_sources: Some(args.sources),
			selected_extras: Some(args.extras),
			..Default::default()
		})
		.await;
	if let Some(code) = args.promo {
		breakdown = session.apply_promo(&code).await?;
	}
	to_json(&breakdown)
}

async fn drafts(engine: &OrderingEngine, command: DraftsCommand) -> Result<Value, CommandError> {
	let drafts = engine.drafts();
	match command {
		DraftsCommand::List { owner } => {
			let owner = owner
				.or_else(|| engine.config().session.owner_id.clone())
				.ok_or_else(|| CommandError::Input("--owner or session.owner_id is required".into()))?;
			let submissions = drafts
				.list_by_owner(&owner)
				.await
				.map_err(|e| CommandError::Drafts(e.to_string()))?;
			to_json(&submissions)
		},
		DraftsCommand::Show { id } => {
			let submission = drafts
				.get(&id)
				.await
				.map_err(|e| CommandError::Drafts(e.to_string()))?;
			to_json(&submission)
		},
		DraftsCommand::Delete { id } => {
			drafts
				.delete(&id)
				.await
				.map_err(|e| CommandError::Drafts(e.to_string()))?;
			Ok(json!({ "deleted": id }))
		},
	}
}

async fn resume(engine: &OrderingEngine, id: &str) -> Result<Value, CommandError> {
	let mut session = engine.open_session();
	session.resume_submission(id).await?;
	let breakdown = session.quote().await;
	Ok(json!({
		"state": to_json(session.state())?,
		"breakdown": to_json(&breakdown)?,
	}))
}

async fn submit(engine: &OrderingEngine, request: OrderRequest) -> Result<Value, CommandError> {
	let mut session = engine.open_session();
	if session.owner_id().is_none() {
		return Err(CommandError::Input(
			"session.owner_id must be set to submit orders".into(),
		));
	}

	session.continue_from_welcome().await;
	if let Some(error) = &session.state().error {
		return Err(CommandError::Drafts(error.clone()));
	}
	session.save_key_details(&request.key_details).await?;
	session.save_instructions(&request.instructions).await?;

	let mut review = request.review;
	if request.promo_code.is_some() {
		review.promo_code = request.promo_code;
	}
	// Validates the promo code before the step is stored
	session.save_review(&review).await?;

	let submitted = session.submit(review.terms_accepted).await?;
	to_json(&submitted)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, CommandError> {
	serde_json::to_value(value).map_err(|e| CommandError::Input(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::FactoryRegistry;
	use ordering_config::Config;

	fn engine() -> OrderingEngine {
		FactoryRegistry::with_defaults()
			.build_engine(Config::for_testing())
			.unwrap()
	}

	fn engine_with_promo() -> OrderingEngine {
		let config: Config = r#"
[session]
owner_id = "test-owner"

[catalog]
primary = "static"

[[catalog.implementations.static.promo_codes]]
code = "WELCOME10"
discount_type = "percentage"
value = 10

[drafts]
primary = "local"
[drafts.implementations.local]

[storage]
primary = "memory"
[storage.implementations.memory]
"#
		.parse()
		.unwrap();
		FactoryRegistry::with_defaults().build_engine(config).unwrap()
	}

	fn quote_args() -> QuoteArgs {
		QuoteArgs {
			level: AcademicLevel::Masters,
			service: ServiceType::Editing,
			deadline: DeadlineUrgency::Hours24,
			pages: 3,
			sources: 0,
			extras: vec!["top-writer".into(), "unknown".into()],
			promo: None,
		}
	}

	fn order_request(terms_accepted: bool) -> OrderRequest {
		serde_json::from_value(json!({
			"key_details": {
				"service_type": "writing",
				"academic_level": "undergraduate",
				"deadline_urgency": "7d",
				"subject_area": "Economics",
				"number_of_pages": 2,
				"number_of_sources": 0
			},
			"instructions": {
				"title": "Inflation since 2000",
				"instructions": "Compare three central banks."
			},
			"review": { "terms_accepted": terms_accepted }
		}))
		.unwrap()
	}

	#[tokio::test]
	async fn test_quote_command() {
		let value = run(&engine(), Command::Quote(quote_args())).await.unwrap();
		// 25.00 * 1.75 * 0.60 = 26.25 per page
		assert_eq!(value["price_per_page"], json!("26.25"));
		assert_eq!(value["extras_total"], json!("19.99"));
		assert_eq!(value["final_price"], json!("98.74"));
	}

	#[tokio::test]
	async fn test_quote_with_unknown_promo_fails() {
		let args = QuoteArgs {
			promo: Some("NOPE".into()),
			..quote_args()
		};
		assert!(matches!(
			run(&engine(), Command::Quote(args)).await,
			Err(CommandError::Session(SessionError::Promo(_)))
		));
	}

	#[tokio::test]
	async fn test_catalog_command() {
		let value = run(&engine(), Command::Catalog).await.unwrap();
		assert_eq!(value["extras"].as_array().map(Vec::len), Some(4));
	}

	#[tokio::test]
	async fn test_submit_then_list_show_and_delete() {
		let engine = engine();
		let submitted = submit(&engine, order_request(true)).await.unwrap();
		assert_eq!(submitted["is_draft"], json!(false));
		assert_eq!(submitted["pricing_breakdown"]["final_price"], json!("40.00"));
		let id = submitted["id"].as_str().unwrap().to_string();

		let listed = run(
			&engine,
			Command::Drafts(DraftsCommand::List { owner: None }),
		)
		.await
		.unwrap();
		assert_eq!(listed.as_array().map(Vec::len), Some(1));

		let shown = run(&engine, Command::Drafts(DraftsCommand::Show { id: id.clone() }))
			.await
			.unwrap();
		assert_eq!(shown["subject_area"], json!("Economics"));

		// Submitted orders cannot be resumed
		assert!(resume(&engine, &id).await.is_err());

		run(&engine, Command::Drafts(DraftsCommand::Delete { id: id.clone() }))
			.await
			.unwrap();
		assert!(run(&engine, Command::Drafts(DraftsCommand::Show { id }))
			.await
			.is_err());
	}

	#[tokio::test]
	async fn test_submit_with_promo_code() {
		let mut request = order_request(true);
		request.promo_code = Some("WELCOME10".into());
		let submitted = submit(&engine_with_promo(), request).await.unwrap();
		assert_eq!(submitted["promo_code"], json!("WELCOME10"));
		assert_eq!(submitted["pricing_breakdown"]["discount"], json!("4.00"));
		assert_eq!(submitted["pricing_breakdown"]["final_price"], json!("36.00"));

		let mut request = order_request(true);
		request.promo_code = Some("NOPE".into());
		assert!(matches!(
			submit(&engine_with_promo(), request).await,
			Err(CommandError::Session(SessionError::Promo(_)))
		));
	}

	#[tokio::test]
	async fn test_submit_requires_terms() {
		assert!(matches!(
			submit(&engine(), order_request(false)).await,
			Err(CommandError::Session(SessionError::Validation(_)))
		));
	}

	#[tokio::test]
	async fn test_resume_prints_state() {
		let engine = engine();
		let mut session = engine.open_session();
		session.continue_from_welcome().await;
		let id = session.state().submission_id.clone().unwrap();

		let value = resume(&engine, &id).await.unwrap();
		assert_eq!(value["state"]["current_step"], json!(1));
		assert_eq!(value["state"]["completed_steps"], json!([0]));
		assert_eq!(value["breakdown"]["final_price"], json!("20.00"));
	}

	#[tokio::test]
	async fn test_submit_reads_order_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("order.json");
		std::fs::write(&path, "{ not json").unwrap();
		assert!(matches!(
			run(&engine(), Command::Submit { file: path }).await,
			Err(CommandError::Input(_))
		));
	}
}
