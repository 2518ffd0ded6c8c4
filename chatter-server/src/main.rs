use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, put, web};
use log::{error, info, warn};
use serde::Deserialize;

use chatter_core::source::JsonlSource;
use chatter_core::{ChatError, Config, DeadEnd, Engine, Message, Metric};

/// Default number of tokens generated when the query does not say.
const DEFAULT_LENGTH: usize = 30;

/// Default size of word lists.
const DEFAULT_LIMIT: usize = 15;

/// Server settings, read from the TOML file named by `CHATTER_CONFIG`
/// (default `chatter.toml`).
///
/// ```toml
/// host = "127.0.0.1"
/// port = 5000
/// corpus = "./data/chat.jsonl"
///
/// [chatter]
/// order = 6
/// ```
#[derive(Deserialize, Debug)]
#[serde(default)]
struct ServerConfig {
	host: String,
	port: u16,
	/// JSON-lines corpus used for the startup rebuild and `PUT /v1/rebuild`.
	corpus: Option<PathBuf>,
	/// Where to write a model snapshot after each rebuild.
	snapshot: Option<PathBuf>,
	chatter: Config,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_owned(),
			port: 5000,
			corpus: None,
			snapshot: None,
			chatter: Config::default(),
		}
	}
}

impl ServerConfig {
	fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
		if !path.exists() {
			warn!("{} not found, using default settings", path.display());
			return Ok(Self::default());
		}
		let config: ServerConfig = toml::from_str(&std::fs::read_to_string(path)?)?;
		config.chatter.validate()?;
		Ok(config)
	}
}

struct SharedData {
	engine: RwLock<Engine>,
	corpus: Option<PathBuf>,
	snapshot: Option<PathBuf>,
}

impl SharedData {
	fn read(&self) -> Result<RwLockReadGuard<'_, Engine>, HttpResponse> {
		self.engine.read().map_err(|_| HttpResponse::InternalServerError().body("Engine lock failed"))
	}

	fn write(&self) -> Result<RwLockWriteGuard<'_, Engine>, HttpResponse> {
		self.engine.write().map_err(|_| HttpResponse::InternalServerError().body("Engine lock failed"))
	}

	/// Rebuilds the engine from the corpus and writes the snapshot if configured.
	fn rebuild(&self, engine: &mut Engine) -> Result<String, ChatError> {
		let Some(corpus) = &self.corpus else {
			return Err(ChatError::InvalidConfiguration("no corpus configured".to_owned()));
		};
		let report = engine.rebuild(&JsonlSource::new(corpus))?;
		if let Some(snapshot) = &self.snapshot {
			engine.model().save(snapshot)?;
		}
		Ok(format!(
			"{} accepted, {} duplicates, {} skipped",
			report.accepted, report.duplicates, report.skipped
		))
	}
}

/// Maps a core error to an HTTP response.
fn error_response(e: ChatError) -> HttpResponse {
	match e {
		ChatError::UnknownUser { .. } | ChatError::NoDataForSpeaker { .. } => HttpResponse::NotFound().body(e.to_string()),
		ChatError::DivisionUndefined { .. } | ChatError::InvalidConfiguration(_) => {
			HttpResponse::UnprocessableEntity().body(e.to_string())
		}
		_ => {
			error!("request failed: {e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	speaker: String,
	length: Option<usize>,
	dead_end: Option<DeadEnd>,
}

#[derive(Deserialize)]
struct LimitQuery {
	limit: Option<usize>,
}

impl LimitQuery {
	fn limit(&self) -> usize {
		self.limit.unwrap_or(DEFAULT_LIMIT)
	}
}

#[derive(Deserialize)]
struct NameQuery {
	name: String,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates text in the style of `speaker`.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.generate(&query.speaker, query.length.unwrap_or(DEFAULT_LENGTH), query.dead_end) {
		Ok(text) => HttpResponse::Ok().body(text),
		Err(e) => error_response(e),
	}
}

/// HTTP POST endpoint `/v1/messages`
///
/// Ingests one message (JSON body) into the model and the statistics.
#[post("/v1/messages")]
async fn post_message(data: web::Data<SharedData>, message: web::Json<Message>) -> impl Responder {
	let mut engine = match data.write() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	HttpResponse::Ok().json(engine.ingest(&message))
}

#[put("/v1/rebuild")]
async fn put_rebuild(data: web::Data<SharedData>) -> impl Responder {
	let mut engine = match data.write() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match data.rebuild(&mut engine) {
		Ok(summary) => HttpResponse::Ok().body(summary),
		Err(e) => error_response(e),
	}
}

#[get("/v1/words")]
async fn get_words(data: web::Data<SharedData>, query: web::Query<LimitQuery>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	HttpResponse::Ok().json(engine.analytics().top_words(query.limit()))
}

#[get("/v1/words/{word}/users")]
async fn get_word_users(data: web::Data<SharedData>, word: web::Path<String>, query: web::Query<LimitQuery>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().top_users_for_word(&word, query.limit()) {
		Some(users) => HttpResponse::Ok().json(users),
		None => HttpResponse::NotFound().body(format!("Word never used: {word}")),
	}
}

#[get("/v1/users/{uid}/words")]
async fn get_user_words(data: web::Data<SharedData>, uid: web::Path<String>, query: web::Query<LimitQuery>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().words_for_user(&uid, query.limit()) {
		Ok(words) => HttpResponse::Ok().json(words),
		Err(e) => error_response(e),
	}
}

#[get("/v1/users/{uid}/likes_given")]
async fn get_likes_given(data: web::Data<SharedData>, uid: web::Path<String>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().likes_given(&uid) {
		Ok(summary) => HttpResponse::Ok().json(summary),
		Err(e) => error_response(e),
	}
}

#[get("/v1/users/{uid}/likes_received")]
async fn get_likes_received(data: web::Data<SharedData>, uid: web::Path<String>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().likes_received(&uid) {
		Ok(summary) => HttpResponse::Ok().json(summary),
		Err(e) => error_response(e),
	}
}

#[get("/v1/users/{uid}/self_likes")]
async fn get_self_likes(data: web::Data<SharedData>, uid: web::Path<String>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().self_like_count(&uid) {
		Ok(count) => HttpResponse::Ok().json(count),
		Err(e) => error_response(e),
	}
}

#[get("/v1/users/{uid}/ratio")]
async fn get_ratio(data: web::Data<SharedData>, uid: web::Path<String>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().ratio(&uid) {
		Ok(ratio) => HttpResponse::Ok().json(ratio),
		Err(e) => error_response(e),
	}
}

#[get("/v1/rank/{metric}/{uid}")]
async fn get_rank(data: web::Data<SharedData>, path: web::Path<(Metric, String)>) -> impl Responder {
	let (metric, uid) = path.into_inner();
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.analytics().rank(metric, &uid) {
		Ok(standing) => HttpResponse::Ok().json(standing),
		Err(e) => error_response(e),
	}
}

#[get("/v1/leaderboard/{metric}")]
async fn get_leaderboard(data: web::Data<SharedData>, metric: web::Path<Metric>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	HttpResponse::Ok().json(engine.analytics().leaderboard(metric.into_inner()))
}

#[get("/v1/lookup")]
async fn get_lookup(data: web::Data<SharedData>, query: web::Query<NameQuery>) -> impl Responder {
	let engine = match data.read() {
		Ok(engine) => engine,
		Err(response) => return response,
	};
	match engine.directory().id_of(&query.name) {
		Some(id) => HttpResponse::Ok().body(id.to_owned()),
		None => HttpResponse::NotFound().body(format!("Unknown name: {}", query.name)),
	}
}

/// Main entry point for the server.
///
/// Reads the settings, rebuilds the engine from the corpus if one is
/// configured, and serves the query surface. The engine sits behind a
/// `RwLock`: queries share it, ingestion and rebuilds take it exclusively.
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	let config_path = std::env::var("CHATTER_CONFIG").unwrap_or_else(|_| "chatter.toml".to_owned());
	let config = ServerConfig::load(Path::new(&config_path))?;

	let shared_data = web::Data::new(SharedData {
		engine: RwLock::new(Engine::new(config.chatter)?),
		corpus: config.corpus,
		snapshot: config.snapshot,
	});

	if shared_data.corpus.is_some() {
		let mut engine = shared_data.write().map_err(|_| "Engine lock failed")?;
		let summary = shared_data.rebuild(&mut engine)?;
		info!("startup rebuild: {summary}");
	}

	info!("listening on {}:{}", config.host, config.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(post_message)
			.service(put_rebuild)
			.service(get_words)
			.service(get_word_users)
			.service(get_user_words)
			.service(get_likes_given)
			.service(get_likes_received)
			.service(get_self_likes)
			.service(get_ratio)
			.service(get_rank)
			.service(get_leaderboard)
			.service(get_lookup)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await?;

	Ok(())
}
