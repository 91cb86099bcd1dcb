mod auth;
mod chat;
mod cli;
mod config;
mod gate;
mod i18n;
mod portal;
mod role;
mod session;
mod state;
mod transcript;
mod views;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marine-portal", about = "Role-gated marine research data portal")]
pub struct Args {
    #[arg(long, value_name = "PAGE", help = "Render one page (name or /path) and exit")]
    pub page: Option<String>,

    #[arg(long, env = "MARINE_PORTAL_STORAGE", help = "Session storage file")]
    pub storage: Option<PathBuf>,

    #[arg(long, env = "MARINE_PORTAL_LANG", help = "Display language: en, ml")]
    pub lang: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Run transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Seed for simulated figures")]
    pub seed: Option<u64>,

    #[arg(long, help = "Enable tracing of gate decisions")]
    pub trace: bool,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config, using defaults: {}", e);
            config::Config::default()
        })
    };

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} errors)",
            errors.len()
        ));
    }

    let language = match &args.lang {
        Some(lang) => i18n::Language::from_str(lang)
            .ok_or_else(|| anyhow::anyhow!("Invalid language: {}. Use: en, ml", lang))?,
        None => cfg.language(),
    };

    let storage_path = args.storage.clone().unwrap_or_else(|| cfg.storage_path());
    let sessions = session::SessionStore::new(
        session::FileStore::new(&storage_path),
        &cfg.storage.session_key,
    );
    let portal = portal::Portal::start(sessions, language);

    let transcripts_dir = args.transcripts_dir.clone().unwrap_or_else(|| {
        storage_path
            .parent()
            .map(|p| p.join("runs"))
            .unwrap_or_else(|| PathBuf::from(config::CONFIG_DIR).join("runs"))
    });
    std::fs::create_dir_all(&transcripts_dir)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let transcript_path = transcripts_dir.join(format!("{}.jsonl", run_id));
    let mut transcript = transcript::Transcript::new(&transcript_path, &run_id)?;
    let _ = transcript.run_start(
        &storage_path,
        portal.state().session.is_logged_in(),
        portal.state().page,
    );

    if let Some(reason) = portal.discarded_session() {
        let _ = transcript.notice("session", reason);
    }

    if args.verbose {
        eprintln!("[VERBOSE] Storage: {}", storage_path.display());
        eprintln!("[VERBOSE] Transcript: {}", transcript_path.display());
        if let Some(reason) = portal.discarded_session() {
            eprintln!("[VERBOSE] Stored session discarded: {}", reason);
        }
    }

    let chat = chat::ChatWidget::new(
        cfg.chat.compile_rules()?,
        cfg.chat.reply_delay(),
        cfg.chat.max_image_bytes,
    );
    let geolocator = chat::FixedGeolocator::new(cfg.chat.location());
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let trace = args.trace;
    let ctx = cli::Context {
        args,
        run_id,
        config: cfg,
        transcript: RefCell::new(transcript),
        portal: RefCell::new(portal),
        auth: auth::TrustOnSubmit::new(auth::SystemClock),
        chat: RefCell::new(chat),
        geolocator,
        rng: RefCell::new(rng),
        last_frame: RefCell::new(None),
        tracing: RefCell::new(trace),
    };

    if let Some(page) = ctx.args.page.clone() {
        cli::run_once(&ctx, &page)
    } else {
        cli::run_repl(ctx)
    }
}
