use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use docflow_client::{ClientCommand, ClientEvent, ClientHandle, ReqwestApi};
use docflow_core::{update, AppState, FileSpec, Msg};

use super::config::{self, AppConfig};
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::persistence;
use super::render;

#[derive(Debug, Parser)]
#[command(name = "docflow", about = "Document processing pipeline client", version)]
pub struct Cli {
    /// Also log to the terminal, not only ./docflow.log.
    #[arg(long, global = true)]
    pub log_terminal: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload files, process them and watch progress to completion.
    Run {
        files: Vec<PathBuf>,
        /// OCR engines to request; default lets the server decide.
        #[arg(long = "engine", value_enum)]
        engines: Vec<EngineArg>,
    },
    /// Start processing for an already uploaded document.
    Process {
        document_id: String,
        #[arg(long = "engine", value_enum)]
        engines: Vec<EngineArg>,
    },
    /// Watch an in-flight document until it reaches a terminal status.
    Watch {
        document_id: String,
        /// Stop watching after this many seconds.
        #[arg(long = "for", value_name = "SECONDS")]
        for_secs: Option<u64>,
    },
    /// List your uploaded documents.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Ask a question across completed documents.
    Query {
        question: String,
        /// Restrict the search to specific document ids.
        #[arg(long = "document", value_name = "ID")]
        documents: Vec<String>,
        #[arg(long, default_value_t = 5)]
        top_k: u32,
    },
    /// Fetch OCR and table results for a completed document.
    Results {
        document_id: String,
        /// Export the results as JSON into this directory.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EngineArg {
    Tesseract,
    Paddleocr,
    Easyocr,
}

impl EngineArg {
    fn as_str(self) -> &'static str {
        match self {
            EngineArg::Tesseract => "tesseract",
            EngineArg::Paddleocr => "paddleocr",
            EngineArg::Easyocr => "easyocr",
        }
    }
}

fn engine_names(engines: &[EngineArg]) -> Vec<String> {
    engines.iter().map(|e| e.as_str().to_string()).collect()
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(if cli.log_terminal {
        LogDestination::Both
    } else {
        LogDestination::File
    });
    let config = config::load();

    match cli.command {
        Command::Run { files, engines } => run_pipeline(config, files, engines),
        Command::Process {
            document_id,
            engines,
        } => run_process(config, document_id, engines),
        Command::Watch {
            document_id,
            for_secs,
        } => run_watch(config, document_id, for_secs),
        Command::List { skip, limit } => run_list(config, skip, limit),
        Command::Query {
            question,
            documents,
            top_k,
        } => run_query(config, question, documents, top_k),
        Command::Results { document_id, out } => run_results(config, document_id, out),
    }
}

fn step(state: AppState, msg: Msg, runner: &EffectRunner) -> AppState {
    let (state, effects) = update(state, msg);
    runner.enqueue(effects);
    state
}

fn render_if_dirty(state: &mut AppState) {
    if state.consume_dirty() {
        render::render(&state.view());
    }
}

fn run_pipeline(
    config: AppConfig,
    files: Vec<PathBuf>,
    engines: Vec<EngineArg>,
) -> anyhow::Result<()> {
    if files.is_empty() {
        bail!("no files given");
    }
    let mut specs = Vec::new();
    for path in &files {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        specs.push(FileSpec {
            source: path.to_string_lossy().into_owned(),
            filename,
            size_bytes: meta.len(),
        });
    }

    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(msg_tx, &config)?;
    let mut state = AppState::with_engines(engine_names(&engines));

    let restored = persistence::load_session(&config.session_dir);
    if !restored.is_empty() {
        state = step(state, Msg::RestoreDocuments(restored), &runner);
    }
    state = step(state, Msg::FilesChosen(specs), &runner);
    if let Some(intake) = &state.view().last_intake {
        for (filename, reason) in &intake.rejected {
            println!("skipped {filename}: {reason}");
        }
    }
    render_if_dirty(&mut state);

    while !state.view().all_settled {
        let msg = msg_rx.recv().context("client event channel closed")?;
        state = step(state, msg, &runner);
        render_if_dirty(&mut state);
    }

    persistence::save_session(&config.session_dir, &state.completed_snapshots());
    runner.shutdown();
    render::render_summary(&state.view());
    Ok(())
}

fn run_process(
    config: AppConfig,
    document_id: String,
    engines: Vec<EngineArg>,
) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(msg_tx, &config)?;
    let mut state = AppState::new();

    state = step(
        state,
        Msg::AdoptDocument {
            document_id,
            filename: None,
        },
        &runner,
    );
    state = step(
        state,
        Msg::ProcessingRequested {
            job_id: 1,
            engines: engine_names(&engines),
        },
        &runner,
    );
    render_if_dirty(&mut state);

    while !state.view().all_settled {
        let msg = msg_rx.recv().context("client event channel closed")?;
        state = step(state, msg, &runner);
        render_if_dirty(&mut state);
    }

    runner.shutdown();
    render::render_summary(&state.view());
    Ok(())
}

fn run_watch(
    config: AppConfig,
    document_id: String,
    for_secs: Option<u64>,
) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(msg_tx, &config)?;
    let mut state = AppState::new();

    state = step(
        state,
        Msg::AdoptDocument {
            document_id,
            filename: None,
        },
        &runner,
    );
    state = step(state, Msg::WatchRequested { job_id: 1 }, &runner);
    render_if_dirty(&mut state);

    let mut deadline = for_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        let msg = match deadline {
            Some(when) => {
                let remaining = when.saturating_duration_since(Instant::now());
                match msg_rx.recv_timeout(remaining) {
                    Ok(msg) => msg,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        // Watch budget spent; cancel and wait for the
                        // loop to confirm.
                        deadline = None;
                        Msg::ShutdownRequested
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        bail!("client event channel closed")
                    }
                }
            }
            None => msg_rx.recv().context("client event channel closed")?,
        };
        let watch_ended = matches!(msg, Msg::WatchFinished { .. });
        state = step(state, msg, &runner);
        render_if_dirty(&mut state);
        if watch_ended {
            break;
        }
    }

    runner.shutdown();
    Ok(())
}

fn run_list(config: AppConfig, skip: u32, limit: u32) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(msg_tx, &config)?;
    let mut state = AppState::new();

    state = step(state, Msg::RefreshRequested { skip, limit }, &runner);
    loop {
        let msg = msg_rx.recv().context("client event channel closed")?;
        let listed = matches!(msg, Msg::DocumentsLoaded { .. });
        state = step(state, msg, &runner);
        if listed {
            break;
        }
    }

    runner.shutdown();
    let view = state.view();
    if let Some(message) = &view.last_session_error {
        bail!("{message}");
    }
    render::render_listing(&view);
    Ok(())
}

fn run_query(
    config: AppConfig,
    question: String,
    documents: Vec<String>,
    top_k: u32,
) -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(msg_tx, &config)?;
    let mut state = AppState::new();

    state = step(
        state,
        Msg::QuerySubmitted {
            question,
            document_ids: documents,
            top_k,
        },
        &runner,
    );
    loop {
        let msg = msg_rx.recv().context("client event channel closed")?;
        let answered = matches!(msg, Msg::QueryFinished { .. });
        state = step(state, msg, &runner);
        if answered {
            break;
        }
    }

    runner.shutdown();
    let view = state.view();
    if let Some(message) = &view.last_session_error {
        bail!("{message}");
    }
    match view.history.last() {
        Some(record) => render::render_answer(record),
        None => bail!("no answer received"),
    }
    Ok(())
}

/// Result fetches bypass the state machine: one command, one response.
fn run_results(
    config: AppConfig,
    document_id: String,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let api = std::sync::Arc::new(ReqwestApi::new(config.api.clone())?);
    let (handle, events) = ClientHandle::spawn(api, config.poll_interval);
    handle.send(ClientCommand::FetchResults {
        job_id: 1,
        document_id,
    });

    let results = loop {
        match events.recv().context("client event channel closed")? {
            ClientEvent::ResultsFetched { result, .. } => break result?,
            _ => {}
        }
    };

    render::render_results(&results);
    if let Some(dir) = out {
        let path = persistence::export_results(&dir, &results)?;
        println!("exported to {}", path.display());
    }
    handle.shutdown();
    Ok(())
}
