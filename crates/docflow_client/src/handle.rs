use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use client_logging::{client_info, client_warn};
use tokio_util::sync::CancellationToken;

use crate::poll::StatusPoller;
use crate::query::QueryClient;
use crate::transport::DocumentApi;
use crate::upload::{UploadFile, UploadTracker};
use crate::{
    ClientError, DocumentJob, DocumentResults, OcrEngine, PollObservation, ProcessingAck,
    QueryAnswer, QueryRequest, StatusReport,
};

/// Caller-side job identity used to tag commands and events.
pub type JobId = u64;

pub enum ClientCommand {
    Upload {
        job_id: JobId,
        file: UploadFile,
    },
    Process {
        job_id: JobId,
        document_id: String,
        engines: Vec<OcrEngine>,
    },
    Watch {
        job_id: JobId,
        document_id: String,
    },
    CancelWatch {
        job_id: JobId,
    },
    FetchResults {
        job_id: JobId,
        document_id: String,
    },
    Query {
        request: QueryRequest,
    },
    ListDocuments {
        skip: u32,
        limit: u32,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum ClientEvent {
    UploadProgress {
        job_id: JobId,
        percent: u8,
    },
    UploadFinished {
        job_id: JobId,
        result: Result<DocumentJob, ClientError>,
    },
    ProcessingStarted {
        job_id: JobId,
        result: Result<ProcessingAck, ClientError>,
    },
    StatusObserved {
        job_id: JobId,
        observation: PollObservation,
    },
    WatchFinished {
        job_id: JobId,
        result: Result<StatusReport, ClientError>,
    },
    ResultsFetched {
        job_id: JobId,
        result: Result<DocumentResults, ClientError>,
    },
    QueryFinished {
        result: Result<QueryAnswer, ClientError>,
    },
    DocumentsListed {
        result: Result<Vec<DocumentJob>, ClientError>,
    },
}

type WatchMap = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

fn lock_watches(
    watches: &Mutex<HashMap<JobId, CancellationToken>>,
) -> MutexGuard<'_, HashMap<JobId, CancellationToken>> {
    match watches.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Bridge between the synchronous caller and the async client: commands
/// go in over a channel, events come back over another, and a dedicated
/// thread owns the tokio runtime.
///
/// Every watch gets a cancellation token, registered before the loop is
/// spawned; `CancelWatch` and `Shutdown` cancel them, so no poll loop
/// outlives the handle.
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
}

impl ClientHandle {
    pub fn spawn(
        api: Arc<dyn DocumentApi>,
        poll_interval: Duration,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let watches: WatchMap = Arc::new(Mutex::new(HashMap::new()));

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    ClientCommand::Watch {
                        job_id,
                        document_id,
                    } => {
                        let token = CancellationToken::new();
                        {
                            let mut map = lock_watches(&watches);
                            if map.contains_key(&job_id) {
                                // One poll loop per job id; a duplicate
                                // is a caller bug, not something to
                                // stack.
                                client_warn!("watch already active for job {job_id}; ignoring");
                                continue;
                            }
                            map.insert(job_id, token.clone());
                        }
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        let watches = watches.clone();
                        runtime.spawn(async move {
                            let poller = StatusPoller::with_interval(api, poll_interval);
                            let observer_tx = event_tx.clone();
                            let result = poller
                                .run(&document_id, &token, move |observation| {
                                    let _ = observer_tx.send(ClientEvent::StatusObserved {
                                        job_id,
                                        observation,
                                    });
                                })
                                .await;
                            lock_watches(&watches).remove(&job_id);
                            let _ =
                                event_tx.send(ClientEvent::WatchFinished { job_id, result });
                        });
                    }
                    ClientCommand::CancelWatch { job_id } => {
                        if let Some(token) = lock_watches(&watches).get(&job_id) {
                            token.cancel();
                        }
                    }
                    ClientCommand::Shutdown => {
                        client_info!("client handle shutting down");
                        break;
                    }
                    command => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_command(api, command, event_tx).await;
                        });
                    }
                }
            }

            // Cancel anything still polling, whether we broke out of the
            // loop or the command side hung up.
            for (_, token) in lock_watches(&watches).drain() {
                token.cancel();
            }
            runtime.shutdown_timeout(Duration::from_secs(2));
        });

        (Self { cmd_tx }, event_rx)
    }

    pub fn send(&self, command: ClientCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Shutdown);
    }
}

async fn run_command(
    api: Arc<dyn DocumentApi>,
    command: ClientCommand,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    match command {
        ClientCommand::Upload { job_id, file } => {
            let tracker = UploadTracker::new(api);
            let progress_tx = event_tx.clone();
            let result = tracker
                .upload(file, move |percent| {
                    let _ = progress_tx.send(ClientEvent::UploadProgress { job_id, percent });
                })
                .await;
            let _ = event_tx.send(ClientEvent::UploadFinished { job_id, result });
        }
        ClientCommand::Process {
            job_id,
            document_id,
            engines,
        } => {
            let result = api.start_processing(&document_id, &engines).await;
            let _ = event_tx.send(ClientEvent::ProcessingStarted { job_id, result });
        }
        ClientCommand::FetchResults {
            job_id,
            document_id,
        } => {
            let result = api.fetch_results(&document_id).await;
            let _ = event_tx.send(ClientEvent::ResultsFetched { job_id, result });
        }
        ClientCommand::Query { request } => {
            let client = QueryClient::new(api);
            let result = client
                .ask(request.query, request.document_ids, request.top_k)
                .await;
            let _ = event_tx.send(ClientEvent::QueryFinished { result });
        }
        ClientCommand::ListDocuments { skip, limit } => {
            let result = api.list_documents(skip, limit).await;
            let _ = event_tx.send(ClientEvent::DocumentsListed { result });
        }
        // Handled synchronously by the command thread.
        ClientCommand::Watch { .. }
        | ClientCommand::CancelWatch { .. }
        | ClientCommand::Shutdown => {}
    }
}
