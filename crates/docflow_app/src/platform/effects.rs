use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;

use client_logging::{client_info, client_warn};
use docflow_client::{
    ClientCommand, ClientError, ClientEvent, ClientHandle, DocumentJob, OcrEngine,
    PollObservation, QueryAnswer, QueryRequest, ReqwestApi, UploadFile,
};
use docflow_core::{
    AnswerRecord, CitationView, Effect, ListedDocument, Msg, StatusObservation, UploadOutcome,
    WatchOutcome,
};

use super::config::AppConfig;

/// Bridges core effects to client commands and client events back to
/// core messages.
pub struct EffectRunner {
    handle: ClientHandle,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(msg_tx: mpsc::Sender<Msg>, config: &AppConfig) -> anyhow::Result<Self> {
        let api = Arc::new(ReqwestApi::new(config.api.clone())?);
        let (handle, events) = ClientHandle::spawn(api, config.poll_interval);
        spawn_event_loop(events, msg_tx.clone());
        Ok(Self { handle, msg_tx })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload {
                    job_id,
                    source,
                    filename,
                } => {
                    client_info!("StartUpload job_id={} file={}", job_id, filename);
                    match UploadFile::from_path(Path::new(&source)) {
                        Ok(file) => self.handle.send(ClientCommand::Upload { job_id, file }),
                        Err(err) => {
                            // The transfer never started; report it the
                            // same way a failed upload comes back.
                            let _ = self.msg_tx.send(Msg::UploadFinished {
                                job_id,
                                result: Err(err.to_string()),
                            });
                        }
                    }
                }
                Effect::BeginProcessing {
                    job_id,
                    document_id,
                    engines,
                } => {
                    client_info!("BeginProcessing job_id={} document={}", job_id, document_id);
                    self.handle.send(ClientCommand::Process {
                        job_id,
                        document_id,
                        engines: map_engines(&engines),
                    });
                }
                Effect::WatchStatus {
                    job_id,
                    document_id,
                } => {
                    client_info!("WatchStatus job_id={} document={}", job_id, document_id);
                    self.handle.send(ClientCommand::Watch {
                        job_id,
                        document_id,
                    });
                }
                Effect::CancelWatch { job_id } => {
                    client_info!("CancelWatch job_id={}", job_id);
                    self.handle.send(ClientCommand::CancelWatch { job_id });
                }
                Effect::RunQuery {
                    question,
                    document_ids,
                    top_k,
                } => {
                    let request = QueryRequest {
                        query: question,
                        document_ids: if document_ids.is_empty() {
                            None
                        } else {
                            Some(document_ids)
                        },
                        top_k,
                    };
                    self.handle.send(ClientCommand::Query { request });
                }
                Effect::LoadDocuments { skip, limit } => {
                    self.handle.send(ClientCommand::ListDocuments { skip, limit });
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.handle.shutdown();
    }
}

fn spawn_event_loop(events: mpsc::Receiver<ClientEvent>, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Ok(event) = events.recv() {
            let msg = match event {
                ClientEvent::UploadProgress { job_id, percent } => {
                    Msg::UploadProgress { job_id, percent }
                }
                ClientEvent::UploadFinished { job_id, result } => Msg::UploadFinished {
                    job_id,
                    result: result
                        .map(|job| UploadOutcome {
                            document_id: job.id,
                        })
                        .map_err(|err| err.to_string()),
                },
                ClientEvent::ProcessingStarted { job_id, result } => Msg::ProcessingStarted {
                    job_id,
                    result: result.map(|_ack| ()).map_err(|err| err.to_string()),
                },
                ClientEvent::StatusObserved {
                    job_id,
                    observation,
                } => Msg::StatusObserved {
                    job_id,
                    observation: map_observation(observation),
                },
                ClientEvent::WatchFinished { job_id, result } => Msg::WatchFinished {
                    job_id,
                    outcome: match result {
                        Ok(_report) => WatchOutcome::Terminal,
                        Err(ClientError::Cancelled) => WatchOutcome::Cancelled,
                        Err(err) => {
                            client_warn!("watch for job {} failed: {}", job_id, err);
                            WatchOutcome::Failed(err.to_string())
                        }
                    },
                },
                ClientEvent::QueryFinished { result } => Msg::QueryFinished {
                    result: result.map(map_answer).map_err(|err| err.to_string()),
                },
                ClientEvent::DocumentsListed { result } => Msg::DocumentsLoaded {
                    result: result
                        .map(|jobs| jobs.into_iter().map(map_listed).collect())
                        .map_err(|err| err.to_string()),
                },
                // Result fetches are driven outside the core loop.
                ClientEvent::ResultsFetched { .. } => Msg::NoOp,
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

fn map_engines(names: &[String]) -> Vec<OcrEngine> {
    names
        .iter()
        .filter_map(|name| match name.as_str() {
            "tesseract" => Some(OcrEngine::Tesseract),
            "paddleocr" => Some(OcrEngine::Paddleocr),
            "easyocr" => Some(OcrEngine::Easyocr),
            other => {
                client_warn!("unknown OCR engine {:?}; skipping", other);
                None
            }
        })
        .collect()
}

fn map_status(status: docflow_client::DocumentStatus) -> docflow_core::DocumentStatus {
    match status {
        docflow_client::DocumentStatus::Uploaded => docflow_core::DocumentStatus::Uploaded,
        docflow_client::DocumentStatus::Preprocessing => {
            docflow_core::DocumentStatus::Preprocessing
        }
        docflow_client::DocumentStatus::OcrProcessing => {
            docflow_core::DocumentStatus::OcrProcessing
        }
        docflow_client::DocumentStatus::TableExtraction => {
            docflow_core::DocumentStatus::TableExtraction
        }
        docflow_client::DocumentStatus::EmbeddingGeneration => {
            docflow_core::DocumentStatus::EmbeddingGeneration
        }
        docflow_client::DocumentStatus::Completed => docflow_core::DocumentStatus::Completed,
        docflow_client::DocumentStatus::Failed => docflow_core::DocumentStatus::Failed,
    }
}

fn map_observation(observation: PollObservation) -> StatusObservation {
    StatusObservation {
        status: map_status(observation.status),
        page_count: observation.page_count,
        table_count: observation.table_count,
        processing_secs: observation.processing_time,
        error_message: observation.error_message,
    }
}

fn map_answer(answer: QueryAnswer) -> AnswerRecord {
    AnswerRecord {
        question: answer.query,
        answer: answer.answer,
        confidence: answer.confidence,
        processing_secs: answer.processing_time,
        citations: answer
            .citations
            .into_iter()
            .map(|citation| CitationView {
                document_id: citation.document_id,
                page_number: citation.page_number,
                table_id: citation.table_id,
                snippet: citation.text_snippet,
                confidence: citation.confidence,
            })
            .collect(),
    }
}

fn map_listed(job: DocumentJob) -> ListedDocument {
    ListedDocument {
        document_id: job.id,
        filename: job.metadata.original_filename,
        size_bytes: job.metadata.file_size,
        status: map_status(job.status),
        page_count: job.metadata.page_count,
        table_count: job.metadata.table_count.max(job.table_count),
    }
}
