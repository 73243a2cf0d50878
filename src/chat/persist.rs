//! Background conversion of recorded audio into self-contained form
//!
//! Recordings are displayed right away from an ephemeral handle. Turning the
//! raw bytes into a `data:` URL happens on a worker thread with its own tokio
//! runtime; the finished [`Message`] comes back over a channel and the UI
//! thread persists it.

use crate::audio::AudioArtifact;
use crate::messages::{data_url, Message, Sender};
use crate::{PolypalError, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, Sender as ChannelSender, TrySendError,
};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// A recording waiting to be encoded and stored
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    /// Conversation the message belongs to, fixed when it was rendered
    pub partner: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub artifact: AudioArtifact,
}

impl ConversionJob {
    fn into_message(self, data_url: String) -> Message {
        Message::audio(self.sender, data_url, self.artifact.duration_ms)
            .with_timestamp(self.timestamp)
    }
}

#[derive(Debug, Clone)]
pub enum ConversionEvent {
    Ready { partner: String, message: Message },
    Failed { partner: String, error: PolypalError },
}

/// Encode an artifact as a `data:` URL off the calling task
pub async fn encode_artifact(artifact: AudioArtifact) -> Result<String> {
    if artifact.is_empty() {
        return Err(PolypalError::EncodingFailure("Empty audio payload".into()));
    }

    tokio::task::spawn_blocking(move || data_url::encode(&artifact.mime, &artifact.bytes))
        .await
        .map_err(|e| PolypalError::EncodingFailure(format!("Conversion task failed: {}", e)))
}

/// Handle to the conversion worker thread
pub struct ConversionWorker {
    job_tx: Option<ChannelSender<ConversionJob>>,
    event_rx: Receiver<ConversionEvent>,
    worker_handle: Option<JoinHandle<()>>,
}

impl ConversionWorker {
    /// Spawn the worker with room for `queue` pending jobs
    pub fn start(queue: usize) -> Result<Self> {
        let (job_tx, job_rx) = bounded::<ConversionJob>(queue.max(1));
        let (event_tx, event_rx) = unbounded::<ConversionEvent>();

        let worker_handle = std::thread::Builder::new()
            .name("audio-conversion".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(worker_loop(job_rx, event_tx));
            })
            .map_err(|e| {
                PolypalError::ChannelError(format!("Failed to spawn conversion worker: {}", e))
            })?;

        Ok(Self {
            job_tx: Some(job_tx),
            event_rx,
            worker_handle: Some(worker_handle),
        })
    }

    pub fn submit(&self, job: ConversionJob) -> Result<()> {
        let tx = self
            .job_tx
            .as_ref()
            .ok_or_else(|| PolypalError::ChannelError("Conversion worker stopped".into()))?;

        tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => PolypalError::ChannelError("Conversion queue full".into()),
            TrySendError::Disconnected(_) => {
                PolypalError::ChannelError("Conversion worker stopped".into())
            }
        })
    }

    /// Drain finished conversions without blocking
    pub fn try_events(&self) -> Vec<ConversionEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next finished conversion.
    ///
    /// `Ok(None)` means the timeout passed; an error means the worker is gone
    /// and nothing more will arrive.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<Option<ConversionEvent>> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PolypalError::ChannelError(
                "Conversion worker stopped".into(),
            )),
        }
    }

    /// Stop accepting jobs and wait for the worker to finish queued ones
    pub fn shutdown(&mut self) {
        self.job_tx = None;
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                warn!("Conversion worker panicked");
            }
        }
    }
}

impl Drop for ConversionWorker {
    fn drop(&mut self) {
        // Anything still queued is dropped with the session
        self.job_tx = None;
        self.worker_handle.take();
    }
}

async fn worker_loop(job_rx: Receiver<ConversionJob>, event_tx: ChannelSender<ConversionEvent>) {
    info!("Audio conversion worker started");

    while let Ok(job) = job_rx.recv() {
        debug!(
            "Converting {} byte recording for {:?}",
            job.artifact.len(),
            job.partner
        );

        let event = match encode_artifact(job.artifact.clone()).await {
            Ok(url) => ConversionEvent::Ready {
                partner: job.partner.clone(),
                message: job.into_message(url),
            },
            Err(error) => ConversionEvent::Failed {
                partner: job.partner,
                error,
            },
        };

        if event_tx.send(event).is_err() {
            debug!("Event channel closed");
            break;
        }
    }

    info!("Audio conversion worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn job(bytes: Vec<u8>) -> ConversionJob {
        ConversionJob {
            partner: "Ana".to_string(),
            sender: Sender::User,
            timestamp: Utc::now(),
            artifact: AudioArtifact::new("audio/wav", bytes, Some(2500)),
        }
    }

    #[tokio::test]
    async fn test_encode_artifact() {
        let url = encode_artifact(AudioArtifact::new("audio/wav", vec![1, 2, 3], None))
            .await
            .unwrap();
        assert_eq!(url, "data:audio/wav;base64,AQID");
    }

    #[tokio::test]
    async fn test_encode_empty_artifact_fails() {
        let result = encode_artifact(AudioArtifact::new("audio/wav", Vec::new(), None)).await;
        assert!(matches!(result, Err(PolypalError::EncodingFailure(_))));
    }

    #[test]
    fn test_worker_produces_message() {
        let worker = ConversionWorker::start(4).unwrap();
        worker.submit(job(vec![9, 9, 9])).unwrap();

        match worker.recv_timeout(Duration::from_secs(5)) {
            Ok(Some(ConversionEvent::Ready { partner, message })) => {
                assert_eq!(partner, "Ana");
                assert_eq!(message.sender, Sender::User);
                assert_eq!(
                    message.body,
                    crate::messages::MessageBody::Audio {
                        data_url: "data:audio/wav;base64,CQkJ".to_string(),
                        duration: Some(2500),
                    }
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_worker_reports_failures() {
        let worker = ConversionWorker::start(4).unwrap();
        worker.submit(job(Vec::new())).unwrap();

        assert!(matches!(
            worker.recv_timeout(Duration::from_secs(5)),
            Ok(Some(ConversionEvent::Failed { .. }))
        ));
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut worker = ConversionWorker::start(1).unwrap();
        worker.shutdown();
        assert!(worker.submit(job(vec![1])).is_err());
    }

    #[test]
    fn test_recv_after_shutdown_reports_stopped_worker() {
        let mut worker = ConversionWorker::start(1).unwrap();
        worker.shutdown();
        assert!(matches!(
            worker.recv_timeout(Duration::from_secs(5)),
            Err(PolypalError::ChannelError(_))
        ));
    }

    #[test]
    fn test_recv_times_out_while_idle() {
        let worker = ConversionWorker::start(1).unwrap();
        assert!(matches!(
            worker.recv_timeout(Duration::from_millis(20)),
            Ok(None)
        ));
    }
}
