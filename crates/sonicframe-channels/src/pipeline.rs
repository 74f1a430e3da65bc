//! The six stage channels wired together (spec §4.2).

use crate::channel::{stage_channel, StageReceiver, StageSender};
use crate::messages::{
    AudioAnalysisMessage, ConversionMessage, DownloadMessage, KeyframeExtractionMessage, UploadMessage,
    YoutubeDownloadMessage,
};

/// Sending half, held by the Job Manager (entrance channels) and by each
/// stage worker that hands off to the next stage.
#[derive(Clone)]
pub struct PipelineSenders {
    pub download: StageSender<DownloadMessage>,
    pub youtube_download: StageSender<YoutubeDownloadMessage>,
    pub conversion: StageSender<ConversionMessage>,
    pub audio_analysis: StageSender<AudioAnalysisMessage>,
    pub keyframe_extraction: StageSender<KeyframeExtractionMessage>,
    pub upload: StageSender<UploadMessage>,
}

/// Receiving half. Each field is cheap to clone so every worker in a
/// stage's pool can hold its own handle to the shared queue.
#[derive(Clone)]
pub struct PipelineReceivers {
    pub download: StageReceiver<DownloadMessage>,
    pub youtube_download: StageReceiver<YoutubeDownloadMessage>,
    pub conversion: StageReceiver<ConversionMessage>,
    pub audio_analysis: StageReceiver<AudioAnalysisMessage>,
    pub keyframe_extraction: StageReceiver<KeyframeExtractionMessage>,
    pub upload: StageReceiver<UploadMessage>,
}

pub fn build_pipeline_channels() -> (PipelineSenders, PipelineReceivers) {
    let (download_tx, download_rx) = stage_channel();
    let (youtube_tx, youtube_rx) = stage_channel();
    let (conversion_tx, conversion_rx) = stage_channel();
    let (audio_tx, audio_rx) = stage_channel();
    let (keyframe_tx, keyframe_rx) = stage_channel();
    let (upload_tx, upload_rx) = stage_channel();

    (
        PipelineSenders {
            download: download_tx,
            youtube_download: youtube_tx,
            conversion: conversion_tx,
            audio_analysis: audio_tx,
            keyframe_extraction: keyframe_tx,
            upload: upload_tx,
        },
        PipelineReceivers {
            download: download_rx,
            youtube_download: youtube_rx,
            conversion: conversion_rx,
            audio_analysis: audio_rx,
            keyframe_extraction: keyframe_rx,
            upload: upload_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicframe_models::JobId;

    #[tokio::test]
    async fn entrance_message_reaches_the_matching_receiver() {
        let (senders, receivers) = build_pipeline_channels();
        senders
            .download
            .send(DownloadMessage { job_id: JobId::new(), video_url: "https://example.com/a.mp4".into() })
            .unwrap();

        let received = receivers.download.recv().await.unwrap();
        assert_eq!(received.video_url, "https://example.com/a.mp4");
    }
}
