use super::super::{FileData, Model, Msg};
use super::utils::extract_image_files;
use crate::api;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::PredictionResponse;
use wasm_bindgen_futures::spawn_local;
use web_sys::DragEvent;
use yew::prelude::*;

/// A new upload replaces the previous one and is classified right away.
pub fn handle_file_selected(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    model.request_seq += 1;
    model.error = None;
    model.result = None;
    model.loading = true;

    let preview_url = ObjectUrl::from(file.clone());
    model.upload = Some(FileData {
        file: file.clone(),
        preview_url,
    });

    send_analysis_request(ctx, model.request_seq, file);
    true
}

pub fn handle_inference_result(model: &mut Model, seq: u64, response: PredictionResponse) -> bool {
    if seq != model.request_seq {
        log::debug!("Dropping stale result for request {}", seq);
        return false;
    }
    model.result = Some(response);
    model.loading = false;
    true
}

pub fn handle_inference_failed(model: &mut Model, seq: u64, error: String) -> bool {
    if seq != model.request_seq {
        return false;
    }
    log::error!("Inference failed: {}", error);
    model.error = Some(error);
    model.loading = false;
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    let files = event
        .data_transfer()
        .and_then(|data_transfer| data_transfer.files())
        .map(|file_list| extract_image_files(&file_list))
        .unwrap_or_default();

    match files.into_iter().next() {
        Some(file) => ctx.link().send_message(Msg::FileSelected(file)),
        None => ctx.link().send_message(Msg::SetError(Some(
            "Only JPG, JPEG and PNG images are accepted.".into(),
        ))),
    }

    true
}

fn send_analysis_request(ctx: &Context<Model>, seq: u64, file: GlooFile) {
    let link = ctx.link().clone();
    spawn_local(async move {
        match api::classify(&file).await {
            Ok(response) => link.send_message(Msg::InferenceResult(seq, response)),
            Err(e) => link.send_message(Msg::InferenceFailed(seq, e)),
        }
    });
}
