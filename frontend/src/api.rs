use gloo_file::File as GlooFile;
use gloo_net::http::Request;
use shared::{ErrorResponse, PredictionResponse};

const INFERENCE_URL: &str = "/api/inference";

/// Posts one image as the `image` form field and returns the verdict.
pub async fn classify(file: &GlooFile) -> Result<PredictionResponse, String> {
    let form_data =
        web_sys::FormData::new().map_err(|e| format!("Failed to build form: {:?}", e))?;
    form_data
        .append_with_blob_and_filename("image", file.as_ref(), &file.name())
        .map_err(|e| format!("Failed to attach image: {:?}", e))?;

    let request = Request::post(INFERENCE_URL)
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?;

    let response = request
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if response.ok() {
        return response
            .json::<PredictionResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e));
    }

    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => Err(body.error),
        Err(_) => Err(format!("Server error: {} {}", status, response.status_text())),
    }
}
