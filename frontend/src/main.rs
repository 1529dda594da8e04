mod api;
mod components;

use components::{advisory, footer, handlers, header, preview_area, results, upload_section, utils};
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::PredictionResponse;
use web_sys::DragEvent;
use yew::prelude::*;

// Models
pub struct FileData {
    pub file: GlooFile,
    pub preview_url: ObjectUrl,
}

// Yew msg components
pub enum Msg {
    // File operations
    FileSelected(GlooFile),

    // Analysis operations
    InferenceResult(u64, PredictionResponse),
    InferenceFailed(u64, String),

    // UI states
    SetError(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
}

// Main component
pub struct Model {
    pub upload: Option<FileData>,
    pub result: Option<PredictionResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_dragging: bool,
    /// Bumped on every upload so answers for a replaced image are dropped.
    pub request_seq: u64,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            upload: None,
            result: None,
            loading: false,
            error: None,
            is_dragging: false,
            request_seq: 0,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, ctx, file),

            Msg::InferenceResult(seq, response) => {
                handlers::handle_inference_result(self, seq, response)
            }
            Msg::InferenceFailed(seq, error) => handlers::handle_inference_failed(self, seq, error),

            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { header::render_header() }

                <main class="main-content columns">
                    <section class="column">
                        <h2>{"Upload an Image"}</h2>
                        { upload_section::render_upload_section(self, ctx) }
                        { utils::render_error_message(self) }
                        { preview_area::render_preview_area(self) }
                        { results::render_results(self) }
                    </section>
                    <section class="column">
                        { advisory::render_advisory() }
                    </section>
                </main>

                { footer::render_footer() }
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
