use super::super::Model;
use yew::prelude::*;

pub fn render_preview_area(model: &Model) -> Html {
    let Some(upload) = &model.upload else {
        return html! {};
    };

    html! {
        <figure id="preview-container">
            <img id="actual-image-preview"
                src={upload.preview_url.to_string()}
                alt={upload.file.name()} />
            <figcaption>{"Uploaded Image"}</figcaption>
        </figure>
    }
}
