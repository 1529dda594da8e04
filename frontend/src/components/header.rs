use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-leaf"></i> {" Maize Leaf Disease Classification Dashboard (MDM)"}</h1>
        </header>
    }
}
