use shared::advisory::CREDITS;
use yew::prelude::*;

pub fn render_footer() -> Html {
    html! {
        <footer class="app-footer">
            <hr />
            <div class="developed-by">{"Developed by"}</div>
            { for CREDITS.iter().map(|credit| html! {
                <div class="person"><b>{ credit.name }</b>{ format!(" - {}", credit.role) }</div>
            })}
        </footer>
    }
}
