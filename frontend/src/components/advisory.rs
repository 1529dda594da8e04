use shared::advisory::{
    self, GENERAL_GUIDELINES, HIGHLIGHTS, SEVERITY_HEADERS, SEVERITY_TABLE, Span,
};
use yew::prelude::*;

fn render_rich(text: &str) -> Html {
    advisory::emphasis_spans(text)
        .into_iter()
        .map(|span| match span {
            Span::Plain(text) => html! { <>{ text }</> },
            Span::Bold(text) => html! { <strong>{ text }</strong> },
            Span::Italic(text) => html! { <em>{ text }</em> },
        })
        .collect::<Html>()
}

fn render_list(items: &[&str]) -> Html {
    html! {
        <ul class="advisory-list">
            { for items.iter().map(|item| html! { <li>{ render_rich(item) }</li> }) }
        </ul>
    }
}

pub fn render_advisory() -> Html {
    html! {
        <div class="advisory">
            <h2>{ advisory::TITLE }</h2>

            <p><strong>{ advisory::GENERAL_GUIDELINES_TITLE }</strong></p>
            { render_list(&GENERAL_GUIDELINES) }

            <h4>{ advisory::SEVERITY_TITLE }</h4>
            <table class="advisory-table">
                <thead>
                    <tr>
                        { for SEVERITY_HEADERS.iter().map(|header| html! { <th>{ *header }</th> }) }
                    </tr>
                </thead>
                <tbody>
                    { for SEVERITY_TABLE.iter().map(|row| html! {
                        <tr>
                            <td>{ render_rich(row.pressure) }</td>
                            <td>{ render_rich(row.crop_stage) }</td>
                            <td>{ render_rich(row.recommendation) }</td>
                        </tr>
                    })}
                </tbody>
            </table>

            <p><strong>{ advisory::HIGHLIGHTS_TITLE }</strong></p>
            { render_list(&HIGHLIGHTS) }
        </div>
    }
}
