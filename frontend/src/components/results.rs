use super::super::Model;
use shared::Percent;
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    if model.loading {
        return html! {
            <div class="loading-preview">
                <i class="fa-solid fa-spinner fa-spin"></i>
                <p>{"Analyzing..."}</p>
            </div>
        };
    }

    let Some(result) = &model.result else {
        return html! {};
    };

    html! {
        <div class={classes!("results-container", if result.disease_finding { "disease-finding" } else { "healthy" })}>
            <div class="banner banner-success">
                <strong>{"Prediction:"}</strong>{ format!(" {}", result.headline) }
            </div>
            <div class="banner banner-info">
                <strong>{"Confidence:"}</strong>{ format!(" {}", result.confidence_text()) }
            </div>
            <div class="detailed-results">
                <h3>{"Class Probabilities"}</h3>
                <div class="result-bars">
                    { for result.predictions.iter().enumerate().map(|(i, &v)| {
                        let class_name = result
                            .class_labels
                            .get(i)
                            .map(String::as_str)
                            .unwrap_or("Unknown Class");
                        let percentage = v * 100.0;
                        html! {
                            <div class="result-item">
                                <div class="result-label">{ class_name }</div>
                                <div class="result-bar-container">
                                    <div class="result-bar" style={format!("width: {}%", percentage)}></div>
                                </div>
                                <div class="result-value">{ Percent(percentage).to_string() }</div>
                            </div>
                        }
                    })}
                </div>
            </div>
        </div>
    }
}
