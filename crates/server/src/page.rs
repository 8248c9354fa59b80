//! Server-rendered HTML: the form page and the two result cards.

use serde_json::json;
use server_api::form::{field_spec, FieldSpec, Widget, SECTIONS};
use shared::protocol::{RiskClass, SESSION_STORE_KEY};

pub const TITLE: &str = "Heart Failure Predictor";
const BRAND_HREF: &str = "https://heart-fail-pred.herokuapp.com";
const THEME_CSS: &str = "https://cdn.jsdelivr.net/npm/bootswatch@5.3.3/dist/minty/bootstrap.min.css";
const BOOTSTRAP_JS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js";
const LEAD: &str = "Use this machine learning model for early detection of heart failure in \
                    patients with cardiovascular disease or who are at high cardiovascular risk.";

pub const STORE_ROUTE: &str = "/api/store";
pub const EVALUATE_ROUTE: &str = "/api/evaluate";

pub fn image_for(risk: RiskClass) -> &'static str {
    match risk {
        RiskClass::NotAtRisk => "/assets/images/healthy-heart.svg",
        RiskClass::AtRisk => "/assets/images/unhealthy-heart.svg",
    }
}

/// One of the two fixed result cards.
pub fn result_panel(risk: RiskClass) -> String {
    format!(
        concat!(
            r#"<div class="card g-0 d-flex align-items-center" data-risk="{risk}">"#,
            r#"<img src="{src}" class="card-img-top" style="width: 45%" alt="">"#,
            r#"<div class="card-body"><h5 class="card-text">{message}</h5></div>"#,
            "</div>"
        ),
        risk = risk,
        src = image_for(risk),
        message = escape_html(risk.message()),
    )
}

pub fn render_index() -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str(&format!(
        concat!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
            "<title>{title}</title>\n",
            "<link rel=\"stylesheet\" href=\"{css}\">\n",
            "</head>\n<body>\n",
            "<nav class=\"navbar navbar-expand-md navbar-dark bg-primary\">",
            "<div class=\"container\">",
            "<a class=\"navbar-brand\" href=\"{href}\" style=\"font-size: 30px; font-weight: bold\">{title}</a>",
            "</div></nav>\n<br>\n",
            "<div class=\"container\"><h5 class=\"text-center\">{lead}</h5></div>\n<hr>\n",
            "<div class=\"container\"><div class=\"row\">\n<div class=\"col\">",
        ),
        title = TITLE,
        css = THEME_CSS,
        href = BRAND_HREF,
        lead = escape_html(LEAD),
    ));
    render_card(&mut html);
    html.push_str("</div>\n<div class=\"col\" id=\"output_display\"></div>\n</div></div>\n");
    render_scripts(&mut html);
    html.push_str("</body>\n</html>\n");
    html
}

fn render_card(html: &mut String) {
    html.push_str("<div class=\"card\"><div class=\"card-body\">\n");
    html.push_str("<ul class=\"nav nav-pills nav-fill\" id=\"card-tabs\" role=\"tablist\">\n");
    for (index, section) in SECTIONS.iter().enumerate() {
        html.push_str(&format!(
            concat!(
                "<li class=\"nav-item\" role=\"presentation\">",
                "<button class=\"nav-link{active}\" data-bs-toggle=\"pill\" ",
                "data-bs-target=\"#page-{n}\" type=\"button\" role=\"tab\">{title}</button></li>\n"
            ),
            active = if index == 0 { " active" } else { "" },
            n = index + 1,
            title = section.title,
        ));
    }
    html.push_str("</ul>\n<div class=\"tab-content\">\n");

    let last = SECTIONS.len() - 1;
    for (index, section) in SECTIONS.iter().enumerate() {
        html.push_str(&format!(
            "<div class=\"tab-pane fade{}\" id=\"page-{}\" role=\"tabpanel\"><br><form>\n",
            if index == 0 { " show active" } else { "" },
            index + 1,
        ));
        for (position, field) in section.fields.iter().enumerate() {
            if position > 0 {
                html.push_str("<br>\n");
            }
            render_question(html, field_spec(*field));
        }
        if index == last {
            html.push_str(concat!(
                "<br>\n<button id=\"submit-val\" type=\"button\" ",
                "class=\"btn btn-primary d-grid gap-2 col-3 mx-auto\">Submit</button>\n"
            ));
        }
        html.push_str("</form></div>\n");
    }
    html.push_str("</div>\n</div></div>\n");
}

fn render_question(html: &mut String, spec: &FieldSpec) {
    let id = spec.field.widget_id();
    html.push_str(&format!(
        "<div><label class=\"form-label\" for=\"{id}\">{}</label>\n",
        escape_html(spec.prompt),
    ));
    match spec.widget {
        Widget::Number => {
            // Every number widget has a domain; the attributes stay empty otherwise.
            let (min, max, step) = spec
                .field
                .numeric_domain()
                .map(|d| (d.min.to_string(), d.max.to_string(), d.step.to_string()))
                .unwrap_or_default();
            html.push_str(&format!(
                concat!(
                    "<input id=\"{id}\" class=\"form-control\" type=\"number\" ",
                    "min=\"{min}\" max=\"{max}\" step=\"{step}\" placeholder=\"{placeholder}\">\n"
                ),
                id = id,
                min = min,
                max = max,
                step = step,
                placeholder = escape_html(spec.placeholder),
            ));
        }
        Widget::Dropdown { options, .. } => {
            html.push_str(&format!(
                "<select id=\"{id}\" class=\"form-select\"><option value=\"\" selected>{}</option>\n",
                escape_html(spec.placeholder),
            ));
            for option in options {
                html.push_str(&format!(
                    "<option value=\"{}\">{}</option>\n",
                    escape_html(option.value),
                    escape_html(option.label),
                ));
            }
            html.push_str("</select>\n");
        }
    }
    html.push_str("</div>\n");
}

fn widget_config() -> serde_json::Value {
    let widgets: Vec<serde_json::Value> = SECTIONS
        .iter()
        .flat_map(|section| section.fields.iter())
        .map(|field| {
            let spec = field_spec(*field);
            match spec.widget {
                Widget::Number => json!({ "id": field.widget_id(), "kind": "number" }),
                Widget::Dropdown { numeric, .. } => {
                    json!({ "id": field.widget_id(), "kind": "select", "numeric": numeric })
                }
            }
        })
        .collect();
    json!({
        "storeKey": SESSION_STORE_KEY,
        "storeRoute": STORE_ROUTE,
        "evaluateRoute": EVALUATE_ROUTE,
        "widgets": widgets,
    })
}

fn render_scripts(html: &mut String) {
    html.push_str(&format!("<script src=\"{BOOTSTRAP_JS}\"></script>\n"));
    html.push_str(&format!("<script>const FORM = {};</script>\n", widget_config()));
    html.push_str("<script>\n");
    html.push_str(CLIENT_SCRIPT);
    html.push_str("</script>\n");
}

// Store writes and submit reads are chained on one promise so every event runs
// to completion, in order, before the next one starts.
const CLIENT_SCRIPT: &str = r##"
let nClicks = 0;
let chain = Promise.resolve();

function readValue(widget) {
  const el = document.getElementById(widget.id);
  if (el.value === "") return null;
  if (widget.kind === "number") {
    if (!el.checkValidity()) return null;
    const value = Number(el.value);
    return Number.isFinite(value) ? value : null;
  }
  return widget.numeric ? Number(el.value) : el.value;
}

async function postJson(route, body) {
  return fetch(route, {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
}

async function storeData() {
  const inputs = {};
  for (const widget of FORM.widgets) inputs[widget.id] = readValue(widget);
  const resp = await postJson(FORM.storeRoute, inputs);
  if (!resp.ok) {
    console.error("store update failed", resp.status);
    return;
  }
  sessionStorage.setItem(FORM.storeKey, JSON.stringify(await resp.json()));
}

async function makePrediction() {
  const stored = sessionStorage.getItem(FORM.storeKey);
  const resp = await postJson(FORM.evaluateRoute, {
    n_clicks: nClicks,
    data: stored === null ? null : JSON.parse(stored),
  });
  if (resp.status === 204) return;
  if (!resp.ok) {
    console.error("prediction failed", resp.status);
    return;
  }
  document.getElementById("output_display").innerHTML = await resp.text();
}

function enqueue(step) {
  chain = chain.then(step).catch((err) => console.error(err));
}

for (const widget of FORM.widgets) {
  const el = document.getElementById(widget.id);
  el.addEventListener(widget.kind === "number" ? "input" : "change", () => enqueue(storeData));
}

document.getElementById("submit-val").addEventListener("click", () => {
  nClicks += 1;
  enqueue(makePrediction);
});

enqueue(storeData);
enqueue(makePrediction);
"##;

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
