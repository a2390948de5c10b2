//! Request shapes for the images endpoints. Parameters the selected model
//! does not accept, or that are left on `auto`, are omitted entirely.

use serde_json::{json, Value};

use crate::models::{
    EditRequest, GenerationRequest, GptQuality, GptSize, ModelParams,
};

pub fn generation_payload(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "model": request.model.as_str(),
        "prompt": request.prompt,
        "n": 1,
    });
    for (key, value) in param_fields(&request.params) {
        body[key] = json!(value);
    }
    if matches!(request.params, ModelParams::DallE3 { .. }) {
        body["response_format"] = json!("b64_json");
    }
    body
}

/// Text fields of the multipart edit form, images excluded.
pub fn edit_fields(request: &EditRequest) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("model", request.base.model.as_str().to_string()),
        ("prompt", request.base.prompt.clone()),
        ("n", "1".to_string()),
    ];
    fields.extend(param_fields(&request.base.params));
    fields
}

fn param_fields(params: &ModelParams) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    match params {
        ModelParams::DallE3 { quality, size } => {
            fields.push(("quality", quality.as_str().to_string()));
            if let Some(size) = size {
                fields.push(("size", size.as_str().to_string()));
            }
        }
        ModelParams::GptImage1 {
            quality,
            size,
            output_format,
            transparent,
        } => {
            if *quality != GptQuality::Auto {
                fields.push(("quality", quality.as_str().to_string()));
            }
            if *size != GptSize::Auto {
                fields.push(("size", size.as_str().to_string()));
            }
            fields.push(("output_format", output_format.as_str().to_string()));
            if *transparent {
                fields.push(("background", "transparent".to_string()));
            }
        }
    }
    fields
}
