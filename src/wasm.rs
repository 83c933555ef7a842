use wasm_bindgen::prelude::*;

/// Run one calculation from a JSON config and hand the tagged result to JS
#[wasm_bindgen]
pub fn run_calculation(config_json: &str) -> Result<JsValue, JsValue> {
    // Set up better panic messages
    console_error_panic_hook::set_once();

    let config = crate::Config::from_json_str(config_json)
        .map_err(|e| JsValue::from_str(&format!("Config error: {}", e)))?;

    let calculation = crate::CapacityEngine::standard().calculate(&config);

    Ok(serde_wasm_bindgen::to_value(&calculation)?)
}
