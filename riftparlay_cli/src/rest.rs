use serde_json::Value;

/// `(accepted, body)` - the server returns a JSON body either way.
pub type ApiResponse = Result<(bool, Value), reqwest::Error>;

pub fn get(base_uri: &str, path: &str) -> ApiResponse {
    let client = reqwest::blocking::Client::new();
    let res = client.get(&format!("{}{}", base_uri, path)).send()?;
    let ok = res.status().is_success();
    let body = res.json()?;
    Ok((ok, body))
}

pub fn post(base_uri: &str, path: &str, body: &Value) -> ApiResponse {
    let client = reqwest::blocking::Client::new();
    let res = client
        .post(&format!("{}{}", base_uri, path))
        .json(body)
        .send()?;
    let ok = res.status().is_success();
    let body = res.json()?;
    Ok((ok, body))
}

/// POST for routes that take no request body.
pub fn post_empty(base_uri: &str, path: &str) -> ApiResponse {
    let client = reqwest::blocking::Client::new();
    let res = client.post(&format!("{}{}", base_uri, path)).send()?;
    let ok = res.status().is_success();
    let body = res.json()?;
    Ok((ok, body))
}
