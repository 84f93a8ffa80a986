use crate::finish;
use crate::rest;

pub fn command_create(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    let headline = matches.value_of("HEADLINE").unwrap();
    let duration: u64 = match matches.value_of("DURATION").unwrap().parse() {
        Ok(duration) => duration,
        Err(_) => {
            eprintln!("riftparlay create: DURATION must be a number of seconds");
            std::process::exit(1);
        }
    };
    let creator = matches.value_of("creator").unwrap();

    let body = serde_json::json!({
        "circuit_id": id,
        "headline": headline,
        "creator": creator,
        "duration_secs": duration,
    });
    finish(rest::post(uri, "/api/circuit", &body));
}

pub fn command_list(uri: &str) {
    finish(rest::get(uri, "/api/circuits"));
}

pub fn command_show(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    finish(rest::get(uri, &format!("/api/circuit/{}", id)));
}

pub fn command_cancel(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    let caller = matches.value_of("caller").unwrap();

    let body = serde_json::json!({ "caller": caller });
    finish(rest::post(uri, &format!("/api/circuit/{}/cancel", id), &body));
}

pub fn command_events(matches: &clap::ArgMatches, uri: &str) {
    match matches.value_of("ID") {
        Some(id) => finish(rest::get(uri, &format!("/api/circuit/{}/events", id))),
        None => finish(rest::get(uri, "/api/events")),
    }
}
