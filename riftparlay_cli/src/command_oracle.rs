use crate::finish;
use crate::rest;

pub fn command_reveal(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    finish(rest::post_empty(uri, &format!("/api/circuit/{}/reveal", id)));
}

pub fn command_tally(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    let votes: Vec<u64> = matches
        .values_of("VOTES")
        .unwrap()
        .map(|v| {
            v.parse().unwrap_or_else(|_| {
                eprintln!("riftparlay tally: vote counts must be non-negative integers");
                std::process::exit(1);
            })
        })
        .collect();
    if votes.len() != 4 {
        eprintln!("riftparlay tally: exactly four counts required, one per pathline");
        std::process::exit(1);
    }

    let body = serde_json::json!({ "votes": votes });
    finish(rest::post(uri, &format!("/api/circuit/{}/tally", id), &body));
}

pub fn command_settle(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    finish(rest::post_empty(uri, &format!("/api/circuit/{}/settle", id)));
}
